use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub dataset: DatasetConfig,
    pub graph: GraphConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self
            .host
            .parse::<IpAddr>()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        SocketAddr::new(ip, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub ratings_path: String,
    pub movies_path: String,
    pub genre_separator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Minimum rating for a rating to become an edge.
    pub like_threshold: f64,
    /// Users with fewer liked ratings are dropped before the build. 0 keeps everyone.
    pub min_likes: usize,
    pub sample_users: Option<usize>,
    pub sample_seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub default_top_n: usize,
    pub max_top_n: usize,
    pub similar_users_k: usize,
    pub visualize_recommendations: usize,
    pub label_max_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: num_cpus::get(),
            },
            dataset: DatasetConfig {
                ratings_path: "res/ratings.csv".to_string(),
                movies_path: "res/movies.csv".to_string(),
                genre_separator: "|".to_string(),
            },
            graph: GraphConfig {
                like_threshold: 3.5,
                min_likes: 10,
                sample_users: None,
                sample_seed: 42,
            },
            recommendation: RecommendationConfig {
                default_top_n: 10,
                max_top_n: 100,
                similar_users_k: 10,
                visualize_recommendations: 10,
                label_max_chars: 25,
            },
        }
    }
}

impl Config {
    /// Layers `path` and `CINEGRAPH__*` environment variables over the defaults.
    pub fn from_file(path: &str) -> Result<Self> {
        let defaults = config::Config::try_from(&Config::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("CINEGRAPH").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Loads `path` when it exists, otherwise falls back to the defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::info!("Config file {} not found, using default configuration", path);
            Ok(Self::default())
        }
    }
}

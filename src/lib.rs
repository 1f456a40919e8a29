pub mod algorithms;
pub mod api;
pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{CineGraphError, Result};
pub use graph::{build_graph, BipartiteGraph};
pub use models::*;

use services::dataset::{self, Dataset};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub recommendation_service: Arc<services::recommendation::RecommendationService>,
    pub serving_service: Arc<services::serving::ServingService>,
}

impl AppState {
    /// Loads the dataset and builds the graph. Any load error aborts startup.
    pub fn new(config: Config) -> Result<Self> {
        let graph = load_graph(&config)?;
        Ok(Self::from_graph(config, graph))
    }

    pub fn from_graph(config: Config, graph: BipartiteGraph) -> Self {
        let config = Arc::new(config);
        let graph = Arc::new(graph);

        let recommendation_service = Arc::new(
            services::recommendation::RecommendationService::new(graph, config.clone()),
        );

        let serving_service = Arc::new(services::serving::ServingService::new(
            recommendation_service.clone(),
            config,
        ));

        Self {
            recommendation_service,
            serving_service,
        }
    }
}

/// Dataset → downsampled ratings → validated graph.
pub fn load_graph(config: &Config) -> Result<BipartiteGraph> {
    let data = Dataset::load(&config.dataset)?;
    build_from_dataset(&data, config)
}

pub fn build_from_dataset(data: &Dataset, config: &Config) -> Result<BipartiteGraph> {
    let ratings = dataset::prepare_ratings(&data.ratings, &config.graph);
    let graph = build_graph(&data.movies, &ratings, config.graph.like_threshold)?;
    graph.validate()?;

    info!(
        "Graph ready: {} users, {} movies, {} edges",
        graph.user_count(),
        graph.movie_count(),
        graph.edge_count()
    );
    Ok(graph)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

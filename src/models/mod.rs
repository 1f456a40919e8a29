use crate::error::CineGraphError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type UserId = i64;
pub type MovieId = i64;

/// Highest value on the rating scale.
pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    pub average_rating: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub rating: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Jaccard,
    #[serde(alias = "cn")]
    CommonNeighbors,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Jaccard
    }
}

impl FromStr for Algorithm {
    type Err = CineGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jaccard" => Ok(Algorithm::Jaccard),
            "cn" | "common_neighbors" => Ok(Algorithm::CommonNeighbors),
            other => Err(CineGraphError::InvalidSelection(format!(
                "unknown algorithm '{}', expected 'jaccard' or 'cn'",
                other
            ))),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Jaccard => write!(f, "jaccard"),
            Algorithm::CommonNeighbors => write!(f, "cn"),
        }
    }
}

/// Request-scoped stand-in for a visitor. Never inserted into the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualUser {
    pub id: Uuid,
    pub liked_movies: BTreeSet<MovieId>,
}

impl VirtualUser {
    pub fn new(liked_movies: BTreeSet<MovieId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            liked_movies,
        }
    }
}

/// Scoring knobs for one recommendation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendOptions {
    pub top_n: usize,
    pub algorithm: Algorithm,
    pub genre_filter: Option<String>,
    pub min_rating: f64,
    pub prioritize_rating: bool,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            algorithm: Algorithm::Jaccard,
            genre_filter: None,
            min_rating: 0.0,
            prioritize_rating: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarUser {
    pub user_id: UserId,
    pub similarity: f64,
    pub shared_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub rank: usize,
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    pub average_rating: f64,
    /// Aggregated similarity of the candidate users who liked this movie.
    pub score: f64,
    /// `score` scaled by `average_rating / 5`, present when rating prioritization is on.
    pub weighted_score: Option<f64>,
    pub supporters: usize,
}

impl RecommendationItem {
    /// The value the ranking is based on.
    pub fn ranking_score(&self) -> f64 {
        self.weighted_score.unwrap_or(self.score)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub items: Vec<RecommendationItem>,
}

impl RecommendationResult {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn movie_ids(&self) -> Vec<MovieId> {
        self.items.iter().map(|item| item.movie_id).collect()
    }
}

/// Output of one scorer run: ranked movies plus the ranked users behind them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub result: RecommendationResult,
    pub similar_users: Vec<SimilarUser>,
}

/// Caller-facing scoring parameters. Missing fields fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationParams {
    pub top_n: Option<usize>,
    #[serde(default)]
    pub algorithm: Algorithm,
    pub genre: Option<String>,
    #[serde(default)]
    pub min_rating: f64,
    #[serde(default)]
    pub prioritize_rating: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub liked_movies: Vec<MovieId>,
    #[serde(flatten)]
    pub params: RecommendationParams,
}

impl RecommendationRequest {
    pub fn new(liked_movies: Vec<MovieId>) -> Self {
        Self {
            liked_movies,
            params: RecommendationParams::default(),
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.params.top_n = Some(top_n);
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.params.algorithm = algorithm;
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.params.genre = Some(genre.into());
        self
    }

    pub fn with_min_rating(mut self, min_rating: f64) -> Self {
        self.params.min_rating = min_rating;
        self
    }

    pub fn with_prioritize_rating(mut self, prioritize_rating: bool) -> Self {
        self.params.prioritize_rating = prioritize_rating;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub virtual_user: Uuid,
    pub algorithm: Algorithm,
    pub recommendations: Vec<RecommendationItem>,
    pub similar_users: Vec<SimilarUser>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VizNodeKind {
    VirtualUser,
    SimilarUser,
    LikedMovie,
    RecommendedMovie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizNode {
    /// Type-scoped key: `you`, `u_<id>` or `m_<id>`.
    pub key: String,
    pub kind: VizNodeKind,
    pub label: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizEdge {
    pub source: String,
    pub target: String,
    /// Rating weight from the source graph. Absent on virtual-user edges.
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarUserDetail {
    pub user_id: UserId,
    pub similarity: f64,
    pub shared_count: usize,
    pub shared_movies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationGraph {
    pub nodes: Vec<VizNode>,
    pub edges: Vec<VizEdge>,
    pub similar_users: Vec<SimilarUserDetail>,
    pub liked_count: usize,
    pub recommended_count: usize,
    pub similar_user_count: usize,
}

impl VisualizationGraph {
    pub fn node(&self, key: &str) -> Option<&VizNode> {
        self.nodes.iter().find(|n| n.key == key)
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationResponse {
    pub virtual_user: Uuid,
    pub recommendations: Vec<RecommendationItem>,
    pub graph: VisualizationGraph,
    pub generated_at: DateTime<Utc>,
}

impl MovieRecord {
    pub fn new(movie_id: MovieId, title: impl Into<String>, average_rating: f64) -> Self {
        Self {
            movie_id,
            title: title.into(),
            genres: Vec::new(),
            average_rating,
        }
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g == genre)
    }
}

impl RatingRecord {
    pub fn new(user_id: UserId, movie_id: MovieId, rating: f64) -> Self {
        Self {
            user_id,
            movie_id,
            rating,
        }
    }
}

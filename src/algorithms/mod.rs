pub mod scorer;
pub mod subgraph;

pub use scorer::{recommend, recommend_for_user};
pub use subgraph::{extract_subgraph, SubgraphOptions};

use crate::models::{Algorithm, MovieId};
use crate::utils;
use std::collections::BTreeSet;

/// Neighborhood similarity between a graph user and a liked-movie set.
pub trait SimilarityMetric: Send + Sync {
    fn name(&self) -> &'static str;

    /// Scores from set sizes: the overlap, the user's liked-movie count and
    /// the size of the query set.
    fn score_counts(&self, overlap: usize, neighbor_count: usize, liked_count: usize) -> f64;

    fn score_sets(&self, neighbors: &BTreeSet<MovieId>, liked: &BTreeSet<MovieId>) -> f64 {
        self.score_counts(
            utils::intersection_size(neighbors, liked),
            neighbors.len(),
            liked.len(),
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Jaccard;

impl SimilarityMetric for Jaccard {
    fn name(&self) -> &'static str {
        "jaccard"
    }

    fn score_counts(&self, overlap: usize, neighbor_count: usize, liked_count: usize) -> f64 {
        utils::jaccard_index(overlap, neighbor_count, liked_count)
    }
}

/// Raw overlap count. Unnormalized, so users with broad overlap win
/// regardless of how many movies they liked overall.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonNeighbors;

impl SimilarityMetric for CommonNeighbors {
    fn name(&self) -> &'static str {
        "common_neighbors"
    }

    fn score_counts(&self, overlap: usize, _neighbor_count: usize, _liked_count: usize) -> f64 {
        overlap as f64
    }
}

static JACCARD: Jaccard = Jaccard;
static COMMON_NEIGHBORS: CommonNeighbors = CommonNeighbors;

pub fn metric_for(algorithm: Algorithm) -> &'static dyn SimilarityMetric {
    match algorithm {
        Algorithm::Jaccard => &JACCARD,
        Algorithm::CommonNeighbors => &COMMON_NEIGHBORS,
    }
}

//! The user–movie bipartite graph.
//!
//! Built once from the loaded tables and read-only afterwards, so it can be
//! shared behind an `Arc` by any number of request handlers without locking.

use crate::error::{CineGraphError, Result};
use crate::models::{MovieId, MovieRecord, RatingRecord, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Graph node. Ids are scoped by node type, so `User(1)` and `Movie(1)` are distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Node {
    User(UserId),
    Movie(MovieId),
}

impl Node {
    pub fn is_user(&self) -> bool {
        matches!(self, Node::User(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub users: usize,
    pub movies: usize,
    pub edges: usize,
    pub dropped_ratings: usize,
    pub overwritten_ratings: usize,
    pub like_threshold: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BipartiteGraph {
    movies: BTreeMap<MovieId, MovieRecord>,
    user_edges: BTreeMap<UserId, BTreeMap<MovieId, f64>>,
    movie_edges: BTreeMap<MovieId, BTreeMap<UserId, f64>>,
    like_threshold: f64,
    dropped_ratings: usize,
    overwritten_ratings: usize,
}

/// Builds the graph from movie metadata and ratings.
///
/// Every movie becomes a node. Ratings below `like_threshold` are dropped
/// entirely; the rest create their user node on first sight and an edge
/// weighted by the rating. A later rating for the same (user, movie) pair
/// overwrites the earlier one.
pub fn build_graph(
    movies: &BTreeMap<MovieId, MovieRecord>,
    ratings: &[RatingRecord],
    like_threshold: f64,
) -> Result<BipartiteGraph> {
    if !like_threshold.is_finite() {
        return Err(CineGraphError::DataIntegrity(format!(
            "like threshold must be finite, got {}",
            like_threshold
        )));
    }

    let mut graph = BipartiteGraph {
        movies: movies.clone(),
        movie_edges: movies.keys().map(|&id| (id, BTreeMap::new())).collect(),
        like_threshold,
        ..Default::default()
    };

    for rating in ratings {
        if !rating.rating.is_finite() {
            return Err(CineGraphError::DataIntegrity(format!(
                "rating for user {} movie {} is not a number",
                rating.user_id, rating.movie_id
            )));
        }
        if rating.rating < like_threshold {
            graph.dropped_ratings += 1;
            continue;
        }

        let likers = graph
            .movie_edges
            .get_mut(&rating.movie_id)
            .ok_or(CineGraphError::UnknownMovie(rating.movie_id))?;
        likers.insert(rating.user_id, rating.rating);

        let previous = graph
            .user_edges
            .entry(rating.user_id)
            .or_default()
            .insert(rating.movie_id, rating.rating);
        if previous.is_some() {
            graph.overwritten_ratings += 1;
        }
    }

    if graph.overwritten_ratings > 0 {
        debug!(
            "{} duplicate ratings overwrote an earlier rating for the same user and movie",
            graph.overwritten_ratings
        );
    }

    let stats = graph.stats();
    info!(
        "Graph built: {} users, {} movies, {} edges ({} ratings below {} dropped)",
        stats.users, stats.movies, stats.edges, stats.dropped_ratings, like_threshold
    );
    Ok(graph)
}

impl BipartiteGraph {
    pub fn user_count(&self) -> usize {
        self.user_edges.len()
    }

    pub fn movie_count(&self) -> usize {
        self.movies.len()
    }

    pub fn edge_count(&self) -> usize {
        self.user_edges.values().map(BTreeMap::len).sum()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            users: self.user_count(),
            movies: self.movie_count(),
            edges: self.edge_count(),
            dropped_ratings: self.dropped_ratings,
            overwritten_ratings: self.overwritten_ratings,
            like_threshold: self.like_threshold,
        }
    }

    pub fn contains(&self, node: Node) -> bool {
        match node {
            Node::User(id) => self.user_edges.contains_key(&id),
            Node::Movie(id) => self.movies.contains_key(&id),
        }
    }

    pub fn movie(&self, movie_id: MovieId) -> Option<&MovieRecord> {
        self.movies.get(&movie_id)
    }

    /// All movies in id order.
    pub fn movies(&self) -> impl Iterator<Item = &MovieRecord> {
        self.movies.values()
    }

    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.user_edges.keys().copied()
    }

    /// Movies the user liked, with their rating weights.
    pub fn liked_movies_of(&self, user_id: UserId) -> Option<&BTreeMap<MovieId, f64>> {
        self.user_edges.get(&user_id)
    }

    /// Users who liked the movie, with their rating weights.
    pub fn likers_of(&self, movie_id: MovieId) -> Option<&BTreeMap<UserId, f64>> {
        self.movie_edges.get(&movie_id)
    }

    pub fn rating(&self, user_id: UserId, movie_id: MovieId) -> Option<f64> {
        self.user_edges
            .get(&user_id)
            .and_then(|movies| movies.get(&movie_id))
            .copied()
    }

    pub fn neighbors(&self, node: Node) -> Vec<(Node, f64)> {
        match node {
            Node::User(id) => self
                .user_edges
                .get(&id)
                .map(|m| m.iter().map(|(&mid, &w)| (Node::Movie(mid), w)).collect())
                .unwrap_or_default(),
            Node::Movie(id) => self
                .movie_edges
                .get(&id)
                .map(|u| u.iter().map(|(&uid, &w)| (Node::User(uid), w)).collect())
                .unwrap_or_default(),
        }
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.user_edges.iter().flat_map(|(&user_id, movies)| {
            movies.iter().map(move |(&movie_id, &weight)| Edge {
                user_id,
                movie_id,
                weight,
            })
        })
    }

    /// Sorted distinct genres across all movie nodes.
    pub fn genres(&self) -> Vec<String> {
        let mut genres: Vec<String> = self
            .movies
            .values()
            .flat_map(|m| m.genres.iter().cloned())
            .collect();
        genres.sort();
        genres.dedup();
        genres
    }

    /// Re-checks the structural invariants: every edge joins a user to a
    /// known movie, both adjacency sides agree, and no edge sits below the
    /// like threshold.
    pub fn validate(&self) -> Result<()> {
        for edge in self.edges() {
            if !self.movies.contains_key(&edge.movie_id) {
                return Err(CineGraphError::DataIntegrity(format!(
                    "edge from user {} to missing movie {}",
                    edge.user_id, edge.movie_id
                )));
            }
            if edge.weight < self.like_threshold {
                return Err(CineGraphError::DataIntegrity(format!(
                    "edge user {} movie {} has weight {} below threshold {}",
                    edge.user_id, edge.movie_id, edge.weight, self.like_threshold
                )));
            }
            let mirrored = self
                .movie_edges
                .get(&edge.movie_id)
                .and_then(|likers| likers.get(&edge.user_id));
            if mirrored != Some(&edge.weight) {
                return Err(CineGraphError::DataIntegrity(format!(
                    "edge user {} movie {} is missing from the movie side",
                    edge.user_id, edge.movie_id
                )));
            }
        }

        let mirrored_edges: usize = self.movie_edges.values().map(BTreeMap::len).sum();
        if mirrored_edges != self.edge_count() {
            return Err(CineGraphError::DataIntegrity(format!(
                "adjacency mismatch: {} user-side edges vs {} movie-side edges",
                self.edge_count(),
                mirrored_edges
            )));
        }

        debug!("Graph validated: {} edges", mirrored_edges);
        Ok(())
    }
}

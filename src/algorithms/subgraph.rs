//! Reduced subgraph for visualizing one recommendation.
//!
//! Only the virtual user, the top similar users, the liked movies and the
//! recommended movies are placed; nothing else from the source graph is
//! traversed.

use crate::config::RecommendationConfig;
use crate::graph::BipartiteGraph;
use crate::models::*;
use crate::utils::{spread, truncate_label};
use std::collections::BTreeSet;

pub const VIRTUAL_USER_KEY: &str = "you";
const VIRTUAL_USER_LABEL: &str = "You";
const SHARED_MOVIES_SHOWN: usize = 3;

const USER_COLUMN_X: f64 = -1.0;
const MOVIE_COLUMN_X: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubgraphOptions {
    pub similar_users: usize,
    pub recommended_movies: usize,
    pub label_max_chars: usize,
}

impl Default for SubgraphOptions {
    fn default() -> Self {
        Self {
            similar_users: 10,
            recommended_movies: 10,
            label_max_chars: 25,
        }
    }
}

impl From<&RecommendationConfig> for SubgraphOptions {
    fn from(config: &RecommendationConfig) -> Self {
        Self {
            similar_users: config.similar_users_k,
            recommended_movies: config.visualize_recommendations,
            label_max_chars: config.label_max_chars,
        }
    }
}

pub fn user_key(user_id: UserId) -> String {
    format!("u_{}", user_id)
}

pub fn movie_key(movie_id: MovieId) -> String {
    format!("m_{}", movie_id)
}

/// Builds the visualization structure for a scored request.
///
/// `similar_users` is expected in rank order; the first
/// `options.similar_users` present in the graph are kept. Liked movies come
/// in id order, recommended movies in rank order.
pub fn extract_subgraph(
    graph: &BipartiteGraph,
    liked_movies: &BTreeSet<MovieId>,
    similar_users: &[SimilarUser],
    result: &RecommendationResult,
    options: &SubgraphOptions,
) -> VisualizationGraph {
    let users: Vec<&SimilarUser> = similar_users
        .iter()
        .filter(|u| graph.liked_movies_of(u.user_id).is_some())
        .take(options.similar_users)
        .collect();

    let liked: Vec<&MovieRecord> = liked_movies
        .iter()
        .filter_map(|&id| graph.movie(id))
        .collect();

    let recommended: Vec<&MovieRecord> = result
        .items
        .iter()
        .filter(|item| !liked_movies.contains(&item.movie_id))
        .filter_map(|item| graph.movie(item.movie_id))
        .take(options.recommended_movies)
        .collect();

    let mut nodes = Vec::with_capacity(1 + users.len() + liked.len() + recommended.len());

    let user_ys = spread(1 + users.len());
    nodes.push(VizNode {
        key: VIRTUAL_USER_KEY.to_string(),
        kind: VizNodeKind::VirtualUser,
        label: VIRTUAL_USER_LABEL.to_string(),
        x: USER_COLUMN_X,
        y: user_ys[0],
    });
    for (user, y) in users.iter().zip(&user_ys[1..]) {
        nodes.push(VizNode {
            key: user_key(user.user_id),
            kind: VizNodeKind::SimilarUser,
            label: format!("User {}", user.user_id),
            x: USER_COLUMN_X,
            y: *y,
        });
    }

    let movie_ys = spread(liked.len() + recommended.len());
    let movie_nodes = liked
        .iter()
        .map(|m| (m, VizNodeKind::LikedMovie))
        .chain(recommended.iter().map(|m| (m, VizNodeKind::RecommendedMovie)));
    for ((movie, kind), y) in movie_nodes.zip(movie_ys) {
        nodes.push(VizNode {
            key: movie_key(movie.movie_id),
            kind,
            label: truncate_label(&movie.title, options.label_max_chars),
            x: MOVIE_COLUMN_X,
            y,
        });
    }

    let mut edges = Vec::new();
    for movie in &liked {
        edges.push(VizEdge {
            source: VIRTUAL_USER_KEY.to_string(),
            target: movie_key(movie.movie_id),
            weight: None,
        });
    }
    for user in &users {
        for movie in liked.iter().chain(recommended.iter()) {
            if let Some(weight) = graph.rating(user.user_id, movie.movie_id) {
                edges.push(VizEdge {
                    source: user_key(user.user_id),
                    target: movie_key(movie.movie_id),
                    weight: Some(weight),
                });
            }
        }
    }

    let details = users
        .iter()
        .map(|user| SimilarUserDetail {
            user_id: user.user_id,
            similarity: user.similarity,
            shared_count: user.shared_count,
            shared_movies: liked
                .iter()
                .filter(|m| graph.rating(user.user_id, m.movie_id).is_some())
                .take(SHARED_MOVIES_SHOWN)
                .map(|m| m.title.clone())
                .collect(),
        })
        .collect();

    VisualizationGraph {
        nodes,
        edges,
        similar_users: details,
        liked_count: liked.len(),
        recommended_count: recommended.len(),
        similar_user_count: users.len(),
    }
}

//! Neighborhood-similarity recommendation for a liked-movie set.
//!
//! The visitor is never inserted into the shared graph. Candidate users are
//! the likers of the selected movies, each is scored against the liked set
//! with the requested metric, and every movie those users liked (minus the
//! selection itself) accumulates the scores of the users who liked it.

use super::{metric_for, SimilarityMetric};
use crate::error::{CineGraphError, Result};
use crate::graph::BipartiteGraph;
use crate::models::*;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Value the genre selector sends when no genre filter is wanted.
pub const ALL_GENRES: &str = "All";

#[derive(Debug, Default)]
struct Aggregate {
    score: f64,
    supporters: usize,
}

/// Ranks movies for a visitor defined only by the movies they liked.
pub fn recommend(
    graph: &BipartiteGraph,
    liked_movies: &BTreeSet<MovieId>,
    options: &RecommendOptions,
) -> Result<Recommendation> {
    check_selection(graph, liked_movies, options)?;
    score_liked_set(graph, liked_movies, None, options)
}

/// Ranks movies for a user already in the graph, using their own liked
/// movies as the selection. The user never counts as their own neighbor.
pub fn recommend_for_user(
    graph: &BipartiteGraph,
    user_id: UserId,
    options: &RecommendOptions,
) -> Result<Recommendation> {
    let liked: BTreeSet<MovieId> = graph
        .liked_movies_of(user_id)
        .ok_or_else(|| CineGraphError::InvalidSelection(format!("unknown user id {}", user_id)))?
        .keys()
        .copied()
        .collect();

    check_selection(graph, &liked, options)?;
    score_liked_set(graph, &liked, Some(user_id), options)
}

fn check_selection(
    graph: &BipartiteGraph,
    liked_movies: &BTreeSet<MovieId>,
    options: &RecommendOptions,
) -> Result<()> {
    if liked_movies.is_empty() {
        return Err(CineGraphError::InvalidSelection(
            "liked movie set is empty".to_string(),
        ));
    }
    if let Some(missing) = liked_movies.iter().find(|&&id| graph.movie(id).is_none()) {
        return Err(CineGraphError::InvalidSelection(format!(
            "movie id {} is not in the catalog",
            missing
        )));
    }
    if options.top_n == 0 {
        return Err(CineGraphError::InvalidSelection(
            "top_n must be at least 1".to_string(),
        ));
    }
    if options.min_rating.is_nan() {
        return Err(CineGraphError::InvalidSelection(
            "minimum rating is not a number".to_string(),
        ));
    }
    Ok(())
}

fn score_liked_set(
    graph: &BipartiteGraph,
    liked: &BTreeSet<MovieId>,
    exclude_user: Option<UserId>,
    options: &RecommendOptions,
) -> Result<Recommendation> {
    let candidates = candidate_users(graph, liked, exclude_user);
    if candidates.is_empty() {
        debug!("No other users liked the selected movies");
        return Ok(Recommendation::default());
    }

    let metric = metric_for(options.algorithm);
    let scored = score_users(graph, liked, &candidates, metric);
    let aggregates = aggregate_movies(graph, liked, &scored);

    let mut items = rank_movies(graph, aggregates, options);
    items.truncate(options.top_n);
    for (index, item) in items.iter_mut().enumerate() {
        item.rank = index + 1;
    }

    debug!(
        "Scored {} candidate users with {}, returning {} movies",
        scored.len(),
        metric.name(),
        items.len()
    );

    Ok(Recommendation {
        result: RecommendationResult { items },
        similar_users: rank_users(scored),
    })
}

/// Every user adjacent to at least one liked movie.
fn candidate_users(
    graph: &BipartiteGraph,
    liked: &BTreeSet<MovieId>,
    exclude_user: Option<UserId>,
) -> Vec<UserId> {
    let mut users = BTreeSet::new();
    for movie_id in liked {
        if let Some(likers) = graph.likers_of(*movie_id) {
            users.extend(likers.keys().copied());
        }
    }
    if let Some(user_id) = exclude_user {
        users.remove(&user_id);
    }
    users.into_iter().collect()
}

/// Scores each candidate in parallel. Output keeps the input (user id) order.
fn score_users(
    graph: &BipartiteGraph,
    liked: &BTreeSet<MovieId>,
    candidates: &[UserId],
    metric: &dyn SimilarityMetric,
) -> Vec<SimilarUser> {
    candidates
        .par_iter()
        .filter_map(|&user_id| {
            let neighbors = graph.liked_movies_of(user_id)?;
            let overlap = liked.iter().filter(|m| neighbors.contains_key(*m)).count();
            let similarity = metric.score_counts(overlap, neighbors.len(), liked.len());
            if overlap == 0 || similarity <= 0.0 {
                return None;
            }
            Some(SimilarUser {
                user_id,
                similarity,
                shared_count: overlap,
            })
        })
        .collect()
}

/// Sums user similarity onto every movie the user liked outside the
/// selection. Runs sequentially over users in id order so float sums are
/// reproducible.
fn aggregate_movies(
    graph: &BipartiteGraph,
    liked: &BTreeSet<MovieId>,
    scored: &[SimilarUser],
) -> BTreeMap<MovieId, Aggregate> {
    let mut aggregates: BTreeMap<MovieId, Aggregate> = BTreeMap::new();
    for user in scored {
        let Some(neighbors) = graph.liked_movies_of(user.user_id) else {
            continue;
        };
        for movie_id in neighbors.keys() {
            if liked.contains(movie_id) {
                continue;
            }
            let entry = aggregates.entry(*movie_id).or_default();
            entry.score += user.similarity;
            entry.supporters += 1;
        }
    }
    aggregates
}

fn genre_filter(options: &RecommendOptions) -> Option<&str> {
    options
        .genre_filter
        .as_deref()
        .filter(|genre| *genre != ALL_GENRES)
}

fn rank_movies(
    graph: &BipartiteGraph,
    aggregates: BTreeMap<MovieId, Aggregate>,
    options: &RecommendOptions,
) -> Vec<RecommendationItem> {
    let genre = genre_filter(options);

    let mut items: Vec<RecommendationItem> = aggregates
        .into_iter()
        .filter_map(|(movie_id, aggregate)| {
            let movie = graph.movie(movie_id)?;
            if let Some(genre) = genre {
                if !movie.has_genre(genre) {
                    return None;
                }
            }
            if movie.average_rating < options.min_rating {
                return None;
            }

            let weighted_score = options
                .prioritize_rating
                .then(|| aggregate.score * (movie.average_rating / MAX_RATING));

            Some(RecommendationItem {
                rank: 0,
                movie_id,
                title: movie.title.clone(),
                genres: movie.genres.clone(),
                average_rating: movie.average_rating,
                score: aggregate.score,
                weighted_score,
                supporters: aggregate.supporters,
            })
        })
        .collect();

    items.sort_by(compare_items);
    items
}

/// Score descending, then average rating descending, then title, then id.
fn compare_items(a: &RecommendationItem, b: &RecommendationItem) -> Ordering {
    b.ranking_score()
        .total_cmp(&a.ranking_score())
        .then_with(|| b.average_rating.total_cmp(&a.average_rating))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.movie_id.cmp(&b.movie_id))
}

/// Similarity descending, then shared count descending, then user id.
fn rank_users(mut users: Vec<SimilarUser>) -> Vec<SimilarUser> {
    users.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| b.shared_count.cmp(&a.shared_count))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    users
}

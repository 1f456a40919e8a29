use crate::config::RecommendationConfig;
use crate::error::{CineGraphError, Result};
use crate::models::*;

/// Upper bound on the liked-movie selection of a single request.
pub const MAX_LIKED_MOVIES: usize = 1000;

fn reject<T>(message: impl Into<String>) -> Result<T> {
    Err(CineGraphError::InvalidSelection(message.into()))
}

pub fn validate_liked_movies(liked_movies: &[MovieId]) -> Result<()> {
    if liked_movies.is_empty() {
        return reject("select at least one liked movie");
    }

    if liked_movies.len() > MAX_LIKED_MOVIES {
        return reject(format!(
            "too many liked movies: {} (max {})",
            liked_movies.len(),
            MAX_LIKED_MOVIES
        ));
    }

    Ok(())
}

pub fn validate_top_n(top_n: usize, max_top_n: usize) -> Result<()> {
    if top_n == 0 {
        return reject("number of recommendations must be greater than 0");
    }

    if top_n > max_top_n {
        return reject(format!(
            "number of recommendations too large: {} (max {})",
            top_n, max_top_n
        ));
    }

    Ok(())
}

pub fn validate_min_rating(min_rating: f64) -> Result<()> {
    if !min_rating.is_finite() || !(0.0..=MAX_RATING).contains(&min_rating) {
        return reject(format!(
            "minimum rating must be between 0.0 and {}, got {}",
            MAX_RATING, min_rating
        ));
    }
    Ok(())
}

pub fn validate_genre(genre: Option<&str>) -> Result<()> {
    if let Some(genre) = genre {
        if genre.trim().is_empty() {
            return reject("genre filter cannot be empty if specified");
        }
        if genre.len() > 100 {
            return reject("genre filter too long (max 100 characters)");
        }
    }
    Ok(())
}

/// Checks caller parameters and resolves them into scoring options.
pub fn resolve_params(
    params: &RecommendationParams,
    config: &RecommendationConfig,
) -> Result<RecommendOptions> {
    let top_n = params.top_n.unwrap_or(config.default_top_n);
    validate_top_n(top_n, config.max_top_n)?;
    validate_min_rating(params.min_rating)?;
    validate_genre(params.genre.as_deref())?;

    Ok(RecommendOptions {
        top_n,
        algorithm: params.algorithm,
        genre_filter: params.genre.clone(),
        min_rating: params.min_rating,
        prioritize_rating: params.prioritize_rating,
    })
}

pub fn validate_recommendation_request(
    request: &RecommendationRequest,
    config: &RecommendationConfig,
) -> Result<RecommendOptions> {
    validate_liked_movies(&request.liked_movies)?;
    resolve_params(&request.params, config)
}

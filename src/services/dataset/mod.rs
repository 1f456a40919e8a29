//! Dataset loading: rating and movie metadata sources parsed into typed
//! in-memory tables.
//!
//! Ratings are expected as `userId,movieId,rating[,...]` and movies as
//! `movieId,title[,genres][,averageRating]`. Column order does not matter,
//! extra columns are ignored.

use crate::config::{DatasetConfig, GraphConfig};
use crate::error::{CineGraphError, Result};
use crate::models::{MovieId, MovieRecord, RatingRecord, UserId, MAX_RATING};
use csv::{ReaderBuilder, StringRecord};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Genre marker MovieLens uses for movies without genres.
const NO_GENRES: &str = "(no genres listed)";

const RATINGS_COLUMNS: [&str; 3] = ["userId", "movieId", "rating"];
const MOVIES_COLUMNS: [&str; 2] = ["movieId", "title"];

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub movies: BTreeMap<MovieId, MovieRecord>,
    pub ratings: Vec<RatingRecord>,
}

impl Dataset {
    /// Loads both CSV sources named by the dataset configuration.
    pub fn load(config: &DatasetConfig) -> Result<Self> {
        Self::load_files(
            &config.ratings_path,
            &config.movies_path,
            &config.genre_separator,
        )
    }

    pub fn load_files(
        ratings_path: impl AsRef<Path>,
        movies_path: impl AsRef<Path>,
        genre_separator: &str,
    ) -> Result<Self> {
        let ratings_path = ratings_path.as_ref();
        let movies_path = movies_path.as_ref();
        info!(
            "Loading dataset from {} and {}",
            ratings_path.display(),
            movies_path.display()
        );

        let dataset = Self::from_readers(
            File::open(ratings_path)?,
            File::open(movies_path)?,
            genre_separator,
        )?;

        info!(
            "Loaded {} ratings and {} movies",
            dataset.ratings.len(),
            dataset.movies.len()
        );
        Ok(dataset)
    }

    pub fn from_readers<R1: Read, R2: Read>(
        ratings: R1,
        movies: R2,
        genre_separator: &str,
    ) -> Result<Self> {
        let movies = parse_movies(movies, genre_separator)?;
        let ratings = parse_ratings(ratings)?;
        Self::assemble(movies, ratings)
    }

    /// Builds the tables from records a collaborator already parsed.
    pub fn from_records(movies: Vec<MovieRecord>, ratings: Vec<RatingRecord>) -> Result<Self> {
        let mut by_id = Vec::with_capacity(movies.len());
        for movie in movies {
            validate_average(movie.movie_id, movie.average_rating)?;
            by_id.push((movie, true));
        }
        for rating in &ratings {
            validate_rating_value(rating.rating, || {
                format!("rating for user {} movie {}", rating.user_id, rating.movie_id)
            })?;
        }
        Self::assemble(by_id, ratings)
    }

    /// Checks cross-table references and fills in derived average ratings.
    /// The flag on each movie says whether its average came from the source.
    fn assemble(movies: Vec<(MovieRecord, bool)>, ratings: Vec<RatingRecord>) -> Result<Self> {
        let mut table = BTreeMap::new();
        let mut needs_average = Vec::new();

        for (movie, has_average) in movies {
            if movie.title.trim().is_empty() {
                return Err(CineGraphError::DataIntegrity(format!(
                    "movie {} has an empty title",
                    movie.movie_id
                )));
            }
            if !has_average {
                needs_average.push(movie.movie_id);
            }
            let movie_id = movie.movie_id;
            if table.insert(movie_id, movie).is_some() {
                return Err(CineGraphError::DataIntegrity(format!(
                    "duplicate movie id {} in movie metadata",
                    movie_id
                )));
            }
        }

        for rating in &ratings {
            if !table.contains_key(&rating.movie_id) {
                return Err(CineGraphError::DataIntegrity(format!(
                    "rating by user {} references unknown movie id {}",
                    rating.user_id, rating.movie_id
                )));
            }
        }

        if !needs_average.is_empty() {
            let averages = average_ratings(&ratings);
            for movie_id in &needs_average {
                if let Some(movie) = table.get_mut(movie_id) {
                    movie.average_rating = averages.get(movie_id).copied().unwrap_or(0.0);
                }
            }
            debug!("Derived average ratings for {} movies", needs_average.len());
        }

        Ok(Self {
            movies: table,
            ratings,
        })
    }

    /// Sorted distinct genres across all movies.
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
}

/// Keeps the liked ratings of users with at least `min_likes` likes,
/// optionally down to a deterministic sample of those users.
pub fn downsample_users(
    ratings: &[RatingRecord],
    like_threshold: f64,
    min_likes: usize,
    sample: Option<(usize, u64)>,
) -> Vec<RatingRecord> {
    let positive: Vec<RatingRecord> = ratings
        .iter()
        .filter(|r| r.rating >= like_threshold)
        .copied()
        .collect();

    let mut counts: BTreeMap<UserId, usize> = BTreeMap::new();
    for rating in &positive {
        *counts.entry(rating.user_id).or_insert(0) += 1;
    }

    let mut eligible: Vec<UserId> = counts
        .into_iter()
        .filter(|(_, count)| *count >= min_likes)
        .map(|(user_id, _)| user_id)
        .collect();

    if let Some((sample_n, seed)) = sample {
        if sample_n < eligible.len() {
            let mut rng = StdRng::seed_from_u64(seed);
            eligible.shuffle(&mut rng);
            eligible.truncate(sample_n);
            eligible.sort_unstable();
        }
    }

    let filtered: Vec<RatingRecord> = positive
        .into_iter()
        .filter(|r| eligible.binary_search(&r.user_id).is_ok())
        .collect();

    info!(
        "Kept {} liked ratings from {} eligible users (min_likes = {})",
        filtered.len(),
        eligible.len(),
        min_likes
    );
    filtered
}

/// Applies the configured user downsampling to a loaded rating table.
pub fn prepare_ratings(ratings: &[RatingRecord], config: &GraphConfig) -> Vec<RatingRecord> {
    if config.min_likes == 0 && config.sample_users.is_none() {
        return ratings.to_vec();
    }
    downsample_users(
        ratings,
        config.like_threshold,
        config.min_likes,
        config.sample_users.map(|n| (n, config.sample_seed)),
    )
}

pub fn parse_genres(raw: &str, separator: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == NO_GENRES {
        return Vec::new();
    }
    raw.split(separator)
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

fn average_ratings(ratings: &[RatingRecord]) -> HashMap<MovieId, f64> {
    let mut sums: HashMap<MovieId, (f64, usize)> = HashMap::new();
    for rating in ratings {
        let entry = sums.entry(rating.movie_id).or_insert((0.0, 0));
        entry.0 += rating.rating;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(movie_id, (sum, count))| (movie_id, sum / count as f64))
        .collect()
}

fn parse_ratings<R: Read>(source: R) -> Result<Vec<RatingRecord>> {
    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    let headers = reader
        .headers()
        .map_err(|e| row_error("ratings", e))?
        .clone();
    let user_col = require_column(&headers, RATINGS_COLUMNS[0], "ratings")?;
    let movie_col = require_column(&headers, RATINGS_COLUMNS[1], "ratings")?;
    let rating_col = require_column(&headers, RATINGS_COLUMNS[2], "ratings")?;

    let mut ratings = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| row_error("ratings", e))?;
        let line = line_of(&row);
        let user_id = parse_field::<UserId>(&row, user_col, "userId", line)?;
        let movie_id = parse_field::<MovieId>(&row, movie_col, "movieId", line)?;
        let rating = parse_field::<f64>(&row, rating_col, "rating", line)?;
        validate_rating_value(rating, || format!("ratings line {}", line))?;
        ratings.push(RatingRecord::new(user_id, movie_id, rating));
    }
    Ok(ratings)
}

fn parse_movies<R: Read>(source: R, genre_separator: &str) -> Result<Vec<(MovieRecord, bool)>> {
    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    let headers = reader
        .headers()
        .map_err(|e| row_error("movies", e))?
        .clone();
    let id_col = require_column(&headers, MOVIES_COLUMNS[0], "movies")?;
    let title_col = require_column(&headers, MOVIES_COLUMNS[1], "movies")?;
    let genres_col = find_column(&headers, "genres");
    let average_col = find_column(&headers, "averageRating");

    let mut movies = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| row_error("movies", e))?;
        let line = line_of(&row);
        let movie_id = parse_field::<MovieId>(&row, id_col, "movieId", line)?;
        let title = row.get(title_col).unwrap_or_default().to_string();
        let genres = genres_col
            .and_then(|col| row.get(col))
            .map(|raw| parse_genres(raw, genre_separator))
            .unwrap_or_default();

        let average = match average_col.and_then(|col| row.get(col)) {
            Some(raw) if !raw.is_empty() => {
                let value = raw.parse::<f64>().map_err(|_| {
                    CineGraphError::DataIntegrity(format!(
                        "movies line {}: averageRating '{}' is not numeric",
                        line, raw
                    ))
                })?;
                validate_average(movie_id, value)?;
                Some(value)
            }
            _ => None,
        };

        let record = MovieRecord {
            movie_id,
            title,
            genres,
            average_rating: average.unwrap_or(0.0),
        };
        movies.push((record, average.is_some()));
    }
    Ok(movies)
}

/// Malformed rows (short rows, bad UTF-8) are integrity errors; read
/// failures of the underlying source stay I/O-level CSV errors.
fn row_error(source: &str, err: csv::Error) -> CineGraphError {
    if err.is_io_error() {
        return CineGraphError::Csv(err);
    }
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    CineGraphError::DataIntegrity(format!("{} line {}: {}", source, line, err))
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn require_column(headers: &StringRecord, name: &str, source: &str) -> Result<usize> {
    find_column(headers, name).ok_or_else(|| {
        CineGraphError::DataIntegrity(format!("column '{}' missing from {} file", name, source))
    })
}

fn line_of(row: &StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or(0)
}

fn parse_field<T: std::str::FromStr>(
    row: &StringRecord,
    col: usize,
    name: &str,
    line: u64,
) -> Result<T> {
    let raw = row.get(col).unwrap_or_default();
    if raw.is_empty() {
        return Err(CineGraphError::DataIntegrity(format!(
            "line {}: required field '{}' is missing",
            line, name
        )));
    }
    raw.parse::<T>().map_err(|_| {
        CineGraphError::DataIntegrity(format!(
            "line {}: field '{}' has non-numeric value '{}'",
            line, name, raw
        ))
    })
}

fn validate_rating_value(rating: f64, context: impl FnOnce() -> String) -> Result<()> {
    if !rating.is_finite() || !(0.0..=MAX_RATING).contains(&rating) {
        return Err(CineGraphError::DataIntegrity(format!(
            "{}: rating {} outside 0.0-{}",
            context(),
            rating,
            MAX_RATING
        )));
    }
    Ok(())
}

fn validate_average(movie_id: MovieId, average: f64) -> Result<()> {
    if !average.is_finite() || !(0.0..=MAX_RATING).contains(&average) {
        return Err(CineGraphError::DataIntegrity(format!(
            "movie {}: average rating {} outside 0.0-{}",
            movie_id, average, MAX_RATING
        )));
    }
    Ok(())
}

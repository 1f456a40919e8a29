use crate::models::MovieId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CineGraphError>;

#[derive(Debug, Error)]
pub enum CineGraphError {
    /// Malformed or dangling source records. Fatal at load time.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// A liked rating points at a movie absent from the metadata. Fatal at load time.
    #[error("unknown movie id {0}")]
    UnknownMovie(MovieId),

    /// Rejected request: empty liked set, unknown movie or user, or out-of-range parameters.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("scoring task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CineGraphError {
    /// Request-time failures the caller can recover from by fixing its input.
    pub fn is_rejection(&self) -> bool {
        matches!(self, CineGraphError::InvalidSelection(_))
    }
}

//! Error types for tensorflix-core.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the validation core.
#[derive(Debug, Error)]
pub enum Error {
    /// A platform, artifact or record could not be found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input did not have the expected shape (tag pattern, payload, format).
    #[error("invalid: {0}")]
    Invalid(String),

    /// An attribution tag is older than its time-to-live.
    #[error("expired: {0}")]
    Expired(String),

    /// No rate-limit token was available.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level failure talking to a platform API.
    #[error("network error: {0}")]
    Network(String),

    /// A platform API answered with an error or an unusable payload.
    #[error("platform error: {0}")]
    Platform(String),

    /// SQLite error from the persistence layer.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Platform(format!("unreadable response: {e}"))
        } else {
            Self::Network(e.to_string())
        }
    }
}

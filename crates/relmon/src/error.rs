//! Run-level errors.
//!
//! Per-record outcomes such as "no match" or "unsupported host" are values
//! (see [`crate::MatchResult`] and [`crate::create::CreateOutcome`]); the
//! variants here are what stops a run.

use relmon_hosting::HostingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rate limited by {host} after all retries")]
    RateLimited { host: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("tracking service error: {0}")]
    Service(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the tracking service client.
pub type ServiceError = Error;

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the run cannot usefully continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::RateLimited { .. } | Self::Transport(_) | Self::Config(_)
        )
    }
}

impl From<HostingError> for Error {
    fn from(err: HostingError) -> Self {
        match err {
            HostingError::Transport { url, message } => {
                Self::Transport(format!("{}: {}", url, message))
            }
            HostingError::RateLimited { host } => Self::RateLimited { host },
            HostingError::Auth { url, code } => Self::Auth(format!("HTTP {} from {}", code, url)),
            other => Self::Service(other.to_string()),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Service(err.to_string())
    }
}

//! Error types shared across the core library

use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain a status from the breakdowns API.
///
/// Every variant is recoverable from the poller's point of view: the error is
/// recorded on the session and the next tick fetches again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, reset, etc.
    #[error("connection error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    /// Non-success HTTP status with the best message we could extract from the body
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("breakdown request '{0}' not found")]
    NotFound(String),

    /// Response body was not a breakdown request
    #[error("invalid response: {0}")]
    Decode(String),

    #[error("invalid API URL: {0}")]
    Url(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A latitude/longitude pair that could not be parsed or is out of range
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("expected 'LAT,LON', got '{0}'")]
    Format(String),

    #[error("latitude {0} is outside -90..=90")]
    Latitude(f64),

    #[error("longitude {0} is outside -180..=180")]
    Longitude(f64),
}

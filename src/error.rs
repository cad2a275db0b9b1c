//! Error types for salescache

use thiserror::Error;

/// Result type alias for salescache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// A filter value that cannot be canonically encoded (control characters
    /// and the like). Rejected at the boundary, before any remote call.
    #[error("Invalid value for filter '{field}': {reason}")]
    InvalidFilter { field: String, reason: String },

    /// A filter name outside the recognized set.
    #[error(
        "Unrecognized filter '{0}' (expected one of: city, country, payment_method, product, size)"
    )]
    UnknownFilter(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures from the remote warehouse tier
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Warehouse request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Warehouse authentication failed. Check the configured access token.")]
    Unauthorized,

    #[error("Warehouse rejected the statement: {0}")]
    Query(String),

    #[error("Invalid warehouse response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout
        } else if err.is_connect() {
            RemoteError::Network("Failed to connect to warehouse".to_string())
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}

/// Failures from the embedded local store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt cache entry: {0}")]
    CorruptEntry(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Configuration file not found. Create ~/.salescache/config.yaml or set SALESCACHE_* variables."
    )]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("Warehouse host not configured")]
    MissingHost,

    #[error("Warehouse access token not configured")]
    MissingToken,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

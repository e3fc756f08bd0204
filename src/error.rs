// src/error.rs
// =============================================================================
// Unified error type for everything below the binary edge.
//
// main.rs still uses anyhow::Result, but stores, the validator and the API
// all speak AppError so the API layer can map each kind to a status code.
//
// Note what is NOT in here: probe failures. A link that times out or
// returns 404 is a normal outcome (recorded as invalid), not an error.
// =============================================================================

use std::fmt;

use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed (config file, import/export file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// SQLite returned an error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Store is unusable for a reason other than SQL (e.g. poisoned lock)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied bad input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record does not exist
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// Record already exists
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, key: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = AppError::not_found("link", 42);
        assert_eq!(err.to_string(), "link not found: 42");
    }

    #[test]
    fn test_validation_message() {
        let err = AppError::validation("title is required");
        assert_eq!(err.to_string(), "Validation error: title is required");
    }
}

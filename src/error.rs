//! Error types for the client-pulse library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the application.

use thiserror::Error;

/// Errors that can occur in the client-pulse application.
#[derive(Error, Debug)]
pub enum PulseError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Client not found
    #[error("Client not found: {0}")]
    ClientNotFound(i64),

    /// Signal not found
    #[error("Signal not found: {0}")]
    SignalNotFound(i64),

    /// Severity outside the 1-10 range
    #[error("Invalid severity {0}: must be between 1 and 10")]
    InvalidSeverity(i64),

    /// A stored or supplied label that does not name a known variant
    #[error("Unknown {kind}: {value}")]
    UnknownVariant {
        /// Which enumeration was being parsed
        kind: &'static str,
        /// The offending label
        value: String,
    },

    /// Caller supplied input that failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The inference oracle failed or returned something unusable
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with PulseError
pub type Result<T> = std::result::Result<T, PulseError>;

impl From<anyhow::Error> for PulseError {
    fn from(err: anyhow::Error) -> Self {
        PulseError::Other(err.to_string())
    }
}

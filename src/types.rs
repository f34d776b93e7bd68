//! Error types for Lectern

use thiserror::Error;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, LecternError>;

/// Errors surfaced by Lectern services
#[derive(Error, Debug)]
pub enum LecternError {
    /// Database connection or query failure
    #[error("Database error: {0}")]
    Database(String),

    /// HTTP request parsing failure (bad body, oversized payload)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Token or password handling failure
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A referenced entity does not resolve
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Completion attempted while the predecessor chapter is incomplete
    #[error("Previous chapter must be completed first")]
    SequenceViolation,

    /// Caller lacks the role or ownership required for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unique constraint collision (email, enrollment, sequence number)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request payload failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Socket-level I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

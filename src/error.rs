//! Common error types for punchd

use thiserror::Error;

/// Common result type for punchd operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types across the reconciliation and delivery pipeline
///
/// Connection-level failures (`Device`, `Http`, `Api`) are retryable and
/// never terminate the process; `Validation` aborts the current cycle;
/// storage failures abort the cycle and are retried on the next trigger;
/// `Config` is fatal at startup only.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote API rejected a request (non-2xx, bad token, malformed body)
    #[error("API error: {0}")]
    Api(String),

    /// Time-clock device unreachable or misbehaving
    #[error("Device error: {0}")]
    Device(String),

    /// Device identity failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

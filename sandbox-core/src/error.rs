//! Error types for core operations.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while handling core values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Options JSON could not be parsed.
    #[error("Invalid options: {0}")]
    Options(#[from] serde_json::Error),

    /// A CSS color string was not understood.
    #[error("Unsupported color: {0}")]
    Color(String),
}

//! Renderer error types.

use sandbox_core::CoreError;
use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while building or driving a backend.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The host could not provide the requested drawing context.
    #[error("Rendering context unavailable: {0}")]
    ContextUnavailable(String),

    /// GPU initialization failed.
    #[error("GPU initialization failed: {0}")]
    GpuInit(String),

    /// Shader compilation or linking failed.
    #[error("Shader compilation failed: {0}")]
    Shader(String),

    /// Surface creation or attachment failed.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Uploading a GPU resource failed.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// Presenting a frame failed.
    #[error("Frame render failed: {0}")]
    Frame(String),

    /// Options or configuration were malformed.
    #[error(transparent)]
    Options(#[from] CoreError),
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Options(CoreError::Options(err))
    }
}

//! Browser-side errors and their conversion at the JS boundary.

use sandbox_renderer::RenderError;
use thiserror::Error;
use wasm_bindgen::JsValue;

/// Errors raised while wiring the sandbox into the page.
#[derive(Debug, Error)]
pub enum AppError {
    /// A DOM object the sandbox needs is missing.
    #[error("{0} not found")]
    Missing(String),

    /// A DOM call failed.
    #[error("DOM call failed: {0}")]
    Dom(String),

    /// A backend call failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// JSON input was malformed.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// No 2D backend is active for a drawing call.
    #[error("The 2D backend is not active")]
    No2dBackend,

    /// A backend switch is still awaiting the GPU.
    #[error("The sandbox is busy switching backends")]
    Busy,
}

impl AppError {
    /// Describe a failed DOM call.
    pub fn dom(err: &JsValue) -> Self {
        Self::Dom(err.as_string().unwrap_or_else(|| format!("{err:?}")))
    }
}

impl From<AppError> for JsValue {
    fn from(err: AppError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Result type for browser-side operations.
pub type AppResult<T> = Result<T, AppError>;

/// Map a renderer error to a JS value.
pub fn to_js(err: RenderError) -> JsValue {
    AppError::from(err).into()
}

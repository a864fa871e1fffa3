//! # Sandbox Renderer
//!
//! Interchangeable rendering backends behind one façade, driven by frame
//! callbacks from a [`Host`](host::Host).
//!
//! ## Rendering Backends
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        CanvasManager (one active)           │
//! ├─────────────┬─────────────┬─────────────────┤
//! │ Canvas2D    │ WebGL       │ Retained        │
//! │ (3 layers,  │ (cube, orbit│ (stage, GPU     │
//! │ animations) │ camera)     │ presenter)      │
//! ├─────────────┴─────────────┴─────────────────┤
//! │   Host: surfaces · frames · observers       │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod camera;
pub mod error;
pub mod headless;
pub mod host;
pub mod manager;
pub mod mesh;
pub mod opening;
pub mod runner;
pub mod spatial;
pub mod stage;

pub use backend::{
    canvas2d::Canvas2DRenderer, retained::RetainedRenderer, webgl::WebGlRenderer, RenderBackend,
};
pub use error::{RenderError, RenderResult};
pub use host::{FrameScheduler, GlContext, Host, PointerInput, StagePresenter, Subscription};
pub use manager::{ActiveBackend, CanvasManager};
pub use opening::first_screen_animation;
pub use runner::Completion;

use sandbox_core::CanvasOptions;
use serde::{Deserialize, Serialize};

/// Default clear color, a pale mint.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.941, 1.0, 0.980, 1.0];

/// Configuration shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RendererConfig {
    /// Sizing options.
    pub canvas: CanvasOptions,
    /// Request an antialiased GL context.
    pub antialias: bool,
    /// Clear color (RGBA) of the GPU backends.
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasOptions::default(),
            antialias: true,
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }
}

impl RendererConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> RenderResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Available rendering backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Multi-layer 2D canvas.
    #[serde(rename = "2d")]
    Canvas2D,
    /// Raw WebGL.
    WebGl,
    /// Retained display list on a GPU presenter.
    Retained,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Canvas2D => "2d",
            Self::WebGl => "webgl",
            Self::Retained => "retained",
        };
        f.write_str(name)
    }
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

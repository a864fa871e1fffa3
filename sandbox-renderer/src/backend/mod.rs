//! Rendering backend implementations.

pub mod canvas2d;
pub mod retained;
pub mod webgl;

use sandbox_core::CanvasOptions;

use crate::{BackendType, RenderResult};

/// Trait for rendering backends.
///
/// Construction doubles as initialization: a backend value is always
/// initialized until [`destroy`](RenderBackend::destroy) is called. Calls
/// after destroy are logged and ignored.
pub trait RenderBackend {
    /// Get the backend type.
    fn backend_type(&self) -> BackendType;

    /// Re-measure the container (or apply `options` overrides) and resize
    /// every owned surface.
    ///
    /// # Errors
    ///
    /// Returns an error if resizing fails.
    fn resize_canvas(&mut self, options: &CanvasOptions) -> RenderResult<()>;

    /// Resize to a fixed CSS size.
    ///
    /// # Errors
    ///
    /// Returns an error if resizing fails.
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.resize_canvas(&CanvasOptions::fixed(f64::from(width), f64::from(height)))
    }

    /// Present the current content.
    ///
    /// # Errors
    ///
    /// Returns an error if presenting fails.
    fn render(&mut self) -> RenderResult<()>;

    /// Release every surface, buffer and pending frame. Idempotent.
    fn destroy(&mut self);

    /// Whether [`destroy`](RenderBackend::destroy) has run.
    fn is_destroyed(&self) -> bool;
}

/// Device pixels for a CSS length at `dpr`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn device_pixels(css: f64, dpr: f64) -> u32 {
    (css * dpr).round().max(0.0) as u32
}

/// Effective device pixel ratio; non-positive or non-finite values count as 1.
pub(crate) fn effective_dpr(dpr: f64) -> f64 {
    if dpr.is_finite() && dpr > 0.0 {
        dpr
    } else {
        1.0
    }
}

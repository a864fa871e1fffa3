//! The environment contract the backends are generic over.
//!
//! ```text
//! ┌──────────────┐   surfaces, GL, presenter   ┌──────────────┐
//! │   Backends   │ ◄────────────────────────── │     Host     │
//! │ 2D/WebGL/Ret │ ──── frame requests ──────► │ browser or   │
//! │              │ ◄─── resize / pointer ───── │ headless     │
//! └──────────────┘                             └──────────────┘
//! ```
//!
//! Everything is single-threaded; implementations hand out `Rc` handles and
//! never invoke a frame callback synchronously from `request_frame`.

use std::rc::Rc;

use async_trait::async_trait;
use sandbox_core::Surface;

use crate::{stage::ColorVertex, RenderResult};

/// Opaque identifier of a scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

/// Callback invoked with the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Source of animation frames (`requestAnimationFrame` in the browser).
pub trait FrameScheduler {
    /// Run `callback` on the next frame.
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;

    /// Drop a pending callback without running it. Unknown handles are ignored.
    fn cancel_frame(&self, handle: FrameHandle);

    /// Current time on the same clock as frame timestamps.
    fn now(&self) -> f64;
}

/// Pointer input relevant to the orbit camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    /// Pointer moved by `(dx, dy)` CSS pixels while a button was held.
    Drag {
        /// Horizontal movement.
        dx: f64,
        /// Vertical movement.
        dy: f64,
    },
    /// Wheel scrolled.
    Wheel {
        /// Vertical wheel delta.
        delta_y: f64,
    },
}

/// A registration that is disconnected when dropped.
#[must_use = "dropping a Subscription disconnects it"]
pub struct Subscription(Option<Box<dyn FnOnce()>>);

impl Subscription {
    /// Wrap a disconnect action.
    pub fn new(disconnect: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(disconnect)))
    }

    /// A subscription with nothing to disconnect.
    pub fn empty() -> Self {
        Self(None)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(disconnect) = self.0.take() {
            disconnect();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("connected", &self.0.is_some())
            .finish()
    }
}

/// A WebGL-style context bound to its own surface.
///
/// Only the calls the colored-triangle pipeline needs are exposed.
pub trait GlContext {
    /// Linked shader program handle.
    type Program;
    /// Vertex buffer handle.
    type Buffer;

    /// Resize the drawing buffer in device pixels.
    fn set_pixel_size(&self, width: u32, height: u32);

    /// Set the displayed (CSS) size.
    fn set_css_size(&self, width: f64, height: f64);

    /// Set the viewport to cover `width` x `height` device pixels.
    fn viewport(&self, width: u32, height: u32);

    /// Set the clear color.
    fn clear_color(&self, rgba: [f32; 4]);

    /// Enable depth testing with a less-or-equal comparison.
    fn enable_depth_test(&self);

    /// Clear color and depth buffers.
    fn clear(&self);

    /// Compile and link a program.
    ///
    /// # Errors
    ///
    /// Returns the info log when compiling or linking fails.
    fn compile_program(&self, vertex_src: &str, fragment_src: &str)
        -> Result<Self::Program, String>;

    /// Make `program` current.
    fn use_program(&self, program: &Self::Program);

    /// Upload static vertex data.
    ///
    /// # Errors
    ///
    /// Returns a message when the buffer cannot be created.
    fn create_buffer(&self, data: &[f32]) -> Result<Self::Buffer, String>;

    /// Bind `buffer` to the attribute `name` with `components` floats per vertex.
    fn bind_attribute(
        &self,
        program: &Self::Program,
        buffer: &Self::Buffer,
        name: &str,
        components: i32,
    );

    /// Set a 4x4 matrix uniform (column-major).
    fn set_uniform_mat4(&self, program: &Self::Program, name: &str, value: &[f32; 16]);

    /// Draw `vertex_count` vertices as triangles.
    fn draw_triangles(&self, vertex_count: usize);

    /// Release a program.
    fn delete_program(&self, program: Self::Program);

    /// Release a buffer.
    fn delete_buffer(&self, buffer: Self::Buffer);

    /// Remove the surface from the document.
    fn detach(&self);
}

/// A GPU surface that presents tessellated stage content.
pub trait StagePresenter {
    /// Resize the presenter surface.
    fn resize(&self, pixel_width: u32, pixel_height: u32, css_width: f64, css_height: f64);

    /// Clear to `clear` and draw `vertices` as a triangle list.
    ///
    /// # Errors
    ///
    /// Returns a message when the frame could not be presented.
    fn present(&self, vertices: &[ColorVertex], clear: [f32; 4]) -> Result<(), String>;

    /// Remove the surface from the document and release GPU resources.
    fn detach(&self);
}

/// The container environment a backend renders into.
#[async_trait(?Send)]
pub trait Host {
    /// 2D drawing layer type.
    type Surface: Surface + Clone + 'static;
    /// WebGL context type.
    type Gl: GlContext + 'static;
    /// Retained presenter type.
    type Presenter: StagePresenter + 'static;

    /// Container size in CSS pixels.
    fn container_size(&self) -> (f64, f64);

    /// Device pixel ratio, at least 1 in practice.
    fn device_pixel_ratio(&self) -> f64;

    /// Create a 2D surface; `attach` places it in the container.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ContextUnavailable`](crate::RenderError) when no
    /// 2D context can be obtained.
    fn create_surface(&self, id: &str, attach: bool) -> RenderResult<Self::Surface>;

    /// Create an attached surface with a WebGL context.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ContextUnavailable`](crate::RenderError) when
    /// WebGL is not supported.
    fn create_gl_surface(&self, id: &str, antialias: bool) -> RenderResult<Self::Gl>;

    /// Create an attached GPU presenter.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::GpuInit`](crate::RenderError) when no adapter or
    /// device is available.
    async fn create_presenter(
        &self,
        id: &str,
        pixel_width: u32,
        pixel_height: u32,
    ) -> RenderResult<Self::Presenter>;

    /// The frame scheduler shared by every backend on this host.
    fn scheduler(&self) -> Rc<dyn FrameScheduler>;

    /// Call `callback` whenever the container changes size.
    fn observe_resize(&self, callback: Box<dyn Fn()>) -> Subscription;

    /// Deliver pointer input targeting the surface `surface_id`.
    fn observe_pointer(&self, surface_id: &str, callback: Box<dyn Fn(PointerInput)>)
        -> Subscription;
}

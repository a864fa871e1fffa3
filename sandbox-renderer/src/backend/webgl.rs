//! Raw WebGL backend: one colored-triangle pipeline drawing a fixed cube
//! under an orbit camera.

use std::{cell::RefCell, f32::consts::FRAC_PI_4, rc::Rc};

use sandbox_core::CanvasOptions;

use super::{device_pixels, effective_dpr, RenderBackend};
use crate::{
    camera::CameraController,
    host::{GlContext, Host, Subscription},
    mesh::rubik_cube,
    runner::{FrameDriver, FrameLoop},
    spatial::Mat4,
    BackendType, RenderError, RenderResult, RendererConfig,
};

/// Id of the WebGL surface.
pub const GL_SURFACE_ID: &str = "sandbox-webgl";
/// Vertical field of view.
pub const FIELD_OF_VIEW: f32 = FRAC_PI_4;
/// Near clipping plane.
pub const NEAR_PLANE: f32 = 0.1;
/// Far clipping plane.
pub const FAR_PLANE: f32 = 100.0;

const VERTEX_SHADER: &str = r"
attribute vec3 a_Position;
attribute vec3 a_Color;
varying vec3 v_Color;

uniform mat4 uProjection;
uniform mat4 uView;
uniform mat4 uModel;

void main() {
    gl_Position = uProjection * uView * uModel * vec4(a_Position, 1.0);
    v_Color = a_Color;
}
";

const FRAGMENT_SHADER: &str = r"
precision mediump float;
varying vec3 v_Color;

void main() {
    gl_FragColor = vec4(v_Color, 1.0);
}
";

struct Pipeline<G: GlContext> {
    program: G::Program,
    positions: G::Buffer,
    colors: G::Buffer,
    vertex_count: usize,
}

struct GlState<G: GlContext> {
    gl: G,
    pipeline: Option<Pipeline<G>>,
    camera: CameraController,
    pixel_size: (u32, u32),
}

/// Compile the shaders and upload the cube.
fn build_pipeline<G: GlContext>(gl: &G) -> RenderResult<Pipeline<G>> {
    let program = gl
        .compile_program(VERTEX_SHADER, FRAGMENT_SHADER)
        .map_err(RenderError::Shader)?;
    let mesh = rubik_cube();
    let positions = match gl.create_buffer(&mesh.positions) {
        Ok(buffer) => buffer,
        Err(err) => {
            gl.delete_program(program);
            return Err(RenderError::Resource(err));
        }
    };
    let colors = match gl.create_buffer(&mesh.colors) {
        Ok(buffer) => buffer,
        Err(err) => {
            gl.delete_buffer(positions);
            gl.delete_program(program);
            return Err(RenderError::Resource(err));
        }
    };
    gl.use_program(&program);
    gl.bind_attribute(&program, &positions, "a_Position", 3);
    gl.bind_attribute(&program, &colors, "a_Color", 3);
    Ok(Pipeline {
        program,
        positions,
        colors,
        vertex_count: mesh.vertex_count(),
    })
}

fn draw_frame<G: GlContext>(state: &GlState<G>) {
    let Some(pipeline) = &state.pipeline else {
        return;
    };
    let (width, height) = state.pixel_size;
    #[allow(clippy::cast_precision_loss)]
    let aspect = if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    };
    let projection = Mat4::perspective(FIELD_OF_VIEW, aspect, NEAR_PLANE, FAR_PLANE);
    let view = state.camera.view_matrix();

    let gl = &state.gl;
    gl.viewport(width, height);
    gl.clear();
    gl.use_program(&pipeline.program);
    gl.set_uniform_mat4(&pipeline.program, "uProjection", &projection.data);
    gl.set_uniform_mat4(&pipeline.program, "uView", &view.data);
    gl.set_uniform_mat4(&pipeline.program, "uModel", &Mat4::IDENTITY.data);
    gl.draw_triangles(pipeline.vertex_count);
}

/// The WebGL backend.
pub struct WebGlRenderer<H: Host> {
    host: Rc<H>,
    state: Option<Rc<RefCell<GlState<H::Gl>>>>,
    pipeline_error: Option<String>,
    frame_loop: FrameLoop,
    pointer: Option<Subscription>,
    css_size: (f64, f64),
}

impl<H: Host> std::fmt::Debug for WebGlRenderer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebGlRenderer")
            .field("css_size", &self.css_size)
            .field("destroyed", &self.state.is_none())
            .field("pipeline_error", &self.pipeline_error)
            .field("animating", &self.frame_loop.is_running())
            .finish_non_exhaustive()
    }
}

impl<H: Host + 'static> WebGlRenderer<H> {
    /// Create the GL surface, compile the pipeline and upload the cube.
    ///
    /// A pipeline failure is logged and leaves the backend inert; see
    /// [`pipeline_error`](Self::pipeline_error).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ContextUnavailable`] when WebGL is unsupported.
    pub fn new(host: Rc<H>, config: &RendererConfig) -> RenderResult<Self> {
        let gl = host.create_gl_surface(GL_SURFACE_ID, config.antialias)?;
        gl.clear_color(config.clear_color);
        gl.clear();
        gl.enable_depth_test();

        let (pipeline, pipeline_error) = match build_pipeline(&gl) {
            Ok(pipeline) => (Some(pipeline), None),
            Err(err) => {
                tracing::error!("WebGL pipeline unavailable, backend is inert: {err}");
                (None, Some(err.to_string()))
            }
        };

        let state = Rc::new(RefCell::new(GlState {
            gl,
            pipeline,
            camera: CameraController::new(),
            pixel_size: (0, 0),
        }));

        let weak = Rc::downgrade(&state);
        let pointer = host.observe_pointer(
            GL_SURFACE_ID,
            Box::new(move |input| {
                if let Some(state) = weak.upgrade() {
                    state.borrow_mut().camera.handle(input);
                }
            }),
        );

        let mut renderer = Self {
            frame_loop: FrameLoop::new(FrameDriver::new(host.scheduler())),
            host,
            state: Some(state),
            pipeline_error,
            pointer: Some(pointer),
            css_size: (0.0, 0.0),
        };
        renderer.apply_size(&config.canvas);
        tracing::debug!("WebGL backend initialized");
        Ok(renderer)
    }

    /// Why the pipeline could not be built, if it could not.
    #[must_use]
    pub fn pipeline_error(&self) -> Option<&str> {
        self.pipeline_error.as_deref()
    }

    /// Whether the backend draws anything.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.state
            .as_ref()
            .map_or(true, |s| s.borrow().pipeline.is_none())
    }

    /// A copy of the current camera.
    #[must_use]
    pub fn camera(&self) -> Option<CameraController> {
        self.state.as_ref().map(|s| s.borrow().camera.clone())
    }

    /// Whether the self-scheduling render loop is running.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.frame_loop.is_running()
    }

    /// Current CSS size.
    #[must_use]
    pub fn css_size(&self) -> (f64, f64) {
        self.css_size
    }

    fn apply_size(&mut self, options: &CanvasOptions) {
        let Some(state) = &self.state else {
            tracing::warn!("WebGL resize called after destroy, ignoring");
            return;
        };
        let (css_width, css_height) = options.resolve_size(self.host.container_size());
        let dpr = effective_dpr(self.host.device_pixel_ratio());
        let width = device_pixels(css_width, dpr);
        let height = device_pixels(css_height, dpr);

        let mut state = state.borrow_mut();
        state.gl.set_pixel_size(width, height);
        state.gl.set_css_size(css_width, css_height);
        state.gl.viewport(width, height);
        state.pixel_size = (width, height);
        self.css_size = (css_width, css_height);
        tracing::debug!("WebGL resized to {css_width}x{css_height} ({width}x{height} device pixels)");
    }
}

impl<H: Host + 'static> RenderBackend for WebGlRenderer<H> {
    fn backend_type(&self) -> BackendType {
        BackendType::WebGl
    }

    fn resize_canvas(&mut self, options: &CanvasOptions) -> RenderResult<()> {
        self.apply_size(options);
        Ok(())
    }

    fn render(&mut self) -> RenderResult<()> {
        let Some(state) = &self.state else {
            tracing::warn!("WebGL render called after destroy, ignoring");
            return Ok(());
        };
        if state.borrow().pipeline.is_none() {
            tracing::trace!("WebGL backend is inert, skipping render");
            return Ok(());
        }
        draw_frame(&state.borrow());
        if !self.frame_loop.is_running() {
            let weak = Rc::downgrade(state);
            self.frame_loop.start(move |_timestamp| {
                if let Some(state) = weak.upgrade() {
                    let mut state = state.borrow_mut();
                    state.camera.update();
                    draw_frame(&state);
                }
            });
            tracing::debug!("WebGL render loop started");
        }
        Ok(())
    }

    fn destroy(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        self.pointer = None;
        self.frame_loop.stop();
        let mut state = state.borrow_mut();
        if let Some(pipeline) = state.pipeline.take() {
            state.gl.delete_buffer(pipeline.positions);
            state.gl.delete_buffer(pipeline.colors);
            state.gl.delete_program(pipeline.program);
        }
        state.gl.detach();
        tracing::debug!("WebGL backend destroyed");
    }

    fn is_destroyed(&self) -> bool {
        self.state.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        headless::{GlCall, HeadlessHost},
        host::PointerInput,
    };

    fn setup() -> (Rc<HeadlessHost>, WebGlRenderer<HeadlessHost>) {
        let host = Rc::new(HeadlessHost::new(800.0, 400.0));
        let renderer = WebGlRenderer::new(Rc::clone(&host), &RendererConfig::default()).unwrap();
        (host, renderer)
    }

    #[test]
    fn test_initialize_configures_context() {
        let (host, renderer) = setup();
        let calls = host.gl(GL_SURFACE_ID).unwrap().calls();
        assert!(calls.contains(&GlCall::ClearColor(RendererConfig::default().clear_color)));
        assert!(calls.contains(&GlCall::EnableDepthTest));
        assert!(calls.contains(&GlCall::CreateBuffer(27 * 6 * 6 * 3)));
        assert!(calls.contains(&GlCall::SetPixelSize(800, 400)));
        assert!(renderer.pipeline_error().is_none());
        assert!(!renderer.is_inert());
    }

    #[test]
    fn test_render_draws_and_starts_loop() {
        let (host, mut renderer) = setup();
        let gl = host.gl(GL_SURFACE_ID).unwrap();
        renderer.render().unwrap();
        assert_eq!(gl.draw_calls(), 1);
        assert!(renderer.is_animating());

        host.advance(16.0);
        host.advance(16.0);
        assert_eq!(gl.draw_calls(), 3);

        // A second render does not start a second loop.
        renderer.render().unwrap();
        host.advance(16.0);
        assert_eq!(gl.draw_calls(), 5);
    }

    #[test]
    fn test_projection_uses_fixed_field_of_view() {
        let (host, mut renderer) = setup();
        host.pointer(GL_SURFACE_ID, PointerInput::Drag { dx: 50.0, dy: 0.0 });
        renderer.render().unwrap();
        let gl = host.gl(GL_SURFACE_ID).unwrap();
        let expected = Mat4::perspective(FIELD_OF_VIEW, 2.0, NEAR_PLANE, FAR_PLANE);
        assert_eq!(gl.uniform("uProjection"), Some(expected.data));
        assert_eq!(gl.uniform("uModel"), Some(Mat4::IDENTITY.data));
    }

    #[test]
    fn test_pointer_input_moves_camera() {
        let (host, mut renderer) = setup();
        host.pointer(GL_SURFACE_ID, PointerInput::Wheel { delta_y: 100.0 });
        let cam = renderer.camera().unwrap();
        assert!((cam.target_distance() - 16.2).abs() < 1e-4);

        renderer.render().unwrap();
        host.advance(16.0);
        assert!(renderer.camera().unwrap().distance() > 11.2);
    }

    #[test]
    fn test_shader_failure_leaves_backend_inert() {
        let host = Rc::new(HeadlessHost::new(800.0, 400.0));
        host.fail_shader_compilation(true);
        let mut renderer = WebGlRenderer::new(Rc::clone(&host), &RendererConfig::default()).unwrap();
        assert!(renderer.is_inert());
        assert!(renderer.pipeline_error().unwrap().contains("syntax error"));

        renderer.render().unwrap();
        host.advance(16.0);
        assert_eq!(host.gl(GL_SURFACE_ID).unwrap().draw_calls(), 0);
        assert!(!renderer.is_animating());
    }

    #[test]
    fn test_missing_webgl_is_fatal() {
        let host = Rc::new(HeadlessHost::new(800.0, 400.0));
        host.set_webgl_available(false);
        let err = WebGlRenderer::new(host, &RendererConfig::default()).unwrap_err();
        assert!(matches!(err, RenderError::ContextUnavailable(_)));
    }

    #[test]
    fn test_destroy_releases_everything() {
        let (host, mut renderer) = setup();
        renderer.render().unwrap();
        renderer.destroy();
        let gl = host.gl(GL_SURFACE_ID).unwrap();
        assert!(!gl.is_live());
        assert!(gl.calls().iter().any(|c| matches!(c, GlCall::DeleteProgram(_))));
        assert_eq!(host.frames().queued(), 0);
        assert!(renderer.is_destroyed());

        let draws = gl.draw_calls();
        renderer.render().unwrap();
        renderer.resize(10, 10).unwrap();
        host.advance(16.0);
        assert_eq!(gl.draw_calls(), draws);
        renderer.destroy();
    }
}

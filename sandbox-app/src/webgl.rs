//! [`GlContext`] over a WebGL 1 rendering context.

use js_sys::Float32Array;
use sandbox_renderer::GlContext;
use web_sys::{
    HtmlCanvasElement, WebGlBuffer, WebGlProgram, WebGlRenderingContext as Gl, WebGlShader,
};

/// A canvas element and its WebGL context.
#[derive(Debug, Clone)]
pub struct WebGlSurface {
    canvas: HtmlCanvasElement,
    gl: Gl,
}

impl WebGlSurface {
    /// Wrap an existing canvas and context.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, gl: Gl) -> Self {
        Self { canvas, gl }
    }

    fn compile_shader(&self, kind: u32, source: &str) -> Result<WebGlShader, String> {
        let shader = self
            .gl
            .create_shader(kind)
            .ok_or_else(|| "Unable to create shader object".to_string())?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);
        let compiled = self
            .gl
            .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false);
        if compiled {
            Ok(shader)
        } else {
            let log = self
                .gl
                .get_shader_info_log(&shader)
                .unwrap_or_else(|| "Unknown error creating shader".to_string());
            self.gl.delete_shader(Some(&shader));
            Err(log)
        }
    }
}

fn gl_size(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

impl GlContext for WebGlSurface {
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;

    fn set_pixel_size(&self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn set_css_size(&self, width: f64, height: f64) {
        let style = self.canvas.style();
        let _ = style.set_property("width", &format!("{width}px"));
        let _ = style.set_property("height", &format!("{height}px"));
    }

    fn viewport(&self, width: u32, height: u32) {
        self.gl.viewport(0, 0, gl_size(width), gl_size(height));
    }

    fn clear_color(&self, [r, g, b, a]: [f32; 4]) {
        self.gl.clear_color(r, g, b, a);
    }

    fn enable_depth_test(&self) {
        self.gl.enable(Gl::DEPTH_TEST);
        self.gl.depth_func(Gl::LEQUAL);
    }

    fn clear(&self) {
        self.gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);
    }

    fn compile_program(&self, vertex_src: &str, fragment_src: &str) -> Result<WebGlProgram, String> {
        let vertex = self.compile_shader(Gl::VERTEX_SHADER, vertex_src)?;
        let fragment = match self.compile_shader(Gl::FRAGMENT_SHADER, fragment_src) {
            Ok(shader) => shader,
            Err(err) => {
                self.gl.delete_shader(Some(&vertex));
                return Err(err);
            }
        };
        let program = self
            .gl
            .create_program()
            .ok_or_else(|| "Unable to create program object".to_string())?;
        self.gl.attach_shader(&program, &vertex);
        self.gl.attach_shader(&program, &fragment);
        self.gl.link_program(&program);
        // Linked programs keep their own copy.
        self.gl.delete_shader(Some(&vertex));
        self.gl.delete_shader(Some(&fragment));

        let linked = self
            .gl
            .get_program_parameter(&program, Gl::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if linked {
            Ok(program)
        } else {
            let log = self
                .gl
                .get_program_info_log(&program)
                .unwrap_or_else(|| "Unknown error linking program".to_string());
            self.gl.delete_program(Some(&program));
            Err(log)
        }
    }

    fn use_program(&self, program: &WebGlProgram) {
        self.gl.use_program(Some(program));
    }

    fn create_buffer(&self, data: &[f32]) -> Result<WebGlBuffer, String> {
        let buffer = self
            .gl
            .create_buffer()
            .ok_or_else(|| "Unable to create buffer".to_string())?;
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&buffer));
        let array = Float32Array::from(data);
        self.gl
            .buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &array, Gl::STATIC_DRAW);
        Ok(buffer)
    }

    fn bind_attribute(&self, program: &WebGlProgram, buffer: &WebGlBuffer, name: &str, components: i32) {
        let Ok(location) = u32::try_from(self.gl.get_attrib_location(program, name)) else {
            tracing::warn!("Attribute {name} is not active in the program");
            return;
        };
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(buffer));
        self.gl
            .vertex_attrib_pointer_with_i32(location, components, Gl::FLOAT, false, 0, 0);
        self.gl.enable_vertex_attrib_array(location);
    }

    fn set_uniform_mat4(&self, program: &WebGlProgram, name: &str, value: &[f32; 16]) {
        let location = self.gl.get_uniform_location(program, name);
        self.gl
            .uniform_matrix4fv_with_f32_array(location.as_ref(), false, value);
    }

    fn draw_triangles(&self, vertex_count: usize) {
        let count = i32::try_from(vertex_count).unwrap_or(i32::MAX);
        self.gl.draw_arrays(Gl::TRIANGLES, 0, count);
    }

    fn delete_program(&self, program: WebGlProgram) {
        self.gl.delete_program(Some(&program));
    }

    fn delete_buffer(&self, buffer: WebGlBuffer) {
        self.gl.delete_buffer(Some(&buffer));
    }

    fn detach(&self) {
        self.canvas.remove();
    }
}

//! wgpu presenter for the retained backend.

use std::cell::RefCell;

use sandbox_renderer::{stage::ColorVertex, RenderError, RenderResult, StagePresenter};
use web_sys::HtmlCanvasElement;
use wgpu::util::DeviceExt;

const SHADER: &str = r"
struct VertexOut {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec4<f32>) -> VertexOut {
    var out: VertexOut;
    out.position = vec4<f32>(position, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    return in.color;
}
";

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];

/// Device, surface and pipeline bound to one canvas.
pub struct GpuPresenter {
    canvas: HtmlCanvasElement,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: RefCell<wgpu::SurfaceConfiguration>,
    pipeline: wgpu::RenderPipeline,
}

impl std::fmt::Debug for GpuPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.config.borrow();
        f.debug_struct("GpuPresenter")
            .field("width", &config.width)
            .field("height", &config.height)
            .field("format", &config.format)
            .finish_non_exhaustive()
    }
}

#[cfg(target_arch = "wasm32")]
fn canvas_surface(
    instance: &wgpu::Instance,
    canvas: &HtmlCanvasElement,
) -> RenderResult<wgpu::Surface<'static>> {
    instance
        .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
        .map_err(|e| RenderError::GpuInit(e.to_string()))
}

#[cfg(not(target_arch = "wasm32"))]
fn canvas_surface(
    _instance: &wgpu::Instance,
    _canvas: &HtmlCanvasElement,
) -> RenderResult<wgpu::Surface<'static>> {
    Err(RenderError::GpuInit(
        "Canvas surfaces are only available on wasm32".to_string(),
    ))
}

impl GpuPresenter {
    /// Acquire an adapter and device for `canvas` and build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::GpuInit`] if no adapter, device or surface
    /// configuration is available.
    pub async fn new(canvas: HtmlCanvasElement, width: u32, height: u32) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = canvas_surface(&instance, &canvas)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RenderError::GpuInit("No suitable GPU adapter found".to_string()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Canvas Sandbox Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::GpuInit(e.to_string()))?;

        let config = surface
            .get_default_config(&adapter, width.max(1), height.max(1))
            .ok_or_else(|| RenderError::GpuInit("Surface not supported by adapter".to_string()))?;
        surface.configure(&device, &config);
        let pipeline = build_pipeline(&device, config.format);

        tracing::info!(
            "wgpu presenter initialized with adapter: {:?}",
            adapter.get_info()
        );
        Ok(Self {
            canvas,
            surface,
            device,
            queue,
            config: RefCell::new(config),
            pipeline,
        })
    }
}

fn build_pipeline(device: &wgpu::Device, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("stage shader"),
        source: wgpu::ShaderSource::Wgsl(SHADER.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("stage layout"),
        bind_group_layouts: &[],
        push_constant_ranges: &[],
    });
    let stride = std::mem::size_of::<ColorVertex>() as wgpu::BufferAddress;
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("stage pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

impl StagePresenter for GpuPresenter {
    fn resize(&self, pixel_width: u32, pixel_height: u32, css_width: f64, css_height: f64) {
        self.canvas.set_width(pixel_width);
        self.canvas.set_height(pixel_height);
        let style = self.canvas.style();
        let _ = style.set_property("width", &format!("{css_width}px"));
        let _ = style.set_property("height", &format!("{css_height}px"));

        let mut config = self.config.borrow_mut();
        config.width = pixel_width.max(1);
        config.height = pixel_height.max(1);
        self.surface.configure(&self.device, &config);
    }

    fn present(&self, vertices: &[ColorVertex], clear: [f32; 4]) -> Result<(), String> {
        let frame = self
            .surface
            .get_current_texture()
            .map_err(|e| e.to_string())?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let vertex_buffer = (!vertices.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("stage vertices"),
                    contents: bytemuck::cast_slice(vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("stage encoder"),
            });
        {
            let [r, g, b, a] = clear.map(f64::from);
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("stage pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Some(buffer) = &vertex_buffer {
                let count = u32::try_from(vertices.len()).map_err(|e| e.to_string())?;
                pass.set_pipeline(&self.pipeline);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..count, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn detach(&self) {
        self.canvas.remove();
    }
}

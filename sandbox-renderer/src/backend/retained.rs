//! Retained-mode backend: a [`Stage`] of display objects re-presented every
//! frame through a GPU presenter.

use std::{
    cell::{Cell, Ref, RefCell, RefMut},
    rc::Rc,
};

use sandbox_core::{CanvasOptions, Rgba};

use super::{device_pixels, effective_dpr, RenderBackend};
use crate::{
    host::{Host, StagePresenter, Subscription},
    runner::{FrameDriver, FrameLoop},
    stage::Stage,
    BackendType, RenderError, RenderResult, RendererConfig,
};

/// Id of the presenter surface.
pub const RETAINED_SURFACE_ID: &str = "sandbox-retained";

struct Presentation<H: Host> {
    host: Rc<H>,
    presenter: H::Presenter,
    stage: RefCell<Stage>,
    clear_color: [f32; 4],
    options: RefCell<CanvasOptions>,
    css_size: Cell<(f64, f64)>,
}

impl<H: Host> Presentation<H> {
    fn present(&self) -> RenderResult<()> {
        let (width, height) = self.css_size.get();
        let vertices = self.stage.borrow().tessellate(width, height);
        tracing::trace!("Presenting {} vertices", vertices.len());
        self.presenter
            .present(&vertices, self.clear_color)
            .map_err(RenderError::Frame)
    }

    fn apply_size(&self, options: &CanvasOptions) {
        *self.options.borrow_mut() = options.clone();
        let (css_width, css_height) = options.resolve_size(self.host.container_size());
        let dpr = effective_dpr(self.host.device_pixel_ratio());
        let width = device_pixels(css_width, dpr);
        let height = device_pixels(css_height, dpr);
        self.presenter.resize(width, height, css_width, css_height);
        self.css_size.set((css_width, css_height));
        tracing::debug!(
            "Retained surface resized to {css_width}x{css_height} ({width}x{height} device pixels)"
        );
    }
}

/// The retained-mode backend.
pub struct RetainedRenderer<H: Host> {
    presentation: Option<Rc<Presentation<H>>>,
    frame_loop: FrameLoop,
    resize_subscription: Option<Subscription>,
}

impl<H: Host + 'static> std::fmt::Debug for RetainedRenderer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetainedRenderer")
            .field("css_size", &self.css_size())
            .field("destroyed", &self.presentation.is_none())
            .field("animating", &self.frame_loop.is_running())
            .finish_non_exhaustive()
    }
}

impl<H: Host + 'static> RetainedRenderer<H> {
    /// Acquire a presenter from the host and size it.
    ///
    /// The clear color is `config.canvas.background_color` when it parses,
    /// `config.clear_color` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::GpuInit`] when no presenter can be created.
    pub async fn initialize(host: Rc<H>, config: &RendererConfig) -> RenderResult<Self> {
        let options = config.canvas.clone();
        let (css_width, css_height) = options.resolve_size(host.container_size());
        let dpr = effective_dpr(host.device_pixel_ratio());
        let presenter = host
            .create_presenter(
                RETAINED_SURFACE_ID,
                device_pixels(css_width, dpr),
                device_pixels(css_height, dpr),
            )
            .await?;

        let [r, g, b, a] = config.clear_color;
        let fallback = Rgba::new(r, g, b, a);
        let clear_color = options
            .background_color
            .as_deref()
            .map_or(fallback, |css| Rgba::parse_or(css, fallback))
            .to_array();

        let frame_loop = FrameLoop::new(FrameDriver::new(host.scheduler()));
        let presentation = Rc::new(Presentation {
            host,
            presenter,
            stage: RefCell::new(Stage::new()),
            clear_color,
            options: RefCell::new(options.clone()),
            css_size: Cell::new((0.0, 0.0)),
        });
        presentation.apply_size(&options);

        let resize_subscription = options.responsive.then(|| {
            let weak = Rc::downgrade(&presentation);
            presentation.host.observe_resize(Box::new(move || {
                if let Some(presentation) = weak.upgrade() {
                    let options = presentation.options.borrow().clone();
                    presentation.apply_size(&options);
                }
            }))
        });

        tracing::debug!("Retained backend initialized");
        Ok(Self {
            presentation: Some(presentation),
            frame_loop,
            resize_subscription,
        })
    }

    /// The display list.
    #[must_use]
    pub fn stage(&self) -> Option<Ref<'_, Stage>> {
        self.presentation.as_ref().map(|p| p.stage.borrow())
    }

    /// The display list, for editing. Changes show on the next frame.
    pub fn stage_mut(&self) -> Option<RefMut<'_, Stage>> {
        if self.presentation.is_none() {
            tracing::warn!("Retained stage_mut called after destroy, ignoring");
        }
        self.presentation.as_ref().map(|p| p.stage.borrow_mut())
    }

    /// Color the surface is cleared to each frame.
    #[must_use]
    pub fn clear_color(&self) -> Option<[f32; 4]> {
        self.presentation.as_ref().map(|p| p.clear_color)
    }

    /// Current CSS size.
    #[must_use]
    pub fn css_size(&self) -> (f64, f64) {
        self.presentation
            .as_ref()
            .map_or((0.0, 0.0), |p| p.css_size.get())
    }

    /// Whether the self-scheduling render loop is running.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.frame_loop.is_running()
    }
}

impl<H: Host + 'static> RenderBackend for RetainedRenderer<H> {
    fn backend_type(&self) -> BackendType {
        BackendType::Retained
    }

    fn resize_canvas(&mut self, options: &CanvasOptions) -> RenderResult<()> {
        match &self.presentation {
            Some(presentation) => presentation.apply_size(options),
            None => tracing::warn!("Retained resize called after destroy, ignoring"),
        }
        Ok(())
    }

    fn render(&mut self) -> RenderResult<()> {
        let Some(presentation) = &self.presentation else {
            tracing::warn!("Retained render called after destroy, ignoring");
            return Ok(());
        };
        presentation.present()?;
        if !self.frame_loop.is_running() {
            let weak = Rc::downgrade(presentation);
            self.frame_loop.start(move |_timestamp| {
                if let Some(presentation) = weak.upgrade() {
                    if let Err(err) = presentation.present() {
                        tracing::error!("Retained frame dropped: {err}");
                    }
                }
            });
            tracing::debug!("Retained render loop started");
        }
        Ok(())
    }

    fn destroy(&mut self) {
        let Some(presentation) = self.presentation.take() else {
            return;
        };
        self.resize_subscription = None;
        self.frame_loop.stop();
        presentation.stage.borrow_mut().clear();
        presentation.presenter.detach();
        tracing::debug!("Retained backend destroyed");
    }

    fn is_destroyed(&self) -> bool {
        self.presentation.is_none()
    }
}

#[cfg(test)]
mod tests {
    use sandbox_core::Point;

    use super::*;
    use crate::{headless::HeadlessHost, stage::DisplayObject};

    async fn setup() -> (Rc<HeadlessHost>, RetainedRenderer<HeadlessHost>) {
        let host = Rc::new(HeadlessHost::new(400.0, 200.0));
        let renderer = RetainedRenderer::initialize(Rc::clone(&host), &RendererConfig::default())
            .await
            .unwrap();
        (host, renderer)
    }

    #[tokio::test]
    async fn test_initialize_sizes_presenter() {
        let host = Rc::new(HeadlessHost::new(400.0, 200.0).with_device_pixel_ratio(2.0));
        let renderer = RetainedRenderer::initialize(Rc::clone(&host), &RendererConfig::default())
            .await
            .unwrap();
        let presenter = host.presenter(RETAINED_SURFACE_ID).unwrap();
        assert_eq!(presenter.pixel_size(), (800, 400));
        assert_eq!(renderer.css_size(), (400.0, 200.0));
        assert_eq!(renderer.clear_color(), Some(RendererConfig::default().clear_color));
    }

    #[tokio::test]
    async fn test_background_color_overrides_clear() {
        let host = Rc::new(HeadlessHost::new(400.0, 200.0));
        let mut config = RendererConfig::default();
        config.canvas.background_color = Some("#000000".to_string());
        let renderer = RetainedRenderer::initialize(host, &config).await.unwrap();
        assert_eq!(renderer.clear_color(), Some([0.0, 0.0, 0.0, 1.0]));
    }

    #[tokio::test]
    async fn test_missing_gpu_is_fatal() {
        let host = Rc::new(HeadlessHost::new(400.0, 200.0));
        host.set_gpu_available(false);
        let err = RetainedRenderer::initialize(host, &RendererConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::GpuInit(_)));
    }

    #[tokio::test]
    async fn test_render_presents_stage_every_frame() {
        let (host, mut renderer) = setup().await;
        renderer
            .stage_mut()
            .unwrap()
            .add(DisplayObject::rect(200.0, 100.0, Rgba::BLACK).at(Point::new(100.0, 50.0)));
        renderer.render().unwrap();

        let presenter = host.presenter(RETAINED_SURFACE_ID).unwrap();
        assert_eq!(presenter.frames_presented(), 1);
        let frame = presenter.last_frame().unwrap();
        assert_eq!(frame.len(), 6);
        assert!(frame.iter().all(|v| v.position[0] >= -1e-6 && v.position[1] >= -1e-6));

        renderer
            .stage_mut()
            .unwrap()
            .add(DisplayObject::circle(10.0, Rgba::WHITE));
        host.advance(16.0);
        assert_eq!(presenter.frames_presented(), 2);
        assert!(presenter.last_frame().unwrap().len() > 6);
        assert!(renderer.is_animating());
    }

    #[tokio::test]
    async fn test_container_resize_follows() {
        let (host, renderer) = setup().await;
        host.resize_container(600.0, 300.0);
        assert_eq!(renderer.css_size(), (600.0, 300.0));
        assert_eq!(host.presenter(RETAINED_SURFACE_ID).unwrap().pixel_size(), (600, 300));
    }

    #[tokio::test]
    async fn test_destroy_stops_loop_and_detaches() {
        let (host, mut renderer) = setup().await;
        renderer.render().unwrap();
        renderer.destroy();

        let presenter = host.presenter(RETAINED_SURFACE_ID).unwrap();
        assert!(!presenter.is_live());
        assert_eq!(host.frames().queued(), 0);
        assert_eq!(host.resize_observers(), 0);

        renderer.render().unwrap();
        renderer.resize(10, 10).unwrap();
        assert!(renderer.stage_mut().is_none());
        assert_eq!(presenter.frames_presented(), 1);
        renderer.destroy();
    }
}

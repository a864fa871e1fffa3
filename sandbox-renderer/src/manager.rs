//! The façade: owns the host and at most one active backend.

use std::rc::Rc;

use sandbox_core::CanvasOptions;

use crate::{
    backend::RenderBackend, host::Host, BackendType, Canvas2DRenderer, RenderResult,
    RendererConfig, RetainedRenderer, WebGlRenderer,
};

/// The active backend.
pub enum ActiveBackend<H: Host> {
    /// Multi-layer 2D canvas.
    Canvas2D(Canvas2DRenderer<H>),
    /// Raw WebGL.
    WebGl(WebGlRenderer<H>),
    /// Retained display list.
    Retained(RetainedRenderer<H>),
}

impl<H: Host + 'static> std::fmt::Debug for ActiveBackend<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Canvas2D(b) => std::fmt::Debug::fmt(b, f),
            Self::WebGl(b) => std::fmt::Debug::fmt(b, f),
            Self::Retained(b) => std::fmt::Debug::fmt(b, f),
        }
    }
}

impl<H: Host + 'static> ActiveBackend<H> {
    /// The backend behind the common contract.
    pub fn as_backend_mut(&mut self) -> &mut dyn RenderBackend {
        match self {
            Self::Canvas2D(b) => b,
            Self::WebGl(b) => b,
            Self::Retained(b) => b,
        }
    }

    /// Which backend this is.
    #[must_use]
    pub fn backend_type(&self) -> BackendType {
        match self {
            Self::Canvas2D(_) => BackendType::Canvas2D,
            Self::WebGl(_) => BackendType::WebGl,
            Self::Retained(_) => BackendType::Retained,
        }
    }
}

/// Switches between backends, tearing the old one down before building the
/// next.
pub struct CanvasManager<H: Host> {
    host: Rc<H>,
    config: RendererConfig,
    active: Option<ActiveBackend<H>>,
}

impl<H: Host + 'static> std::fmt::Debug for CanvasManager<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasManager")
            .field("config", &self.config)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl<H: Host + 'static> CanvasManager<H> {
    /// Create a façade with the default configuration and no backend.
    #[must_use]
    pub fn new(host: Rc<H>) -> Self {
        Self::with_config(host, RendererConfig::default())
    }

    /// Create a façade with `config` and no backend.
    #[must_use]
    pub fn with_config(host: Rc<H>, config: RendererConfig) -> Self {
        Self {
            host,
            config,
            active: None,
        }
    }

    /// The host.
    #[must_use]
    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    /// The configuration new backends are built with.
    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Which backend is active, if any.
    #[must_use]
    pub fn active_backend(&self) -> Option<BackendType> {
        self.active.as_ref().map(ActiveBackend::backend_type)
    }

    /// Make the 2D backend active.
    ///
    /// # Errors
    ///
    /// Returns the construction error; no backend is active afterwards.
    pub fn switch_to_2d(&mut self) -> RenderResult<()> {
        self.release();
        let backend = Canvas2DRenderer::new(Rc::clone(&self.host), self.config.canvas.clone())?;
        self.activate(ActiveBackend::Canvas2D(backend))
    }

    /// Make the WebGL backend active.
    ///
    /// # Errors
    ///
    /// Returns the construction error; no backend is active afterwards.
    pub fn switch_to_webgl(&mut self) -> RenderResult<()> {
        self.release();
        let backend = WebGlRenderer::new(Rc::clone(&self.host), &self.config)?;
        self.activate(ActiveBackend::WebGl(backend))
    }

    /// Make the retained backend active.
    ///
    /// # Errors
    ///
    /// Returns the construction error; no backend is active afterwards.
    pub async fn switch_to_retained(&mut self) -> RenderResult<()> {
        self.release();
        let backend = RetainedRenderer::initialize(Rc::clone(&self.host), &self.config).await?;
        self.activate(ActiveBackend::Retained(backend))
    }

    /// Make `kind` the active backend.
    ///
    /// # Errors
    ///
    /// Returns the construction error; no backend is active afterwards.
    pub async fn set_renderer(&mut self, kind: BackendType) -> RenderResult<()> {
        match kind {
            BackendType::Canvas2D => self.switch_to_2d(),
            BackendType::WebGl => self.switch_to_webgl(),
            BackendType::Retained => self.switch_to_retained().await,
        }
    }

    /// Resize the active backend to a fixed CSS size.
    ///
    /// # Errors
    ///
    /// Returns the backend's resize error.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        match self.active.as_mut() {
            Some(active) => active.as_backend_mut().resize(width, height),
            None => Ok(()),
        }
    }

    /// Re-measure the active backend with `options`.
    ///
    /// # Errors
    ///
    /// Returns the backend's resize error.
    pub fn resize_canvas(&mut self, options: &CanvasOptions) -> RenderResult<()> {
        match self.active.as_mut() {
            Some(active) => active.as_backend_mut().resize_canvas(options),
            None => Ok(()),
        }
    }

    /// Present the active backend.
    ///
    /// # Errors
    ///
    /// Returns the backend's render error.
    pub fn render(&mut self) -> RenderResult<()> {
        match self.active.as_mut() {
            Some(active) => active.as_backend_mut().render(),
            None => Ok(()),
        }
    }

    /// Destroy the active backend. Idempotent.
    pub fn destroy(&mut self) {
        self.release();
    }

    /// The 2D backend, when it is the active one.
    #[must_use]
    pub fn canvas2d(&self) -> Option<&Canvas2DRenderer<H>> {
        match &self.active {
            Some(ActiveBackend::Canvas2D(b)) => Some(b),
            _ => None,
        }
    }

    /// The WebGL backend, when it is the active one.
    #[must_use]
    pub fn webgl(&self) -> Option<&WebGlRenderer<H>> {
        match &self.active {
            Some(ActiveBackend::WebGl(b)) => Some(b),
            _ => None,
        }
    }

    /// The retained backend, when it is the active one.
    #[must_use]
    pub fn retained(&self) -> Option<&RetainedRenderer<H>> {
        match &self.active {
            Some(ActiveBackend::Retained(b)) => Some(b),
            _ => None,
        }
    }

    fn release(&mut self) {
        if let Some(mut previous) = self.active.take() {
            tracing::debug!("Destroying {} backend", previous.backend_type());
            previous.as_backend_mut().destroy();
        }
    }

    fn activate(&mut self, mut backend: ActiveBackend<H>) -> RenderResult<()> {
        if let Err(err) = backend.as_backend_mut().render() {
            backend.as_backend_mut().destroy();
            return Err(err);
        }
        tracing::info!("Switched to {} backend", backend.backend_type());
        self.active = Some(backend);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use sandbox_core::{DrawOptions, Point};

    use super::*;
    use crate::{
        backend::{canvas2d::MAIN_SURFACE_ID, webgl::GL_SURFACE_ID},
        headless::HeadlessHost,
        RenderError,
    };

    fn manager() -> (Rc<HeadlessHost>, CanvasManager<HeadlessHost>) {
        let host = Rc::new(HeadlessHost::new(800.0, 600.0));
        (Rc::clone(&host), CanvasManager::new(host))
    }

    #[test]
    fn test_passthroughs_without_backend_are_noops() {
        let (_host, mut m) = manager();
        assert!(m.active_backend().is_none());
        m.resize(10, 10).unwrap();
        m.render().unwrap();
        m.destroy();
        assert!(m.canvas2d().is_none());
    }

    #[test]
    fn test_switch_replaces_previous_backend() {
        let (host, mut m) = manager();
        m.switch_to_2d().unwrap();
        assert_eq!(m.active_backend(), Some(BackendType::Canvas2D));
        assert!(host.live_surfaces().contains(&MAIN_SURFACE_ID.to_string()));

        m.switch_to_webgl().unwrap();
        assert_eq!(m.active_backend(), Some(BackendType::WebGl));
        assert_eq!(host.live_surfaces(), vec![GL_SURFACE_ID.to_string()]);
        assert!(m.canvas2d().is_none());
        assert!(m.webgl().unwrap().is_animating());
        assert_eq!(host.resize_observers(), 0);
    }

    #[test]
    fn test_switch_resolves_animations_of_old_backend() {
        let (host, mut m) = manager();
        m.switch_to_2d().unwrap();
        let done = m.canvas2d().unwrap().move_line(
            Point::origin(),
            Point::new(10.0, 0.0),
            &DrawOptions::default(),
            600.0,
            50.0,
        );
        m.switch_to_webgl().unwrap();
        assert!(done.now_or_never().is_some());
        host.advance(16.0);
        assert!(host.surface(MAIN_SURFACE_ID).unwrap().lines().is_empty());
    }

    #[test]
    fn test_failed_switch_leaves_no_backend() {
        let (host, mut m) = manager();
        m.switch_to_2d().unwrap();
        host.set_webgl_available(false);
        let err = m.switch_to_webgl().unwrap_err();
        assert!(matches!(err, RenderError::ContextUnavailable(_)));
        assert!(m.active_backend().is_none());
        assert!(host.live_surfaces().is_empty());
    }

    #[test]
    fn test_resize_reaches_active_backend() {
        let (_host, mut m) = manager();
        m.switch_to_2d().unwrap();
        m.resize(320, 240).unwrap();
        assert_eq!(m.canvas2d().unwrap().css_size(), (320.0, 240.0));
    }

    #[tokio::test]
    async fn test_set_renderer_retained() {
        let (host, mut m) = manager();
        m.set_renderer(BackendType::WebGl).await.unwrap();
        m.set_renderer(BackendType::Retained).await.unwrap();
        assert_eq!(m.active_backend(), Some(BackendType::Retained));
        assert!(m.retained().is_some());
        assert!(!host.gl(GL_SURFACE_ID).unwrap().is_live());

        m.destroy();
        m.destroy();
        assert!(host.live_surfaces().is_empty());
        assert_eq!(host.frames().queued(), 0);
    }
}

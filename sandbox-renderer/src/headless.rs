//! A host without a browser.
//!
//! Surfaces record their calls, frames advance only when told to, and
//! container resizes and pointer input are triggered explicitly. Used by the
//! test suites and for offline runs of the animation scripts.

use std::{
    cell::{Cell, RefCell},
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use async_trait::async_trait;
use futures::task::noop_waker_ref;
use sandbox_core::RecordingSurface;

use crate::{
    host::{
        FrameCallback, FrameHandle, FrameScheduler, GlContext, Host, PointerInput,
        StagePresenter, Subscription,
    },
    stage::ColorVertex,
    RenderError, RenderResult,
};

/// A frame scheduler advanced by hand.
#[derive(Default)]
pub struct ManualScheduler {
    now: Cell<f64>,
    next_id: Cell<u64>,
    queue: RefCell<Vec<(FrameHandle, FrameCallback)>>,
}

impl ManualScheduler {
    /// Create a scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `ms` and run one frame.
    ///
    /// Only callbacks queued before the call run; requests made while the
    /// frame runs wait for the next one.
    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
        let timestamp = self.now.get();
        let due = std::mem::take(&mut *self.queue.borrow_mut());
        for (_, callback) in due {
            callback(timestamp);
        }
    }

    /// Run frames every `frame_ms` until the clock reaches `time`.
    pub fn advance_to(&self, time: f64, frame_ms: f64) {
        while self.now.get() + frame_ms <= time {
            self.advance(frame_ms);
        }
        let rest = time - self.now.get();
        if rest > 0.0 {
            self.advance(rest);
        }
    }

    /// Number of callbacks waiting for the next frame.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Poll `future`, running a frame every `frame_ms` between polls, until it
    /// resolves or `max_frames` frames have run.
    pub fn run_until_complete<F>(&self, future: &mut F, frame_ms: f64, max_frames: usize)
        -> Option<F::Output>
    where
        F: Future + Unpin,
    {
        let mut cx = Context::from_waker(noop_waker_ref());
        for _ in 0..=max_frames {
            if let Poll::Ready(output) = Pin::new(&mut *future).poll(&mut cx) {
                return Some(output);
            }
            self.advance(frame_ms);
        }
        None
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let handle = FrameHandle(id);
        self.queue.borrow_mut().push((handle, callback));
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        // Take the callback out before dropping it; its destructor may
        // request or cancel frames.
        let removed = {
            let mut queue = self.queue.borrow_mut();
            queue
                .iter()
                .position(|(h, _)| *h == handle)
                .map(|i| queue.remove(i))
        };
        drop(removed);
    }

    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// One call made on a [`RecordingGl`].
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    /// Drawing buffer resized.
    SetPixelSize(u32, u32),
    /// Display size changed.
    SetCssSize(f64, f64),
    /// Viewport set.
    Viewport(u32, u32),
    /// Clear color set.
    ClearColor([f32; 4]),
    /// Depth testing enabled.
    EnableDepthTest,
    /// Buffers cleared.
    Clear,
    /// Program compiled (successfully or not).
    CompileProgram,
    /// Program made current.
    UseProgram(u32),
    /// Buffer created with this many floats.
    CreateBuffer(usize),
    /// Attribute bound.
    BindAttribute(String, i32),
    /// Matrix uniform set.
    SetUniformMat4(String, [f32; 16]),
    /// Triangles drawn.
    DrawTriangles(usize),
    /// Program deleted.
    DeleteProgram(u32),
    /// Buffer deleted.
    DeleteBuffer(u32),
    /// Surface detached.
    Detach,
}

#[derive(Debug, Default)]
struct GlLog {
    calls: Vec<GlCall>,
    next_handle: u32,
    detached: bool,
}

/// A [`GlContext`] that records calls.
#[derive(Debug, Clone)]
pub struct RecordingGl {
    id: Rc<str>,
    fail_compile: bool,
    log: Rc<RefCell<GlLog>>,
}

impl RecordingGl {
    /// Create a context; `fail_compile` makes every program fail to link.
    #[must_use]
    pub fn new(id: &str, fail_compile: bool) -> Self {
        Self {
            id: Rc::from(id),
            fail_compile,
            log: Rc::default(),
        }
    }

    /// Surface identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// All recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<GlCall> {
        self.log.borrow().calls.clone()
    }

    /// Number of draw calls issued.
    #[must_use]
    pub fn draw_calls(&self) -> usize {
        self.log
            .borrow()
            .calls
            .iter()
            .filter(|c| matches!(c, GlCall::DrawTriangles(_)))
            .count()
    }

    /// Last value set for the uniform `name`.
    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<[f32; 16]> {
        self.log.borrow().calls.iter().rev().find_map(|c| match c {
            GlCall::SetUniformMat4(n, value) if n == name => Some(*value),
            _ => None,
        })
    }

    /// Whether the surface is still in the document.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.log.borrow().detached
    }

    fn record(&self, call: GlCall) {
        self.log.borrow_mut().calls.push(call);
    }

    fn next_handle(&self) -> u32 {
        let mut log = self.log.borrow_mut();
        log.next_handle += 1;
        log.next_handle
    }
}

impl GlContext for RecordingGl {
    type Program = u32;
    type Buffer = u32;

    fn set_pixel_size(&self, width: u32, height: u32) {
        self.record(GlCall::SetPixelSize(width, height));
    }

    fn set_css_size(&self, width: f64, height: f64) {
        self.record(GlCall::SetCssSize(width, height));
    }

    fn viewport(&self, width: u32, height: u32) {
        self.record(GlCall::Viewport(width, height));
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.record(GlCall::ClearColor(rgba));
    }

    fn enable_depth_test(&self) {
        self.record(GlCall::EnableDepthTest);
    }

    fn clear(&self) {
        self.record(GlCall::Clear);
    }

    fn compile_program(&self, _vertex_src: &str, _fragment_src: &str) -> Result<u32, String> {
        self.record(GlCall::CompileProgram);
        if self.fail_compile {
            return Err("ERROR: 0:1: syntax error".to_string());
        }
        Ok(self.next_handle())
    }

    fn use_program(&self, program: &u32) {
        self.record(GlCall::UseProgram(*program));
    }

    fn create_buffer(&self, data: &[f32]) -> Result<u32, String> {
        self.record(GlCall::CreateBuffer(data.len()));
        Ok(self.next_handle())
    }

    fn bind_attribute(&self, _program: &u32, _buffer: &u32, name: &str, components: i32) {
        self.record(GlCall::BindAttribute(name.to_string(), components));
    }

    fn set_uniform_mat4(&self, _program: &u32, name: &str, value: &[f32; 16]) {
        self.record(GlCall::SetUniformMat4(name.to_string(), *value));
    }

    fn draw_triangles(&self, vertex_count: usize) {
        self.record(GlCall::DrawTriangles(vertex_count));
    }

    fn delete_program(&self, program: u32) {
        self.record(GlCall::DeleteProgram(program));
    }

    fn delete_buffer(&self, buffer: u32) {
        self.record(GlCall::DeleteBuffer(buffer));
    }

    fn detach(&self) {
        let mut log = self.log.borrow_mut();
        log.detached = true;
        log.calls.push(GlCall::Detach);
    }
}

#[derive(Debug, Default)]
struct PresenterLog {
    frames: Vec<(Vec<ColorVertex>, [f32; 4])>,
    pixel_size: (u32, u32),
    detached: bool,
}

/// A [`StagePresenter`] that keeps every presented frame.
#[derive(Debug, Clone)]
pub struct RecordingPresenter {
    id: Rc<str>,
    log: Rc<RefCell<PresenterLog>>,
}

impl RecordingPresenter {
    /// Create a presenter of the given size.
    #[must_use]
    pub fn new(id: &str, pixel_width: u32, pixel_height: u32) -> Self {
        let log = PresenterLog {
            pixel_size: (pixel_width, pixel_height),
            ..PresenterLog::default()
        };
        Self {
            id: Rc::from(id),
            log: Rc::new(RefCell::new(log)),
        }
    }

    /// Surface identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of frames presented.
    #[must_use]
    pub fn frames_presented(&self) -> usize {
        self.log.borrow().frames.len()
    }

    /// Vertices of the most recent frame.
    #[must_use]
    pub fn last_frame(&self) -> Option<Vec<ColorVertex>> {
        self.log.borrow().frames.last().map(|(v, _)| v.clone())
    }

    /// Clear color of the most recent frame.
    #[must_use]
    pub fn last_clear(&self) -> Option<[f32; 4]> {
        self.log.borrow().frames.last().map(|(_, c)| *c)
    }

    /// Current surface size in device pixels.
    #[must_use]
    pub fn pixel_size(&self) -> (u32, u32) {
        self.log.borrow().pixel_size
    }

    /// Whether the surface is still in the document.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.log.borrow().detached
    }
}

impl StagePresenter for RecordingPresenter {
    fn resize(&self, pixel_width: u32, pixel_height: u32, _css_width: f64, _css_height: f64) {
        self.log.borrow_mut().pixel_size = (pixel_width, pixel_height);
    }

    fn present(&self, vertices: &[ColorVertex], clear: [f32; 4]) -> Result<(), String> {
        let mut log = self.log.borrow_mut();
        if log.detached {
            return Err("presenter detached".to_string());
        }
        log.frames.push((vertices.to_vec(), clear));
        Ok(())
    }

    fn detach(&self) {
        self.log.borrow_mut().detached = true;
    }
}

type ResizeCallbacks = Rc<RefCell<Vec<(u64, Rc<dyn Fn()>)>>>;
type PointerCallbacks = Rc<RefCell<Vec<(u64, String, Rc<dyn Fn(PointerInput)>)>>>;

/// A [`Host`] backed by recording surfaces and a [`ManualScheduler`].
pub struct HeadlessHost {
    container: Cell<(f64, f64)>,
    dpr: Cell<f64>,
    scheduler: Rc<ManualScheduler>,
    surfaces: RefCell<Vec<RecordingSurface>>,
    gl_surfaces: RefCell<Vec<RecordingGl>>,
    presenters: RefCell<Vec<RecordingPresenter>>,
    resize_callbacks: ResizeCallbacks,
    pointer_callbacks: PointerCallbacks,
    next_subscription: Cell<u64>,
    fail_shaders: Cell<bool>,
    webgl_available: Cell<bool>,
    gpu_available: Cell<bool>,
}

impl HeadlessHost {
    /// Create a host whose container measures `width` x `height` CSS pixels.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            container: Cell::new((width, height)),
            dpr: Cell::new(1.0),
            scheduler: Rc::new(ManualScheduler::new()),
            surfaces: RefCell::default(),
            gl_surfaces: RefCell::default(),
            presenters: RefCell::default(),
            resize_callbacks: Rc::default(),
            pointer_callbacks: Rc::default(),
            next_subscription: Cell::new(0),
            fail_shaders: Cell::new(false),
            webgl_available: Cell::new(true),
            gpu_available: Cell::new(true),
        }
    }

    /// Set the device pixel ratio.
    #[must_use]
    pub fn with_device_pixel_ratio(self, dpr: f64) -> Self {
        self.dpr.set(dpr);
        self
    }

    /// The manual scheduler driving every backend on this host.
    #[must_use]
    pub fn frames(&self) -> Rc<ManualScheduler> {
        Rc::clone(&self.scheduler)
    }

    /// Run one frame `ms` after the previous one.
    pub fn advance(&self, ms: f64) {
        self.scheduler.advance(ms);
    }

    /// Change the container size and notify resize observers.
    pub fn resize_container(&self, width: f64, height: f64) {
        self.container.set((width, height));
        let callbacks: Vec<Rc<dyn Fn()>> = self
            .resize_callbacks
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    /// Deliver pointer input to observers of `surface_id`.
    pub fn pointer(&self, surface_id: &str, input: PointerInput) {
        let callbacks: Vec<Rc<dyn Fn(PointerInput)>> = self
            .pointer_callbacks
            .borrow()
            .iter()
            .filter(|(_, id, _)| id == surface_id)
            .map(|(_, _, cb)| Rc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(input);
        }
    }

    /// Number of connected resize observers.
    #[must_use]
    pub fn resize_observers(&self) -> usize {
        self.resize_callbacks.borrow().len()
    }

    /// Make subsequently created GL contexts fail shader compilation.
    pub fn fail_shader_compilation(&self, fail: bool) {
        self.fail_shaders.set(fail);
    }

    /// Pretend WebGL is (un)supported.
    pub fn set_webgl_available(&self, available: bool) {
        self.webgl_available.set(available);
    }

    /// Pretend a GPU adapter is (un)available.
    pub fn set_gpu_available(&self, available: bool) {
        self.gpu_available.set(available);
    }

    /// The most recently created 2D surface with `id`.
    #[must_use]
    pub fn surface(&self, id: &str) -> Option<RecordingSurface> {
        self.surfaces
            .borrow()
            .iter()
            .rev()
            .find(|s| sandbox_core::Surface::id(*s) == id)
            .cloned()
    }

    /// The most recently created GL context with `id`.
    #[must_use]
    pub fn gl(&self, id: &str) -> Option<RecordingGl> {
        self.gl_surfaces
            .borrow()
            .iter()
            .rev()
            .find(|g| g.id() == id)
            .cloned()
    }

    /// The most recently created presenter with `id`.
    #[must_use]
    pub fn presenter(&self, id: &str) -> Option<RecordingPresenter> {
        self.presenters
            .borrow()
            .iter()
            .rev()
            .find(|p| p.id() == id)
            .cloned()
    }

    /// Ids of every surface currently attached to the container.
    #[must_use]
    pub fn live_surfaces(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .surfaces
            .borrow()
            .iter()
            .filter(|s| s.is_live())
            .map(|s| sandbox_core::Surface::id(s).to_string())
            .collect();
        ids.extend(
            self.gl_surfaces
                .borrow()
                .iter()
                .filter(|g| g.is_live())
                .map(|g| g.id().to_string()),
        );
        ids.extend(
            self.presenters
                .borrow()
                .iter()
                .filter(|p| p.is_live())
                .map(|p| p.id().to_string()),
        );
        ids
    }

    fn subscription_id(&self) -> u64 {
        let id = self.next_subscription.get() + 1;
        self.next_subscription.set(id);
        id
    }
}

impl std::fmt::Debug for HeadlessHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessHost")
            .field("container", &self.container.get())
            .field("dpr", &self.dpr.get())
            .field("live_surfaces", &self.live_surfaces())
            .finish_non_exhaustive()
    }
}

#[async_trait(?Send)]
impl Host for HeadlessHost {
    type Surface = RecordingSurface;
    type Gl = RecordingGl;
    type Presenter = RecordingPresenter;

    fn container_size(&self) -> (f64, f64) {
        self.container.get()
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.dpr.get()
    }

    fn create_surface(&self, id: &str, attach: bool) -> RenderResult<RecordingSurface> {
        let surface = RecordingSurface::new(id, attach);
        self.surfaces.borrow_mut().push(surface.clone());
        Ok(surface)
    }

    fn create_gl_surface(&self, id: &str, _antialias: bool) -> RenderResult<RecordingGl> {
        if !self.webgl_available.get() {
            return Err(RenderError::ContextUnavailable(
                "WebGL is not supported".to_string(),
            ));
        }
        let gl = RecordingGl::new(id, self.fail_shaders.get());
        self.gl_surfaces.borrow_mut().push(gl.clone());
        Ok(gl)
    }

    async fn create_presenter(
        &self,
        id: &str,
        pixel_width: u32,
        pixel_height: u32,
    ) -> RenderResult<RecordingPresenter> {
        if !self.gpu_available.get() {
            return Err(RenderError::GpuInit("No suitable GPU adapter found".to_string()));
        }
        let presenter = RecordingPresenter::new(id, pixel_width, pixel_height);
        self.presenters.borrow_mut().push(presenter.clone());
        Ok(presenter)
    }

    fn scheduler(&self) -> Rc<dyn FrameScheduler> {
        self.scheduler.clone()
    }

    fn observe_resize(&self, callback: Box<dyn Fn()>) -> Subscription {
        let id = self.subscription_id();
        self.resize_callbacks
            .borrow_mut()
            .push((id, Rc::from(callback)));
        let callbacks = Rc::downgrade(&self.resize_callbacks);
        Subscription::new(move || {
            if let Some(callbacks) = callbacks.upgrade() {
                callbacks.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }

    fn observe_pointer(
        &self,
        surface_id: &str,
        callback: Box<dyn Fn(PointerInput)>,
    ) -> Subscription {
        let id = self.subscription_id();
        self.pointer_callbacks
            .borrow_mut()
            .push((id, surface_id.to_string(), Rc::from(callback)));
        let callbacks = Rc::downgrade(&self.pointer_callbacks);
        Subscription::new(move || {
            if let Some(callbacks) = callbacks.upgrade() {
                callbacks.borrow_mut().retain(|(i, _, _)| *i != id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_runs_only_frames_queued_before_tick() {
        let scheduler = Rc::new(ManualScheduler::new());
        let hits = Rc::new(Cell::new(0));
        let (s, h) = (Rc::clone(&scheduler), Rc::clone(&hits));
        scheduler.request_frame(Box::new(move |_| {
            h.set(h.get() + 1);
            let h2 = Rc::clone(&h);
            s.request_frame(Box::new(move |_| h2.set(h2.get() + 1)));
        }));
        scheduler.advance(16.0);
        assert_eq!(hits.get(), 1);
        assert_eq!(scheduler.queued(), 1);
        scheduler.advance(16.0);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn advance_to_lands_on_exact_time() {
        let scheduler = ManualScheduler::new();
        scheduler.advance_to(100.0, 16.0);
        assert!((scheduler.now() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn resize_subscription_disconnects_on_drop() {
        let host = HeadlessHost::new(100.0, 100.0);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = host.observe_resize(Box::new(move || h.set(h.get() + 1)));
        host.resize_container(200.0, 200.0);
        drop(sub);
        host.resize_container(300.0, 300.0);
        assert_eq!(hits.get(), 1);
        assert_eq!(host.resize_observers(), 0);
    }

    #[test]
    fn webgl_can_be_made_unavailable() {
        let host = HeadlessHost::new(100.0, 100.0);
        host.set_webgl_available(false);
        assert!(matches!(
            host.create_gl_surface("gl", true),
            Err(RenderError::ContextUnavailable(_))
        ));
    }

    #[test]
    fn run_until_complete_drives_frames() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (tx, mut done) = crate::runner::Completion::channel();
        scheduler.request_frame(Box::new(move |_| tx.complete()));
        assert!(scheduler.run_until_complete(&mut done, 16.0, 5).is_some());
    }
}

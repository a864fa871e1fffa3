//! Multi-layer 2D canvas backend.
//!
//! Three same-sized surfaces share the centre-origin transform:
//!
//! ```text
//! ┌───────────────────────┐
//! │ animation (attached)  │  transient, cleared every frame
//! ├───────────────────────┤
//! │ main (attached)       │  persistent, committed content
//! └───────────────────────┘
//!   offscreen (detached)     scratch buffer for text reveal
//! ```
//!
//! Drawing is immediate. Animations advance on frame callbacks and commit
//! their final geometry to the main layer.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use sandbox_core::{
    clear_canvas, draw_arc, draw_line, draw_point, draw_rect, draw_text, is_instant, CanvasOptions,
    DrawOptions, GrowLine, GrowStep, Line, MoveLine, Point, RotateLine, RotateLines, Surface,
    Timeline, Transform2d, Typewriter,
};

use super::{device_pixels, effective_dpr, RenderBackend};
use crate::{
    host::{Host, Subscription},
    runner::{Completion, FrameDriver, FrameLoop, FrameTask},
    BackendType, RenderResult,
};

/// Id of the persistent surface.
pub const MAIN_SURFACE_ID: &str = "sandbox-main";
/// Id of the scratch surface.
pub const OFFSCREEN_SURFACE_ID: &str = "sandbox-offscreen";
/// Id of the per-frame surface.
pub const ANIMATION_SURFACE_ID: &str = "sandbox-animation";

/// The three layers of the backend.
#[derive(Debug)]
pub struct Layers<S> {
    /// Persistent content.
    pub main: S,
    /// Scratch buffer, never attached.
    pub offscreen: S,
    /// Transient content stacked above main.
    pub animation: S,
}

impl<S> Layers<S> {
    fn all(&self) -> [&S; 3] {
        [&self.main, &self.offscreen, &self.animation]
    }
}

struct Shared<H: Host> {
    host: Rc<H>,
    options: RefCell<CanvasOptions>,
    layers: RefCell<Option<Rc<Layers<H::Surface>>>>,
    driver: FrameDriver,
    free_loop: FrameLoop,
    resize_subscription: RefCell<Option<Subscription>>,
    css_size: Cell<(f64, f64)>,
}

/// The 2D backend. Clones are handles to the same backend.
pub struct Canvas2DRenderer<H: Host> {
    shared: Rc<Shared<H>>,
}

impl<H: Host> Clone for Canvas2DRenderer<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<H: Host> std::fmt::Debug for Canvas2DRenderer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas2DRenderer")
            .field("css_size", &self.shared.css_size.get())
            .field("destroyed", &self.shared.layers.borrow().is_none())
            .field("pending_frames", &self.shared.driver.pending())
            .finish()
    }
}

impl<H: Host + 'static> Canvas2DRenderer<H> {
    /// Create the three surfaces in `host`, size them and, when
    /// `options.responsive` is set, follow container resizes.
    ///
    /// # Errors
    ///
    /// Returns an error if a surface cannot be created; surfaces created so
    /// far are detached again.
    pub fn new(host: Rc<H>, options: CanvasOptions) -> RenderResult<Self> {
        let main = host.create_surface(MAIN_SURFACE_ID, true)?;
        let rest = host
            .create_surface(OFFSCREEN_SURFACE_ID, false)
            .and_then(|offscreen| {
                host.create_surface(ANIMATION_SURFACE_ID, true)
                    .map(|animation| (offscreen, animation))
            });
        let (offscreen, animation) = match rest {
            Ok(pair) => pair,
            Err(err) => {
                main.detach();
                return Err(err);
            }
        };

        let driver = FrameDriver::new(host.scheduler());
        let shared = Rc::new(Shared {
            free_loop: FrameLoop::new(driver.clone()),
            driver,
            options: RefCell::new(options.clone()),
            layers: RefCell::new(Some(Rc::new(Layers {
                main,
                offscreen,
                animation,
            }))),
            resize_subscription: RefCell::new(None),
            css_size: Cell::new((0.0, 0.0)),
            host,
        });
        let renderer = Self { shared };
        renderer.apply_size(&options);
        if options.responsive {
            renderer.observe_container();
        }
        tracing::debug!("Canvas2D backend initialized");
        Ok(renderer)
    }

    fn observe_container(&self) {
        let weak = Rc::downgrade(&self.shared);
        let subscription = self.shared.host.observe_resize(Box::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let renderer = Canvas2DRenderer { shared };
            let options = renderer.shared.options.borrow().clone();
            tracing::debug!("Container resized, re-measuring 2D surfaces");
            renderer.apply_size(&options);
        }));
        *self.shared.resize_subscription.borrow_mut() = Some(subscription);
    }

    fn layers(&self, operation: &str) -> Option<Rc<Layers<H::Surface>>> {
        let layers = self.shared.layers.borrow().clone();
        if layers.is_none() {
            tracing::warn!("Canvas2D {operation} called after destroy, ignoring");
        }
        layers
    }

    /// Resize every layer, keeping the centre-origin transform and the main
    /// layer's pixels re-centred in the new size.
    fn apply_size(&self, options: &CanvasOptions) {
        let Some(layers) = self.layers("resize") else {
            return;
        };
        *self.shared.options.borrow_mut() = options.clone();

        let host = &self.shared.host;
        let (css_width, css_height) = options.resolve_size(host.container_size());
        let dpr = effective_dpr(host.device_pixel_ratio());
        let width = device_pixels(css_width, dpr);
        let height = device_pixels(css_height, dpr);

        let old_width = layers.main.pixel_width();
        let old_height = layers.main.pixel_height();
        let preserved = layers.main.snapshot().filter(|s| !s.is_empty());

        for surface in layers.all() {
            surface.set_pixel_size(width, height);
            surface.set_css_size(css_width, css_height);
            surface.set_transform(Transform2d::center_origin(width, height, dpr));
        }
        if let Some(color) = &options.background_color {
            layers.main.set_background(color);
        }
        if let Some(snapshot) = preserved {
            let dx = (f64::from(width) - f64::from(old_width)) / 2.0;
            let dy = (f64::from(height) - f64::from(old_height)) / 2.0;
            layers.main.restore_snapshot(&snapshot, dx, dy);
        }

        self.shared.css_size.set((css_width, css_height));
        tracing::debug!(
            "Canvas2D resized to {css_width}x{css_height} ({width}x{height} device pixels)"
        );
    }

    fn spawn<F>(&self, layers: &Rc<Layers<H::Surface>>, step: F, first_frame_now: bool) -> Completion
    where
        F: FnMut(&Layers<H::Surface>, f64) -> bool + 'static,
    {
        let (done, completion) = Completion::channel();
        let task = FrameTask::new(self.shared.driver.clone(), Rc::downgrade(layers), step, done);
        if first_frame_now {
            task.start_now();
        } else {
            task.schedule();
        }
        completion
    }

    // ===== Immediate drawing =====

    /// Draw a filled point on the main layer.
    pub fn draw_point(&self, point: Point, options: &DrawOptions) {
        if let Some(layers) = self.layers("draw_point") {
            draw_point(&layers.main, point, options);
        }
    }

    /// Draw a line on the main layer.
    pub fn draw_line(&self, start: Point, end: Point, options: &DrawOptions) {
        if let Some(layers) = self.layers("draw_line") {
            draw_line(&layers.main, start, end, options);
        }
    }

    /// Draw an arc on the main layer.
    pub fn draw_arc(
        &self,
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        options: &DrawOptions,
    ) {
        if let Some(layers) = self.layers("draw_arc") {
            draw_arc(&layers.main, center, radius, start_angle, end_angle, options);
        }
    }

    /// Draw a rectangle on the main layer.
    pub fn draw_rect(&self, corner: Point, width: f64, height: f64, options: &DrawOptions) {
        if let Some(layers) = self.layers("draw_rect") {
            draw_rect(&layers.main, corner, width, height, options);
        }
    }

    /// Clear the main layer.
    pub fn clear(&self) {
        if let Some(layers) = self.layers("clear") {
            clear_canvas(&layers.main, None);
        }
    }

    // ===== Animations =====

    /// Grow a line out of its midpoint, then commit it to the main layer.
    ///
    /// The first frame is painted before this returns. A non-positive
    /// duration draws the line directly.
    pub fn draw_animate_line(
        &self,
        start: Point,
        end: Point,
        options: &DrawOptions,
        duration_ms: f64,
    ) -> Completion {
        let Some(layers) = self.layers("draw_animate_line") else {
            return Completion::ready();
        };
        if is_instant(duration_ms) {
            draw_line(&layers.main, start, end, options);
            return Completion::ready();
        }

        let options = options.clone();
        let mut grow = GrowLine::new(Line::new(start, end), duration_ms);
        self.spawn(
            &layers,
            move |layers: &Layers<H::Surface>, _timestamp: f64| match grow.tick() {
                GrowStep::Partial(partial) => {
                    tracing::trace!("grow line frame {partial:?}");
                    clear_canvas(&layers.animation, None);
                    draw_line(&layers.animation, partial.start, partial.end, &options);
                    false
                }
                GrowStep::Complete(full) => {
                    draw_line(&layers.main, full.start, full.end, &options);
                    clear_canvas(&layers.animation, None);
                    true
                }
            },
            true,
        )
    }

    /// Translate a line vertically by `gap`, then commit it to the main layer.
    pub fn move_line(
        &self,
        start: Point,
        end: Point,
        options: &DrawOptions,
        duration_ms: f64,
        gap: f64,
    ) -> Completion {
        let Some(layers) = self.layers("move_line") else {
            return Completion::ready();
        };
        let mut motion = MoveLine::new(
            Line::new(start, end),
            gap,
            Timeline::new(self.shared.driver.now(), duration_ms),
        );
        if is_instant(duration_ms) {
            let last = motion.final_line();
            draw_line(&layers.main, last.start, last.end, options);
            return Completion::ready();
        }

        let options = options.clone();
        self.spawn(
            &layers,
            move |layers: &Layers<H::Surface>, timestamp: f64| {
                let frame = motion.tick(timestamp);
                let dirty = frame.clear;
                layers
                    .animation
                    .clear_rect(dirty.x, dirty.y, dirty.width, dirty.height);
                if frame.finished {
                    let last = motion.final_line();
                    draw_line(&layers.main, last.start, last.end, &options);
                    clear_canvas(&layers.animation, None);
                    return true;
                }
                draw_line(&layers.animation, frame.line.start, frame.line.end, &options);
                false
            },
            false,
        )
    }

    /// Move each line by the gap at the same index (missing gaps are 0).
    /// Resolves once every line has committed.
    pub fn move_lines(
        &self,
        lines: &[Line],
        options: &DrawOptions,
        duration_ms: f64,
        gaps: &[f64],
    ) -> Completion {
        Completion::all(lines.iter().enumerate().map(|(i, line)| {
            let gap = gaps.get(i).copied().unwrap_or(0.0);
            self.move_line(line.start, line.end, options, duration_ms, gap)
        }))
    }

    /// Rotate a line by `angle_degrees` about its pivot.
    pub fn rotate_line(
        &self,
        line: RotateLine,
        options: &DrawOptions,
        duration_ms: f64,
        angle_degrees: f64,
    ) -> Completion {
        self.rotate_lines(&[line], options, duration_ms, angle_degrees)
    }

    /// Rotate several lines together, each about its own pivot.
    pub fn rotate_lines(
        &self,
        lines: &[RotateLine],
        options: &DrawOptions,
        duration_ms: f64,
        angle_degrees: f64,
    ) -> Completion {
        let Some(layers) = self.layers("rotate_lines") else {
            return Completion::ready();
        };
        let rotation = RotateLines::new(
            lines.to_vec(),
            angle_degrees,
            Timeline::new(self.shared.driver.now(), duration_ms),
        );
        if is_instant(duration_ms) {
            for line in rotation.final_lines() {
                draw_line(&layers.main, line.start, line.end, options);
            }
            return Completion::ready();
        }

        let options = options.clone();
        self.spawn(
            &layers,
            move |layers: &Layers<H::Surface>, timestamp: f64| {
                let frame = rotation.tick(timestamp);
                clear_canvas(&layers.animation, None);
                let (target, lines) = if frame.finished {
                    (&layers.main, rotation.final_lines())
                } else {
                    (&layers.animation, frame.lines)
                };
                for line in lines {
                    draw_line(target, line.start, line.end, &options);
                }
                frame.finished
            },
            false,
        )
    }

    /// Reveal `text` one character per `interval_ms` through the offscreen
    /// layer. Each step replaces the main layer's content with the offscreen
    /// pixels.
    pub fn draw_text(
        &self,
        position: Point,
        text: &str,
        interval_ms: f64,
        options: &DrawOptions,
    ) -> Completion {
        let Some(layers) = self.layers("draw_text") else {
            return Completion::ready();
        };
        let mut writer = Typewriter::new(text, position);
        if writer.is_finished() {
            return Completion::ready();
        }

        let options = options.clone();
        let interval = interval_ms.max(0.0);
        let mut last_step = self.shared.driver.now();
        self.spawn(
            &layers,
            move |layers: &Layers<H::Surface>, timestamp: f64| {
                if timestamp - last_step < interval {
                    return false;
                }
                last_step = timestamp;
                let Some(prefix) = writer.tick() else {
                    return true;
                };
                clear_canvas(&layers.offscreen, None);
                draw_text(&layers.offscreen, position, prefix, &options);
                clear_canvas(&layers.main, None);
                layers.main.composite_from(&layers.offscreen);
                writer.is_finished()
            },
            false,
        )
    }

    /// Call `callback` with the frame timestamp every frame until
    /// [`stop_animation`](Self::stop_animation) or destroy.
    pub fn animate(&self, callback: impl FnMut(f64) + 'static) {
        if self.layers("animate").is_some() {
            self.shared.free_loop.start(callback);
        }
    }

    /// Stop the loop started by [`animate`](Self::animate).
    pub fn stop_animation(&self) {
        self.shared.free_loop.stop();
    }

    // ===== Introspection =====

    /// The persistent layer.
    #[must_use]
    pub fn main_surface(&self) -> Option<H::Surface> {
        self.shared.layers.borrow().as_ref().map(|l| l.main.clone())
    }

    /// The scratch layer.
    #[must_use]
    pub fn offscreen_surface(&self) -> Option<H::Surface> {
        self.shared
            .layers
            .borrow()
            .as_ref()
            .map(|l| l.offscreen.clone())
    }

    /// The transient layer.
    #[must_use]
    pub fn animation_surface(&self) -> Option<H::Surface> {
        self.shared
            .layers
            .borrow()
            .as_ref()
            .map(|l| l.animation.clone())
    }

    /// Current CSS size.
    #[must_use]
    pub fn css_size(&self) -> (f64, f64) {
        self.shared.css_size.get()
    }

    /// Frame callbacks waiting to run.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.shared.driver.pending()
    }

    /// Whether the container is being observed.
    #[must_use]
    pub fn is_responsive(&self) -> bool {
        self.shared.resize_subscription.borrow().is_some()
    }

    fn teardown(&self) {
        let Some(layers) = self.shared.layers.borrow_mut().take() else {
            return;
        };
        drop(self.shared.resize_subscription.borrow_mut().take());
        self.shared.free_loop.stop();
        self.shared.driver.cancel_all();
        for surface in layers.all() {
            clear_canvas(surface, None);
            surface.detach();
        }
        tracing::debug!("Canvas2D backend destroyed");
    }
}

impl<H: Host + 'static> RenderBackend for Canvas2DRenderer<H> {
    fn backend_type(&self) -> BackendType {
        BackendType::Canvas2D
    }

    fn resize_canvas(&mut self, options: &CanvasOptions) -> RenderResult<()> {
        self.apply_size(options);
        Ok(())
    }

    fn render(&mut self) -> RenderResult<()> {
        if self.layers("render").is_some() {
            tracing::trace!("Canvas2D is immediate-mode, nothing to present");
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.teardown();
    }

    fn is_destroyed(&self) -> bool {
        self.shared.layers.borrow().is_none()
    }
}

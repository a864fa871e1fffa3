//! The browser [`Host`]: canvas elements inside a container, frames from
//! `requestAnimationFrame`, and DOM observers.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::{Rc, Weak},
};

use async_trait::async_trait;
use sandbox_renderer::{
    host::{FrameCallback, FrameHandle},
    FrameScheduler, Host, PointerInput, RenderError, RenderResult, Subscription,
};
use wasm_bindgen::{convert::FromWasmAbi, prelude::*};
use web_sys::{
    CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement, MouseEvent,
    ResizeObserver, WebGlContextAttributes, WebGlRenderingContext, WheelEvent, Window,
};

use crate::{
    canvas::CanvasSurface,
    error::{AppError, AppResult},
    gpu::GpuPresenter,
    webgl::WebGlSurface,
};

struct PendingFrame {
    raf_id: i32,
    _closure: Closure<dyn FnMut(f64)>,
}

#[derive(Default)]
struct FrameQueue {
    pending: RefCell<HashMap<u64, PendingFrame>>,
    // The closure of the frame currently running; it is released on the next
    // frame since a closure cannot be dropped while it executes.
    fired: RefCell<Option<PendingFrame>>,
    next_id: Cell<u64>,
}

/// [`FrameScheduler`] over `requestAnimationFrame`.
pub struct AnimationFrames {
    window: Window,
    queue: Rc<FrameQueue>,
}

impl AnimationFrames {
    /// Schedule frames on `window`.
    #[must_use]
    pub fn new(window: Window) -> Self {
        Self {
            window,
            queue: Rc::default(),
        }
    }
}

impl std::fmt::Debug for AnimationFrames {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationFrames")
            .field("pending", &self.queue.pending.borrow().len())
            .finish()
    }
}

impl FrameScheduler for AnimationFrames {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let id = self.queue.next_id.get() + 1;
        self.queue.next_id.set(id);
        let handle = FrameHandle(id);

        let weak: Weak<FrameQueue> = Rc::downgrade(&self.queue);
        let mut callback = Some(callback);
        let closure = Closure::<dyn FnMut(f64)>::new(move |timestamp: f64| {
            if let Some(queue) = weak.upgrade() {
                let running = queue.pending.borrow_mut().remove(&id);
                *queue.fired.borrow_mut() = running;
            }
            if let Some(callback) = callback.take() {
                callback(timestamp);
            }
        });

        match self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
        {
            Ok(raf_id) => {
                self.queue.pending.borrow_mut().insert(
                    id,
                    PendingFrame {
                        raf_id,
                        _closure: closure,
                    },
                );
            }
            Err(err) => tracing::error!("requestAnimationFrame failed: {err:?}"),
        }
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let removed = self.queue.pending.borrow_mut().remove(&handle.0);
        if let Some(frame) = removed {
            let _ = self.window.cancel_animation_frame(frame.raf_id);
        }
    }

    fn now(&self) -> f64 {
        self.window.performance().map_or(0.0, |p| p.now())
    }
}

/// Take `canvas` back out of the page when wiring it up failed.
fn remove_on_error<T>(canvas: &HtmlCanvasElement, result: RenderResult<T>) -> RenderResult<T> {
    if let Err(err) = &result {
        tracing::debug!("Removing canvas #{} after failed setup: {err}", canvas.id());
        canvas.remove();
    }
    result
}

/// The page environment: a container element inside `window`.
pub struct WebHost {
    window: Window,
    document: Document,
    container: HtmlElement,
    frames: Rc<AnimationFrames>,
}

impl std::fmt::Debug for WebHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebHost")
            .field("container", &self.container.id())
            .field("size", &self.container_size())
            .finish_non_exhaustive()
    }
}

impl WebHost {
    /// Attach to the element with id `container_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no window, document or container.
    pub fn new(container_id: &str) -> AppResult<Self> {
        let window = web_sys::window().ok_or_else(|| AppError::Missing("window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| AppError::Missing("document".into()))?;
        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| AppError::Missing(format!("Container element '{container_id}'")))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| AppError::Missing(format!("HTML element '{container_id}'")))?;
        let style = container.style();
        if style.get_property_value("position").unwrap_or_default().is_empty() {
            style
                .set_property("position", "relative")
                .map_err(|e| AppError::dom(&e))?;
        }
        Ok(Self {
            frames: Rc::new(AnimationFrames::new(window.clone())),
            window,
            document,
            container,
        })
    }

    fn create_canvas(&self, id: &str, attach: bool) -> RenderResult<HtmlCanvasElement> {
        let canvas = self
            .document
            .create_element("canvas")
            .map_err(|e| RenderError::Surface(format!("{e:?}")))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| RenderError::Surface("Element is not a canvas".to_string()))?;
        canvas.set_id(id);
        let style = canvas.style();
        for (name, value) in [("position", "absolute"), ("left", "0"), ("top", "0")] {
            let _ = style.set_property(name, value);
        }
        if attach {
            self.container
                .append_child(&canvas)
                .map_err(|e| RenderError::Surface(format!("{e:?}")))?;
        }
        Ok(canvas)
    }

    fn listen<E: FromWasmAbi + 'static>(
        target: &web_sys::EventTarget,
        event: &'static str,
        handler: impl FnMut(E) + 'static,
    ) -> Option<Subscription> {
        let closure = Closure::<dyn FnMut(E)>::new(handler);
        if let Err(err) =
            target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        {
            tracing::warn!("Failed to listen for {event}: {err:?}");
            return None;
        }
        let target = target.clone();
        Some(Subscription::new(move || {
            let _ = target
                .remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
        }))
    }
}

#[async_trait(?Send)]
impl Host for WebHost {
    type Surface = CanvasSurface;
    type Gl = WebGlSurface;
    type Presenter = GpuPresenter;

    fn container_size(&self) -> (f64, f64) {
        (
            f64::from(self.container.client_width()),
            f64::from(self.container.client_height()),
        )
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.device_pixel_ratio()
    }

    fn create_surface(&self, id: &str, attach: bool) -> RenderResult<CanvasSurface> {
        let canvas = self.create_canvas(id, attach)?;
        let ctx = canvas
            .get_context("2d")
            .map_err(|e| RenderError::ContextUnavailable(format!("{e:?}")))
            .and_then(|ctx| {
                ctx.ok_or_else(|| RenderError::ContextUnavailable("2D context not available".into()))
            })
            .and_then(|ctx| {
                ctx.dyn_into::<CanvasRenderingContext2d>().map_err(|_| {
                    RenderError::ContextUnavailable("Failed to cast to 2D context".into())
                })
            });
        let ctx = remove_on_error(&canvas, ctx)?;
        Ok(CanvasSurface::new(id, canvas, ctx))
    }

    fn create_gl_surface(&self, id: &str, antialias: bool) -> RenderResult<WebGlSurface> {
        let canvas = self.create_canvas(id, true)?;
        let attributes = WebGlContextAttributes::new();
        attributes.set_antialias(antialias);
        let gl = canvas
            .get_context_with_context_options("webgl", &attributes)
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<WebGlRenderingContext>().ok());
        let gl = gl.ok_or_else(|| RenderError::ContextUnavailable("WebGL is not supported".into()));
        let gl = remove_on_error(&canvas, gl)?;
        Ok(WebGlSurface::new(canvas, gl))
    }

    async fn create_presenter(
        &self,
        id: &str,
        pixel_width: u32,
        pixel_height: u32,
    ) -> RenderResult<GpuPresenter> {
        let canvas = self.create_canvas(id, true)?;
        canvas.set_width(pixel_width);
        canvas.set_height(pixel_height);
        let presenter = GpuPresenter::new(canvas.clone(), pixel_width, pixel_height).await;
        remove_on_error(&canvas, presenter)
    }

    fn scheduler(&self) -> Rc<dyn FrameScheduler> {
        self.frames.clone()
    }

    fn observe_resize(&self, callback: Box<dyn Fn()>) -> Subscription {
        let closure = Closure::<dyn FnMut(js_sys::Array)>::new(move |_entries| callback());
        let observer = match ResizeObserver::new(closure.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(err) => {
                tracing::warn!("ResizeObserver unavailable: {err:?}");
                return Subscription::empty();
            }
        };
        observer.observe(&self.container);
        Subscription::new(move || {
            observer.disconnect();
            drop(closure);
        })
    }

    fn observe_pointer(
        &self,
        surface_id: &str,
        callback: Box<dyn Fn(PointerInput)>,
    ) -> Subscription {
        let Some(element) = self.document.get_element_by_id(surface_id) else {
            tracing::warn!("No element #{surface_id} to observe pointer input on");
            return Subscription::empty();
        };
        let callback: Rc<dyn Fn(PointerInput)> = Rc::from(callback);

        let on_move = Rc::clone(&callback);
        let moves = Self::listen(&element, "mousemove", move |event: MouseEvent| {
            if event.buttons() & 1 != 0 {
                on_move(PointerInput::Drag {
                    dx: f64::from(event.movement_x()),
                    dy: f64::from(event.movement_y()),
                });
            }
        });
        let wheels = Self::listen(&element, "wheel", move |event: WheelEvent| {
            event.prevent_default();
            callback(PointerInput::Wheel {
                delta_y: event.delta_y(),
            });
        });
        Subscription::new(move || {
            drop(moves);
            drop(wheels);
        })
    }
}

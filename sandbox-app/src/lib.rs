//! # Canvas Sandbox WASM Application
//!
//! This crate provides the WASM bindings for the Canvas Sandbox,
//! running its backends inside a page container.
//!
//! ## Usage
//!
//! Build for WASM:
//! ```bash
//! wasm-pack build --target web sandbox-app
//! ```
//!
//! Then import in JavaScript:
//! ```javascript
//! import init, { CanvasSandbox } from './pkg/sandbox_app.js';
//!
//! await init();
//! const sandbox = new CanvasSandbox('canvas-container');
//!
//! sandbox.switchTo2D();
//! await sandbox.runOpeningAnimation();
//! sandbox.switchToWebGL();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod canvas;
pub mod error;
pub mod gpu;
pub mod host;
pub mod logging;
pub mod webgl;

use std::{
    cell::{RefCell, RefMut},
    rc::Rc,
};

use sandbox_core::{DrawOptions, Line, Point, RotateLine};
use sandbox_renderer::{
    first_screen_animation, BackendType, Canvas2DRenderer, CanvasManager, Completion,
    RendererConfig,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

pub use error::{AppError, AppResult};
pub use host::WebHost;

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init_wasm() {
    console_error_panic_hook::set_once();
    logging::init(None);
    tracing::info!("Canvas Sandbox WASM initialized");
}

/// Replace the default log filter, e.g. `"sandbox_renderer=trace"`.
///
/// Only effective before the first log line is written.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(directive: &str) {
    logging::init(Some(directive));
}

fn draw_options(json: Option<String>) -> AppResult<DrawOptions> {
    match json {
        Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(&json)?),
        _ => Ok(DrawOptions::default()),
    }
}

fn to_promise(completion: Completion) -> js_sys::Promise {
    future_to_promise(async move {
        completion.await;
        Ok(JsValue::UNDEFINED)
    })
}

/// The sandbox façade for JavaScript.
#[wasm_bindgen]
pub struct CanvasSandbox {
    manager: Rc<RefCell<CanvasManager<WebHost>>>,
}

impl CanvasSandbox {
    fn manager(&self) -> AppResult<RefMut<'_, CanvasManager<WebHost>>> {
        self.manager.try_borrow_mut().map_err(|_| AppError::Busy)
    }

    fn renderer_2d(&self) -> AppResult<Canvas2DRenderer<WebHost>> {
        self.manager()?
            .canvas2d()
            .cloned()
            .ok_or(AppError::No2dBackend)
    }
}

#[wasm_bindgen]
#[allow(clippy::needless_pass_by_value, clippy::too_many_arguments)]
impl CanvasSandbox {
    /// Create a sandbox inside the element with id `container_id`.
    ///
    /// `config_json` is an optional renderer configuration, for example
    /// `{"canvas":{"backgroundColor":"#f0fffa"},"antialias":true}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is missing or the JSON is malformed.
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: &str, config_json: Option<String>) -> Result<CanvasSandbox, JsValue> {
        let host = Rc::new(WebHost::new(container_id)?);
        let config = match config_json {
            Some(json) => RendererConfig::from_json(&json).map_err(AppError::from)?,
            None => RendererConfig::default(),
        };
        tracing::debug!("Canvas sandbox created in #{container_id}");
        Ok(Self {
            manager: Rc::new(RefCell::new(CanvasManager::with_config(host, config))),
        })
    }

    // ===== Backend selection =====

    /// Make the 2D backend active.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be created.
    #[wasm_bindgen(js_name = switchTo2D)]
    pub fn switch_to_2d(&self) -> Result<(), JsValue> {
        self.manager()?.switch_to_2d().map_err(error::to_js)
    }

    /// Make the WebGL backend active.
    ///
    /// # Errors
    ///
    /// Returns an error if WebGL is not supported.
    #[wasm_bindgen(js_name = switchToWebGL)]
    pub fn switch_to_webgl(&self) -> Result<(), JsValue> {
        self.manager()?.switch_to_webgl().map_err(error::to_js)
    }

    /// Make the retained backend active. Resolves once the GPU is ready.
    #[wasm_bindgen(js_name = switchToRetainedMode)]
    pub fn switch_to_retained(&self) -> js_sys::Promise {
        let manager = Rc::clone(&self.manager);
        future_to_promise(async move {
            let mut manager = manager.try_borrow_mut().map_err(|_| AppError::Busy)?;
            manager.switch_to_retained().await.map_err(error::to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Name of the active backend (`"2d"`, `"webgl"`, `"retained"`).
    #[wasm_bindgen(js_name = activeBackend)]
    #[must_use]
    pub fn active_backend(&self) -> Option<String> {
        self.manager
            .try_borrow()
            .ok()?
            .active_backend()
            .map(|kind: BackendType| kind.to_string())
    }

    // ===== Façade passthroughs =====

    /// Resize the active backend to a fixed CSS size.
    ///
    /// # Errors
    ///
    /// Returns an error if resizing fails.
    pub fn resize(&self, width: u32, height: u32) -> Result<(), JsValue> {
        self.manager()?.resize(width, height).map_err(error::to_js)
    }

    /// Present the active backend.
    ///
    /// # Errors
    ///
    /// Returns an error if presenting fails.
    pub fn render(&self) -> Result<(), JsValue> {
        self.manager()?.render().map_err(error::to_js)
    }

    /// Destroy the active backend.
    pub fn destroy(&self) {
        match self.manager() {
            Ok(mut manager) => manager.destroy(),
            Err(err) => tracing::warn!("destroy skipped: {err}"),
        }
    }

    // ===== 2D drawing =====

    /// Draw a point.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active or the options are malformed.
    #[wasm_bindgen(js_name = drawPoint)]
    pub fn draw_point(&self, x: f64, y: f64, options: Option<String>) -> Result<(), JsValue> {
        let options = draw_options(options)?;
        self.renderer_2d()?.draw_point(Point::new(x, y), &options);
        Ok(())
    }

    /// Draw a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active or the options are malformed.
    #[wasm_bindgen(js_name = drawLine)]
    pub fn draw_line(
        &self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        options: Option<String>,
    ) -> Result<(), JsValue> {
        let options = draw_options(options)?;
        self.renderer_2d()?
            .draw_line(Point::new(x1, y1), Point::new(x2, y2), &options);
        Ok(())
    }

    /// Draw an arc.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active or the options are malformed.
    #[wasm_bindgen(js_name = drawArc)]
    pub fn draw_arc(
        &self,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        options: Option<String>,
    ) -> Result<(), JsValue> {
        let options = draw_options(options)?;
        self.renderer_2d()?
            .draw_arc(Point::new(x, y), radius, start_angle, end_angle, &options);
        Ok(())
    }

    /// Draw a rectangle.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active or the options are malformed.
    #[wasm_bindgen(js_name = drawRect)]
    pub fn draw_rect(
        &self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        options: Option<String>,
    ) -> Result<(), JsValue> {
        let options = draw_options(options)?;
        self.renderer_2d()?
            .draw_rect(Point::new(x, y), width, height, &options);
        Ok(())
    }

    /// Clear the main layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active.
    pub fn clear(&self) -> Result<(), JsValue> {
        self.renderer_2d()?.clear();
        Ok(())
    }

    // ===== 2D animation =====

    /// Grow a line out of its midpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active or the options are malformed.
    #[wasm_bindgen(js_name = drawAnimateLine)]
    pub fn draw_animate_line(
        &self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        options: Option<String>,
        duration_ms: f64,
    ) -> Result<js_sys::Promise, JsValue> {
        let options = draw_options(options)?;
        let done = self.renderer_2d()?.draw_animate_line(
            Point::new(x1, y1),
            Point::new(x2, y2),
            &options,
            duration_ms,
        );
        Ok(to_promise(done))
    }

    /// Move a line vertically by `gap`.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active or the options are malformed.
    #[wasm_bindgen(js_name = moveLine)]
    pub fn move_line(
        &self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        options: Option<String>,
        duration_ms: f64,
        gap: f64,
    ) -> Result<js_sys::Promise, JsValue> {
        let options = draw_options(options)?;
        let done = self.renderer_2d()?.move_line(
            Point::new(x1, y1),
            Point::new(x2, y2),
            &options,
            duration_ms,
            gap,
        );
        Ok(to_promise(done))
    }

    /// Move several lines, `lines_json` being `[{"start":{"x":0,"y":0},"end":{...}}]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active or the JSON is malformed.
    #[wasm_bindgen(js_name = moveLines)]
    pub fn move_lines(
        &self,
        lines_json: &str,
        options: Option<String>,
        duration_ms: f64,
        gaps: Vec<f64>,
    ) -> Result<js_sys::Promise, JsValue> {
        let lines: Vec<Line> = serde_json::from_str(lines_json).map_err(AppError::from)?;
        let options = draw_options(options)?;
        let done = self
            .renderer_2d()?
            .move_lines(&lines, &options, duration_ms, &gaps);
        Ok(to_promise(done))
    }

    /// Rotate a line about its midpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active or the options are malformed.
    #[wasm_bindgen(js_name = rotateLine)]
    pub fn rotate_line(
        &self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        options: Option<String>,
        duration_ms: f64,
        angle_degrees: f64,
    ) -> Result<js_sys::Promise, JsValue> {
        let options = draw_options(options)?;
        let line = RotateLine::new(Point::new(x1, y1), Point::new(x2, y2));
        let done = self
            .renderer_2d()?
            .rotate_line(line, &options, duration_ms, angle_degrees);
        Ok(to_promise(done))
    }

    /// Rotate several lines, `lines_json` entries optionally carrying `rotateAt`.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active or the JSON is malformed.
    #[wasm_bindgen(js_name = rotateLines)]
    pub fn rotate_lines(
        &self,
        lines_json: &str,
        options: Option<String>,
        duration_ms: f64,
        angle_degrees: f64,
    ) -> Result<js_sys::Promise, JsValue> {
        let lines: Vec<RotateLine> = serde_json::from_str(lines_json).map_err(AppError::from)?;
        let options = draw_options(options)?;
        let done = self
            .renderer_2d()?
            .rotate_lines(&lines, &options, duration_ms, angle_degrees);
        Ok(to_promise(done))
    }

    /// Reveal `text` one character per `interval_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active or the options are malformed.
    #[wasm_bindgen(js_name = drawText)]
    pub fn draw_text(
        &self,
        x: f64,
        y: f64,
        text: &str,
        interval_ms: f64,
        options: Option<String>,
    ) -> Result<js_sys::Promise, JsValue> {
        let options = draw_options(options)?;
        let done = self
            .renderer_2d()?
            .draw_text(Point::new(x, y), text, interval_ms, &options);
        Ok(to_promise(done))
    }

    /// Call `callback(timestamp)` every frame until [`stop_animation`](Self::stop_animation).
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active.
    pub fn animate(&self, callback: js_sys::Function) -> Result<(), JsValue> {
        self.renderer_2d()?.animate(move |timestamp| {
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_f64(timestamp)) {
                tracing::error!("Animation callback threw: {err:?}");
            }
        });
        Ok(())
    }

    /// Stop the loop started by [`animate`](Self::animate).
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active.
    #[wasm_bindgen(js_name = stopAnimation)]
    pub fn stop_animation(&self) -> Result<(), JsValue> {
        self.renderer_2d()?.stop_animation();
        Ok(())
    }

    /// Play the opening animation on the 2D backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the 2D backend is not active.
    #[wasm_bindgen(js_name = runOpeningAnimation)]
    pub fn run_opening_animation(&self) -> Result<js_sys::Promise, JsValue> {
        let renderer = self.renderer_2d()?;
        Ok(future_to_promise(async move {
            first_screen_animation(&renderer).await;
            Ok(JsValue::UNDEFINED)
        }))
    }
}

//! A 2D drawing layer backed by a `<canvas>` element.

use std::rc::Rc;

use sandbox_core::{PixelSnapshot, Surface, Transform2d};
use wasm_bindgen::Clamped;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

/// A canvas element and its 2D context.
#[derive(Debug, Clone)]
pub struct CanvasSurface {
    id: Rc<str>,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// Wrap an existing canvas and context.
    #[must_use]
    pub fn new(id: &str, canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
        Self {
            id: Rc::from(id),
            canvas,
            ctx,
        }
    }

    /// The canvas element.
    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn set_style(&self, name: &str, value: &str) {
        if let Err(err) = self.canvas.style().set_property(name, value) {
            tracing::warn!("Failed to set {name} on #{}: {err:?}", self.id);
        }
    }
}

impl Surface for CanvasSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn pixel_width(&self) -> u32 {
        self.canvas.width()
    }

    fn pixel_height(&self) -> u32 {
        self.canvas.height()
    }

    fn set_pixel_size(&self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn set_css_size(&self, width: f64, height: f64) {
        self.set_style("width", &format!("{width}px"));
        self.set_style("height", &format!("{height}px"));
    }

    fn set_background(&self, color: &str) {
        self.set_style("background-color", color);
    }

    fn set_transform(&self, t: Transform2d) {
        let _ = self.ctx.set_transform(t.a, t.b, t.c, t.d, t.e, t.f);
    }

    fn clear_rect(&self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.clear_rect(x, y, width, height);
    }

    fn begin_path(&self) {
        self.ctx.begin_path();
    }

    fn move_to(&self, x: f64, y: f64) {
        self.ctx.move_to(x, y);
    }

    fn line_to(&self, x: f64, y: f64) {
        self.ctx.line_to(x, y);
    }

    fn arc(&self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) {
        let _ = self.ctx.arc(x, y, radius, start_angle, end_angle);
    }

    fn rect(&self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.rect(x, y, width, height);
    }

    fn stroke(&self) {
        self.ctx.stroke();
    }

    fn fill(&self) {
        self.ctx.fill();
    }

    fn set_stroke_style(&self, color: &str) {
        self.ctx.set_stroke_style_str(color);
    }

    fn set_fill_style(&self, color: &str) {
        self.ctx.set_fill_style_str(color);
    }

    fn set_line_width(&self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn set_font(&self, font: &str) {
        self.ctx.set_font(font);
    }

    fn fill_text(&self, text: &str, x: f64, y: f64) {
        // Undo the Y flip locally so glyphs stay upright.
        self.ctx.save();
        let _ = self.ctx.translate(x, y);
        let _ = self.ctx.scale(1.0, -1.0);
        let _ = self.ctx.fill_text(text, 0.0, 0.0);
        self.ctx.restore();
    }

    fn snapshot(&self) -> Option<PixelSnapshot> {
        let (width, height) = (self.canvas.width(), self.canvas.height());
        if width == 0 || height == 0 {
            return None;
        }
        let image = self
            .ctx
            .get_image_data(0.0, 0.0, f64::from(width), f64::from(height))
            .map_err(|err| tracing::warn!("Snapshot of #{} failed: {err:?}", self.id))
            .ok()?;
        Some(PixelSnapshot {
            width: image.width(),
            height: image.height(),
            data: image.data().0,
        })
    }

    fn restore_snapshot(&self, snapshot: &PixelSnapshot, dx: f64, dy: f64) {
        if snapshot.is_empty() {
            return;
        }
        let image = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(&snapshot.data),
            snapshot.width,
            snapshot.height,
        );
        match image {
            Ok(image) => {
                let _ = self.ctx.put_image_data(&image, dx, dy);
            }
            Err(err) => tracing::warn!("Restoring #{} failed: {err:?}", self.id),
        }
    }

    fn composite_from(&self, source: &Self) {
        self.ctx.save();
        let _ = self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        let _ = self
            .ctx
            .draw_image_with_html_canvas_element(&source.canvas, 0.0, 0.0);
        self.ctx.restore();
    }

    fn detach(&self) {
        self.canvas.remove();
    }
}

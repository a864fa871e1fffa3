//! The 2D drawing surface contract.
//!
//! A [`Surface`] is one drawing layer: a canvas element and its 2D context in
//! the browser, or a [`RecordingSurface`](crate::RecordingSurface) in tests.
//! All methods take `&self` because the underlying handles are shared.

use crate::Point;

/// A 2D affine transform in canvas `setTransform(a, b, c, d, e, f)` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2d {
    /// Horizontal scale.
    pub a: f64,
    /// Vertical skew.
    pub b: f64,
    /// Horizontal skew.
    pub c: f64,
    /// Vertical scale.
    pub d: f64,
    /// Horizontal translation.
    pub e: f64,
    /// Vertical translation.
    pub f: f64,
}

impl Transform2d {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Centre-origin, Y-up transform for a surface of `pixel_width` x
    /// `pixel_height` device pixels scaled by `dpr`.
    #[must_use]
    pub fn center_origin(pixel_width: u32, pixel_height: u32, dpr: f64) -> Self {
        Self {
            a: dpr,
            b: 0.0,
            c: 0.0,
            d: -dpr,
            e: f64::from(pixel_width) / 2.0,
            f: f64::from(pixel_height) / 2.0,
        }
    }

    /// Map a logical point to device pixels.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }
}

impl Default for Transform2d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A copy of a surface's device pixels (RGBA, row-major).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSnapshot {
    /// Width in device pixels.
    pub width: u32,
    /// Height in device pixels.
    pub height: u32,
    /// RGBA bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

impl PixelSnapshot {
    /// Whether the snapshot holds no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One 2D drawing layer.
///
/// Geometry arguments are in the coordinate space established by the current
/// transform; for backend surfaces that is the centre-origin logical space.
pub trait Surface {
    /// Identifier of the surface (the element id in the browser).
    fn id(&self) -> &str;

    /// Backing store width in device pixels.
    fn pixel_width(&self) -> u32;

    /// Backing store height in device pixels.
    fn pixel_height(&self) -> u32;

    /// Resize the backing store. This resets the transform and clears pixels.
    fn set_pixel_size(&self, width: u32, height: u32);

    /// Set the displayed (CSS) size.
    fn set_css_size(&self, width: f64, height: f64);

    /// Set the displayed background color.
    fn set_background(&self, color: &str);

    /// Replace the current transform.
    fn set_transform(&self, transform: Transform2d);

    /// Clear a rectangle in the current coordinate space.
    fn clear_rect(&self, x: f64, y: f64, width: f64, height: f64);

    /// Start a new path.
    fn begin_path(&self);

    /// Move the pen without drawing.
    fn move_to(&self, x: f64, y: f64);

    /// Add a straight segment to the path.
    fn line_to(&self, x: f64, y: f64);

    /// Add a circular arc to the path.
    fn arc(&self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64);

    /// Add a rectangle to the path.
    fn rect(&self, x: f64, y: f64, width: f64, height: f64);

    /// Stroke the current path.
    fn stroke(&self);

    /// Fill the current path.
    fn fill(&self);

    /// Set the stroke color.
    fn set_stroke_style(&self, color: &str);

    /// Set the fill color.
    fn set_fill_style(&self, color: &str);

    /// Set the stroke width.
    fn set_line_width(&self, width: f64);

    /// Set the CSS font.
    fn set_font(&self, font: &str);

    /// Fill text with its baseline starting at `(x, y)`, upright even when the
    /// current transform flips the Y axis.
    fn fill_text(&self, text: &str, x: f64, y: f64);

    /// Copy all device pixels, or `None` when the surface is empty or
    /// unreadable.
    fn snapshot(&self) -> Option<PixelSnapshot>;

    /// Write pixels back at a device-pixel offset, ignoring the transform.
    fn restore_snapshot(&self, snapshot: &PixelSnapshot, dx: f64, dy: f64);

    /// Copy another surface's device pixels onto this one 1:1, ignoring the
    /// transform.
    fn composite_from(&self, source: &Self)
    where
        Self: Sized;

    /// Remove the surface from the document.
    fn detach(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_origin_maps_origin_to_middle() {
        let t = Transform2d::center_origin(800, 600, 2.0);
        assert_eq!(t.apply(Point::origin()), Point::new(400.0, 300.0));
    }

    #[test]
    fn center_origin_flips_y() {
        let t = Transform2d::center_origin(200, 200, 1.0);
        let up = t.apply(Point::new(0.0, 10.0));
        assert!(up.y < 100.0, "positive logical Y is above the centre");
    }

    #[test]
    fn empty_snapshot() {
        let snap = PixelSnapshot {
            width: 0,
            height: 10,
            data: Vec::new(),
        };
        assert!(snap.is_empty());
    }
}

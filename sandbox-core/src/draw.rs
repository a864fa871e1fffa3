//! Immediate drawing primitives.
//!
//! Every function paints synchronously into the given surface using the
//! surface's current transform.

use std::f64::consts::TAU;

use crate::{DrawOptions, Line, Point, Rect, Surface};

/// Snap a coordinate to the centre of a device pixel for crisp 1px strokes.
#[must_use]
pub fn align_to_pixel_grid(value: f64) -> f64 {
    value.round() + 0.5
}

/// Snap both endpoints of a line to the pixel grid.
#[must_use]
pub fn align_line(line: Line) -> Line {
    Line::new(
        Point::new(align_to_pixel_grid(line.start.x), align_to_pixel_grid(line.start.y)),
        Point::new(align_to_pixel_grid(line.end.x), align_to_pixel_grid(line.end.y)),
    )
}

/// Paint a filled dot whose radius is the line width.
pub fn draw_point<S: Surface + ?Sized>(surface: &S, point: Point, options: &DrawOptions) {
    surface.begin_path();
    surface.arc(point.x, point.y, options.width(), 0.0, TAU);
    surface.set_fill_style(options.color());
    surface.fill();
}

/// Stroke a straight segment.
pub fn draw_line<S: Surface + ?Sized>(surface: &S, start: Point, end: Point, options: &DrawOptions) {
    surface.begin_path();
    surface.move_to(start.x, start.y);
    surface.line_to(end.x, end.y);
    surface.set_stroke_style(options.color());
    surface.set_line_width(options.width());
    surface.stroke();
}

/// Stroke a circular arc.
pub fn draw_arc<S: Surface + ?Sized>(
    surface: &S,
    center: Point,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    options: &DrawOptions,
) {
    surface.begin_path();
    surface.arc(center.x, center.y, radius, start_angle, end_angle);
    surface.set_stroke_style(options.color());
    surface.set_line_width(options.width());
    surface.stroke();
}

/// Stroke a rectangle anchored at `corner`, filling it first when
/// `fill_color` is set.
pub fn draw_rect<S: Surface + ?Sized>(
    surface: &S,
    corner: Point,
    width: f64,
    height: f64,
    options: &DrawOptions,
) {
    surface.begin_path();
    surface.rect(corner.x, corner.y, width, height);
    if let Some(fill) = options.fill() {
        surface.set_fill_style(fill);
        surface.fill();
    }
    surface.set_stroke_style(options.color());
    surface.set_line_width(options.width());
    surface.stroke();
}

/// Fill text with its baseline at `position`.
pub fn draw_text<S: Surface + ?Sized>(surface: &S, position: Point, text: &str, options: &DrawOptions) {
    surface.set_fill_style(options.color());
    surface.set_font(&options.css_font());
    surface.fill_text(text, position.x, position.y);
}

/// The region cleared by [`clear_canvas`] when none is given.
///
/// The origin sits in the middle of the surface, so the default extent spans
/// twice the pixel size starting at minus the pixel size.
#[must_use]
pub fn default_clear_region<S: Surface + ?Sized>(surface: &S) -> Rect {
    let w = f64::from(surface.pixel_width());
    let h = f64::from(surface.pixel_height());
    Rect::new(-w, -h, w * 2.0, h * 2.0)
}

/// Clear `region`, or the whole centre-origin surface when `None`.
pub fn clear_canvas<S: Surface + ?Sized>(surface: &S, region: Option<Rect>) {
    let r = region.unwrap_or_else(|| default_clear_region(surface));
    surface.clear_rect(r.x, r.y, r.width, r.height);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawCommand, Mark, RecordingSurface};
    use crate::Transform2d;

    fn surface() -> RecordingSurface {
        let s = RecordingSurface::new("test", true);
        s.set_pixel_size(400, 300);
        s.set_transform(Transform2d::center_origin(400, 300, 1.0));
        s
    }

    #[test]
    fn pixel_grid_alignment() {
        assert!((align_to_pixel_grid(2.2) - 2.5).abs() < f64::EPSILON);
        assert!((align_to_pixel_grid(-2.7) + 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn draw_line_records_stroke_with_style() {
        let s = surface();
        let opts = DrawOptions::with_color("green").line_width(2.0);
        draw_line(&s, Point::new(-10.0, 0.0), Point::new(10.0, 0.0), &opts);
        let lines = s.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, Line::new(Point::new(-10.0, 0.0), Point::new(10.0, 0.0)));
        assert_eq!(lines[0].1, "green");
    }

    #[test]
    fn draw_point_fills_dot_with_line_width_radius() {
        let s = surface();
        draw_point(&s, Point::new(3.0, 4.0), &DrawOptions::default().line_width(5.0));
        assert!(s.marks().iter().any(|m| matches!(
            m,
            Mark::Dot { center, radius, .. } if *center == Point::new(3.0, 4.0) && (*radius - 5.0).abs() < f64::EPSILON
        )));
    }

    #[test]
    fn draw_rect_fills_only_with_fill_color() {
        let s = surface();
        draw_rect(&s, Point::origin(), 10.0, 10.0, &DrawOptions::default());
        assert!(!s.commands().contains(&DrawCommand::Fill));

        let filled = DrawOptions {
            fill_color: Some("red".into()),
            ..DrawOptions::default()
        };
        draw_rect(&s, Point::origin(), 10.0, 10.0, &filled);
        assert!(s.commands().contains(&DrawCommand::Fill));
    }

    #[test]
    fn default_clear_region_covers_double_extent() {
        let s = surface();
        let r = default_clear_region(&s);
        assert_eq!(r, Rect::new(-400.0, -300.0, 800.0, 600.0));
        assert!(r.contains(Point::new(-400.0, 300.0)));
        assert!(r.contains(Point::new(400.0, -300.0)));
    }

    #[test]
    fn clear_canvas_removes_everything_within_extent() {
        let s = surface();
        let opts = DrawOptions::default();
        draw_line(&s, Point::new(-400.0, -300.0), Point::new(400.0, 300.0), &opts);
        draw_point(&s, Point::new(399.0, -299.0), &opts);
        draw_arc(&s, Point::origin(), 50.0, 0.0, 1.0, &opts);
        assert_eq!(s.marks().len(), 3);
        clear_canvas(&s, None);
        assert!(s.marks().is_empty());
    }

    #[test]
    fn clear_canvas_region_is_partial() {
        let s = surface();
        let opts = DrawOptions::default();
        draw_line(&s, Point::new(-5.0, 0.0), Point::new(5.0, 0.0), &opts);
        draw_line(&s, Point::new(-5.0, 100.0), Point::new(5.0, 100.0), &opts);
        clear_canvas(&s, Some(Rect::new(-10.0, -10.0, 20.0, 20.0)));
        let lines = s.lines();
        assert_eq!(lines.len(), 1);
        assert!((lines[0].0.start.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn draw_text_sets_font_then_fills() {
        let s = surface();
        let opts = DrawOptions {
            font_size: Some(20.0),
            ..DrawOptions::default()
        };
        draw_text(&s, Point::new(1.0, 2.0), "hi", &opts);
        assert!(s.commands().contains(&DrawCommand::SetFont("20px Arial".into())));
        assert_eq!(s.texts(), vec![("hi".to_string(), Point::new(1.0, 2.0))]);
    }
}

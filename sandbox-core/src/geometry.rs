//! Geometric primitives in the centre-origin, Y-up logical space.

use serde::{Deserialize, Serialize};

/// A point in logical canvas coordinates.
///
/// The origin is the centre of the surface and positive Y points up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate (up is positive).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The origin `(0, 0)`.
    #[must_use]
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Return this point shifted vertically by `dy`.
    #[must_use]
    pub fn offset_y(self, dy: f64) -> Self {
        Self::new(self.x, self.y + dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Linear interpolation towards `other` by factor `t`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Rotate `point` by `angle` radians around `pivot`.
///
/// Positive angles rotate counter-clockwise in the Y-up space.
#[must_use]
pub fn rotate_point(point: Point, angle: f64, pivot: Point) -> Point {
    let (sin, cos) = angle.sin_cos();
    let dx = point.x - pivot.x;
    let dy = point.y - pivot.y;
    Point {
        x: cos * dx - sin * dy + pivot.x,
        y: sin * dx + cos * dy + pivot.y,
    }
}

/// A straight segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Start of the segment.
    pub start: Point,
    /// End of the segment.
    pub end: Point,
}

impl Line {
    /// Create a new line.
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Midpoint of the segment.
    #[must_use]
    pub fn midpoint(&self) -> Point {
        self.start.lerp(self.end, 0.5)
    }

    /// Length of the segment.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance_to(self.end)
    }

    /// Return the line shifted vertically by `dy`.
    #[must_use]
    pub fn translated_y(&self, dy: f64) -> Self {
        Self::new(self.start.offset_y(dy), self.end.offset_y(dy))
    }

    /// Return the line rotated by `angle` radians around `pivot`.
    #[must_use]
    pub fn rotated(&self, angle: f64, pivot: Point) -> Self {
        Self::new(
            rotate_point(self.start, angle, pivot),
            rotate_point(self.end, angle, pivot),
        )
    }

    /// Axis-aligned bounding box of the segment.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_corners(self.start, self.end)
    }
}

/// A line with an optional rotation pivot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateLine {
    /// Start of the segment.
    pub start: Point,
    /// End of the segment.
    pub end: Point,
    /// Rotation pivot; the midpoint is used when absent.
    #[serde(default)]
    pub rotate_at: Option<Point>,
}

impl RotateLine {
    /// Create a rotating line that pivots around its midpoint.
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            rotate_at: None,
        }
    }

    /// Set an explicit pivot.
    #[must_use]
    pub const fn with_pivot(mut self, pivot: Point) -> Self {
        self.rotate_at = Some(pivot);
        self
    }

    /// The plain segment.
    #[must_use]
    pub const fn line(&self) -> Line {
        Line::new(self.start, self.end)
    }

    /// The effective pivot: `rotate_at` or the midpoint.
    #[must_use]
    pub fn pivot(&self) -> Point {
        self.rotate_at.unwrap_or_else(|| self.line().midpoint())
    }

    /// The segment rotated by `angle` radians around its pivot.
    #[must_use]
    pub fn rotated(&self, angle: f64) -> Line {
        self.line().rotated(angle, self.pivot())
    }
}

impl From<Line> for RotateLine {
    fn from(line: Line) -> Self {
        Self::new(line.start, line.end)
    }
}

/// An axis-aligned rectangle with non-negative extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum X.
    pub x: f64,
    /// Minimum Y.
    pub y: f64,
    /// Width (never negative).
    pub width: f64,
    /// Height (never negative).
    pub height: f64,
}

impl Rect {
    /// Create a rectangle, normalising negative extents.
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        let (x, width) = if width < 0.0 { (x + width, -width) } else { (x, width) };
        let (y, height) = if height < 0.0 {
            (y + height, -height)
        } else {
            (y, height)
        };
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing both corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        let min_x = a.x.min(b.x);
        let min_y = a.y.min(b.y);
        Self {
            x: min_x,
            y: min_y,
            width: a.x.max(b.x) - min_x,
            height: a.y.max(b.y) - min_y,
        }
    }

    /// Smallest rectangle containing both rectangles.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::from_corners(
            Point::new(self.x.min(other.x), self.y.min(other.y)),
            Point::new(self.max_x().max(other.max_x()), self.max_y().max(other.max_y())),
        )
    }

    /// Grow the rectangle by `margin` on every side.
    #[must_use]
    pub fn inflate(&self, margin: f64) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.width + margin * 2.0,
            self.height + margin * 2.0,
        )
    }

    /// Right edge.
    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Top edge (Y-up).
    #[must_use]
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Whether `point` lies inside or on the border.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.max_x() && point.y >= self.y && point.y <= self.max_y()
    }

    /// Whether `other` lies entirely inside this rectangle.
    #[must_use]
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON
    }

    #[test]
    fn rotate_quarter_turn_about_origin() {
        let p = rotate_point(Point::new(1.0, 0.0), FRAC_PI_2, Point::origin());
        assert!(approx(p, Point::new(0.0, 1.0)));
    }

    #[test]
    fn rotate_about_offset_pivot() {
        let pivot = Point::new(10.0, 10.0);
        let p = rotate_point(Point::new(12.0, 10.0), PI, pivot);
        assert!(approx(p, Point::new(8.0, 10.0)));
    }

    #[test]
    fn rotate_inverse_round_trip() {
        let pivots = [Point::origin(), Point::new(-3.5, 7.25), Point::new(120.0, -40.0)];
        let points = [Point::new(1.0, 2.0), Point::new(-150.0, 0.0), Point::new(0.3, -99.9)];
        for angle in [0.0, 0.1, 1.0, FRAC_PI_2, 2.5, -4.0, 10.0] {
            for pivot in pivots {
                for p in points {
                    let back = rotate_point(rotate_point(p, angle, pivot), -angle, pivot);
                    assert!(approx(back, p), "{p:?} about {pivot:?} by {angle}");
                }
            }
        }
    }

    #[test]
    fn rotate_pivot_is_fixed_point() {
        let pivot = Point::new(4.0, -2.0);
        assert!(approx(rotate_point(pivot, 1.234, pivot), pivot));
    }

    #[test]
    fn line_midpoint_and_length() {
        let line = Line::new(Point::new(-50.0, 0.0), Point::new(50.0, 0.0));
        assert_eq!(line.midpoint(), Point::origin());
        assert!((line.length() - 100.0).abs() < EPSILON);
    }

    #[test]
    fn rotate_line_defaults_to_midpoint() {
        let line = RotateLine::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(line.pivot(), Point::new(5.0, 0.0));
        let pinned = line.with_pivot(Point::origin());
        assert_eq!(pinned.pivot(), Point::origin());
    }

    #[test]
    fn rect_normalises_negative_extent() {
        let r = Rect::new(10.0, 10.0, -20.0, -5.0);
        assert_eq!(r, Rect::new(-10.0, 5.0, 20.0, 5.0));
    }

    #[test]
    fn rect_union_and_inflate() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, -5.0, 10.0, 10.0);
        let u = a.union(&b).inflate(1.0);
        assert_eq!(u, Rect::new(-1.0, -6.0, 17.0, 17.0));
        assert!(u.contains_rect(&a));
        assert!(u.contains_rect(&b));
    }

    #[test]
    fn rotate_line_deserializes_camel_case() {
        let json = r#"{"start":{"x":-1.0,"y":0.0},"end":{"x":1.0,"y":0.0},"rotateAt":{"x":0.0,"y":2.0}}"#;
        let line: RotateLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.pivot(), Point::new(0.0, 2.0));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_point() -> impl Strategy<Value = Point> {
            (-1000.0f64..1000.0, -1000.0f64..1000.0).prop_map(|(x, y)| Point::new(x, y))
        }

        proptest! {
            #[test]
            fn prop_rotation_is_undone_by_its_inverse(
                p in arb_point(),
                pivot in arb_point(),
                angle in -10.0f64..10.0,
            ) {
                let back = rotate_point(rotate_point(p, angle, pivot), -angle, pivot);
                prop_assert!((back.x - p.x).abs() < 1e-6, "x drifted: {} vs {}", back.x, p.x);
                prop_assert!((back.y - p.y).abs() < 1e-6, "y drifted: {} vs {}", back.y, p.y);
            }

            #[test]
            fn prop_rotation_keeps_distance_to_pivot(
                p in arb_point(),
                pivot in arb_point(),
                angle in -10.0f64..10.0,
            ) {
                let rotated = rotate_point(p, angle, pivot);
                let before = p.distance_to(pivot);
                let after = rotated.distance_to(pivot);
                prop_assert!((before - after).abs() < 1e-6);
            }

            #[test]
            fn prop_rect_from_corners_contains_both(a in arb_point(), b in arb_point()) {
                let rect = Rect::from_corners(a, b);
                prop_assert!(rect.width >= 0.0 && rect.height >= 0.0);
                let loose = rect.inflate(1e-9);
                prop_assert!(loose.contains(a));
                prop_assert!(loose.contains(b));
            }
        }
    }
}

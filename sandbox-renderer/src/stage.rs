//! Retained display list for the retained-mode backend.
//!
//! Objects live in the centre-origin, Y-up logical space (CSS pixels) and are
//! tessellated into clip-space triangles every presented frame.

use bytemuck::{Pod, Zeroable};
use sandbox_core::{rotate_point, Point, Rgba};

/// Number of triangles used to approximate a circle.
pub const CIRCLE_SEGMENTS: usize = 32;

/// A clip-space vertex with a color, laid out for a GPU vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    /// Clip-space position.
    pub position: [f32; 2],
    /// Linear RGBA color.
    pub color: [f32; 4],
}

/// Geometry of a display object in its local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// A stroked segment.
    Line {
        /// Local start point.
        start: Point,
        /// Local end point.
        end: Point,
        /// Stroke width.
        width: f64,
    },
    /// A filled rectangle centred on the local origin.
    Rect {
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
    /// A filled circle centred on the local origin.
    Circle {
        /// Radius.
        radius: f64,
    },
}

/// One object on the stage.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayObject {
    /// Geometry.
    pub shape: Shape,
    /// Fill or stroke color.
    pub color: Rgba,
    /// Translation applied after rotation.
    pub position: Point,
    /// Rotation in radians, counter-clockwise.
    pub rotation: f64,
    /// Hidden objects are kept but not drawn.
    pub visible: bool,
}

impl DisplayObject {
    /// An object with the given shape at the origin.
    #[must_use]
    pub fn new(shape: Shape, color: Rgba) -> Self {
        Self {
            shape,
            color,
            position: Point::origin(),
            rotation: 0.0,
            visible: true,
        }
    }

    /// A stroked line.
    #[must_use]
    pub fn line(start: Point, end: Point, width: f64, color: Rgba) -> Self {
        Self::new(Shape::Line { start, end, width }, color)
    }

    /// A filled rectangle.
    #[must_use]
    pub fn rect(width: f64, height: f64, color: Rgba) -> Self {
        Self::new(Shape::Rect { width, height }, color)
    }

    /// A filled circle.
    #[must_use]
    pub fn circle(radius: f64, color: Rgba) -> Self {
        Self::new(Shape::Circle { radius }, color)
    }

    /// Move the object.
    #[must_use]
    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    /// Rotate the object.
    #[must_use]
    pub fn rotated(mut self, radians: f64) -> Self {
        self.rotation = radians;
        self
    }

    fn to_world(&self, local: Point) -> Point {
        let p = rotate_point(local, self.rotation, Point::origin());
        Point::new(p.x + self.position.x, p.y + self.position.y)
    }

    /// Local-space triangles for this object's shape.
    fn local_triangles(&self) -> Vec<Point> {
        match self.shape {
            Shape::Line { start, end, width } => {
                let length = start.distance_to(end);
                if length <= f64::EPSILON {
                    return Vec::new();
                }
                let half = width.max(0.0) / 2.0;
                let nx = -(end.y - start.y) / length * half;
                let ny = (end.x - start.x) / length * half;
                let a = Point::new(start.x + nx, start.y + ny);
                let b = Point::new(start.x - nx, start.y - ny);
                let c = Point::new(end.x - nx, end.y - ny);
                let d = Point::new(end.x + nx, end.y + ny);
                vec![a, b, c, a, c, d]
            }
            Shape::Rect { width, height } => {
                let (hw, hh) = (width / 2.0, height / 2.0);
                let a = Point::new(-hw, -hh);
                let b = Point::new(hw, -hh);
                let c = Point::new(hw, hh);
                let d = Point::new(-hw, hh);
                vec![a, b, c, a, c, d]
            }
            Shape::Circle { radius } => {
                #[allow(clippy::cast_precision_loss)]
                let step = std::f64::consts::TAU / CIRCLE_SEGMENTS as f64;
                (0..CIRCLE_SEGMENTS)
                    .flat_map(|i| {
                        #[allow(clippy::cast_precision_loss)]
                        let a0 = step * i as f64;
                        let a1 = a0 + step;
                        [
                            Point::origin(),
                            Point::new(radius * a0.cos(), radius * a0.sin()),
                            Point::new(radius * a1.cos(), radius * a1.sin()),
                        ]
                    })
                    .collect()
            }
        }
    }
}

/// Identifier of an object on a [`Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(u32);

/// An ordered display list; later objects draw on top.
#[derive(Debug, Default)]
pub struct Stage {
    objects: Vec<(ObjectId, DisplayObject)>,
    next_id: u32,
}

impl Stage {
    /// An empty stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object on top of the others.
    pub fn add(&mut self, object: DisplayObject) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        self.objects.push((id, object));
        id
    }

    /// Look up an object.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&DisplayObject> {
        self.objects.iter().find(|(i, _)| *i == id).map(|(_, o)| o)
    }

    /// Look up an object for editing.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut DisplayObject> {
        self.objects
            .iter_mut()
            .find(|(i, _)| *i == id)
            .map(|(_, o)| o)
    }

    /// Remove an object.
    pub fn remove(&mut self, id: ObjectId) -> Option<DisplayObject> {
        let index = self.objects.iter().position(|(i, _)| *i == id)?;
        Some(self.objects.remove(index).1)
    }

    /// Remove every object.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the stage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Tessellate visible objects for a viewport of `css_width` x
    /// `css_height` logical pixels.
    #[must_use]
    pub fn tessellate(&self, css_width: f64, css_height: f64) -> Vec<ColorVertex> {
        if css_width <= 0.0 || css_height <= 0.0 {
            return Vec::new();
        }
        let (sx, sy) = (2.0 / css_width, 2.0 / css_height);
        let mut vertices = Vec::new();
        for (_, object) in self.objects.iter().filter(|(_, o)| o.visible) {
            let color = object.color.to_array();
            vertices.extend(object.local_triangles().into_iter().map(|local| {
                let world = object.to_world(local);
                #[allow(clippy::cast_possible_truncation)]
                let position = [(world.x * sx) as f32, (world.y * sy) as f32];
                ColorVertex { position, color }
            }));
        }
        vertices
    }
}

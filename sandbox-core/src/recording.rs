//! A [`Surface`] that records calls instead of rasterising.
//!
//! Besides the raw command log it keeps a list of visible [`Mark`]s so tests
//! can ask "what is on this layer right now". Clearing a region removes every
//! mark whose bounding box lies inside it; resizing the backing store drops
//! all marks, like a real canvas.

use std::{cell::RefCell, rc::Rc};

use crate::{Line, PixelSnapshot, Point, Rect, Surface, Transform2d};

/// One recorded surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Backing store resized.
    SetPixelSize(u32, u32),
    /// Display size changed.
    SetCssSize(f64, f64),
    /// Background color changed.
    SetBackground(String),
    /// Transform replaced.
    SetTransform(Transform2d),
    /// Region cleared (normalised).
    ClearRect(Rect),
    /// Path started.
    BeginPath,
    /// Pen moved.
    MoveTo(Point),
    /// Segment added.
    LineTo(Point),
    /// Arc added.
    Arc {
        /// Arc centre.
        center: Point,
        /// Arc radius.
        radius: f64,
    },
    /// Rectangle added.
    Rect(Rect),
    /// Path stroked.
    Stroke,
    /// Path filled.
    Fill,
    /// Stroke color changed.
    SetStrokeStyle(String),
    /// Fill color changed.
    SetFillStyle(String),
    /// Stroke width changed.
    SetLineWidth(f64),
    /// Font changed.
    SetFont(String),
    /// Text filled.
    FillText(String, Point),
    /// Pixels written back at a device offset.
    PutImage {
        /// Horizontal device offset.
        dx: f64,
        /// Vertical device offset.
        dy: f64,
    },
    /// Another surface composited onto this one.
    Composite(String),
    /// Surface removed from the document.
    Detach,
}

/// Something currently visible on a recording surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    /// A stroked segment.
    Line {
        /// The segment.
        line: Line,
        /// Stroke color.
        color: String,
        /// Stroke width.
        width: f64,
    },
    /// A stroked arc.
    Arc {
        /// Centre.
        center: Point,
        /// Radius.
        radius: f64,
        /// Stroke color.
        color: String,
    },
    /// A filled circle.
    Dot {
        /// Centre.
        center: Point,
        /// Radius.
        radius: f64,
        /// Fill color.
        color: String,
    },
    /// A stroked rectangle outline.
    Outline {
        /// The rectangle.
        rect: Rect,
        /// Stroke color.
        color: String,
    },
    /// A filled rectangle.
    Block {
        /// The rectangle.
        rect: Rect,
        /// Fill color.
        color: String,
    },
    /// Filled text.
    Text {
        /// The text.
        text: String,
        /// Baseline origin.
        at: Point,
        /// Fill color.
        color: String,
    },
}

impl Mark {
    /// Bounding box used when clearing regions.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Line { line, .. } => line.bounds(),
            Self::Arc { center, radius, .. } | Self::Dot { center, radius, .. } => {
                Rect::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0)
            }
            Self::Outline { rect, .. } | Self::Block { rect, .. } => *rect,
            Self::Text { at, .. } => Rect::new(at.x, at.y, 0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    Arc(Point, f64),
    Rect(Rect),
}

#[derive(Debug, Default)]
struct RecordingState {
    pixel_width: u32,
    pixel_height: u32,
    css_size: (f64, f64),
    transform: Transform2d,
    commands: Vec<DrawCommand>,
    path: Vec<PathSegment>,
    stroke_style: String,
    fill_style: String,
    line_width: f64,
    marks: Vec<Mark>,
    detached: bool,
}

/// A recording surface. Clones share the same recording.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    id: Rc<str>,
    attached: bool,
    state: Rc<RefCell<RecordingState>>,
}

impl RecordingSurface {
    /// Create a surface; `attached` marks it as part of the document.
    #[must_use]
    pub fn new(id: &str, attached: bool) -> Self {
        let state = RecordingState {
            stroke_style: "black".to_string(),
            fill_style: "black".to_string(),
            line_width: 1.0,
            ..RecordingState::default()
        };
        Self {
            id: Rc::from(id),
            attached,
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// All recorded commands, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<DrawCommand> {
        self.state.borrow().commands.clone()
    }

    /// Forget recorded commands (marks are kept).
    pub fn clear_commands(&self) {
        self.state.borrow_mut().commands.clear();
    }

    /// Currently visible marks.
    #[must_use]
    pub fn marks(&self) -> Vec<Mark> {
        self.state.borrow().marks.clone()
    }

    /// Visible stroked lines with their colors.
    #[must_use]
    pub fn lines(&self) -> Vec<(Line, String)> {
        self.state
            .borrow()
            .marks
            .iter()
            .filter_map(|m| match m {
                Mark::Line { line, color, .. } => Some((*line, color.clone())),
                _ => None,
            })
            .collect()
    }

    /// Visible texts with their positions.
    #[must_use]
    pub fn texts(&self) -> Vec<(String, Point)> {
        self.state
            .borrow()
            .marks
            .iter()
            .filter_map(|m| match m {
                Mark::Text { text, at, .. } => Some((text.clone(), *at)),
                _ => None,
            })
            .collect()
    }

    /// Whether nothing is visible.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.state.borrow().marks.is_empty()
    }

    /// Current transform.
    #[must_use]
    pub fn transform(&self) -> Transform2d {
        self.state.borrow().transform
    }

    /// Current display size.
    #[must_use]
    pub fn css_size(&self) -> (f64, f64) {
        self.state.borrow().css_size
    }

    /// Whether the surface was created as part of the document.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Whether the surface is still in the document.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.attached && !self.state.borrow().detached
    }

    fn record(&self, command: DrawCommand) {
        self.state.borrow_mut().commands.push(command);
    }
}

impl Surface for RecordingSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn pixel_width(&self) -> u32 {
        self.state.borrow().pixel_width
    }

    fn pixel_height(&self) -> u32 {
        self.state.borrow().pixel_height
    }

    fn set_pixel_size(&self, width: u32, height: u32) {
        let mut state = self.state.borrow_mut();
        state.pixel_width = width;
        state.pixel_height = height;
        state.transform = Transform2d::IDENTITY;
        state.marks.clear();
        state.path.clear();
        state.commands.push(DrawCommand::SetPixelSize(width, height));
    }

    fn set_css_size(&self, width: f64, height: f64) {
        let mut state = self.state.borrow_mut();
        state.css_size = (width, height);
        state.commands.push(DrawCommand::SetCssSize(width, height));
    }

    fn set_background(&self, color: &str) {
        self.record(DrawCommand::SetBackground(color.to_string()));
    }

    fn set_transform(&self, transform: Transform2d) {
        let mut state = self.state.borrow_mut();
        state.transform = transform;
        state.commands.push(DrawCommand::SetTransform(transform));
    }

    fn clear_rect(&self, x: f64, y: f64, width: f64, height: f64) {
        let region = Rect::new(x, y, width, height);
        let mut state = self.state.borrow_mut();
        state.marks.retain(|m| !region.contains_rect(&m.bounds()));
        state.commands.push(DrawCommand::ClearRect(region));
    }

    fn begin_path(&self) {
        let mut state = self.state.borrow_mut();
        state.path.clear();
        state.commands.push(DrawCommand::BeginPath);
    }

    fn move_to(&self, x: f64, y: f64) {
        let p = Point::new(x, y);
        let mut state = self.state.borrow_mut();
        state.path.push(PathSegment::MoveTo(p));
        state.commands.push(DrawCommand::MoveTo(p));
    }

    fn line_to(&self, x: f64, y: f64) {
        let p = Point::new(x, y);
        let mut state = self.state.borrow_mut();
        state.path.push(PathSegment::LineTo(p));
        state.commands.push(DrawCommand::LineTo(p));
    }

    fn arc(&self, x: f64, y: f64, radius: f64, _start_angle: f64, _end_angle: f64) {
        let center = Point::new(x, y);
        let mut state = self.state.borrow_mut();
        state.path.push(PathSegment::Arc(center, radius));
        state.commands.push(DrawCommand::Arc { center, radius });
    }

    fn rect(&self, x: f64, y: f64, width: f64, height: f64) {
        let r = Rect::new(x, y, width, height);
        let mut state = self.state.borrow_mut();
        state.path.push(PathSegment::Rect(r));
        state.commands.push(DrawCommand::Rect(r));
    }

    fn stroke(&self) {
        let mut state = self.state.borrow_mut();
        let color = state.stroke_style.clone();
        let width = state.line_width;
        let mut pen: Option<Point> = None;
        let mut new_marks = Vec::new();
        for segment in &state.path {
            match *segment {
                PathSegment::MoveTo(p) => pen = Some(p),
                PathSegment::LineTo(p) => {
                    if let Some(from) = pen {
                        new_marks.push(Mark::Line {
                            line: Line::new(from, p),
                            color: color.clone(),
                            width,
                        });
                    }
                    pen = Some(p);
                }
                PathSegment::Arc(center, radius) => new_marks.push(Mark::Arc {
                    center,
                    radius,
                    color: color.clone(),
                }),
                PathSegment::Rect(rect) => new_marks.push(Mark::Outline {
                    rect,
                    color: color.clone(),
                }),
            }
        }
        state.marks.extend(new_marks);
        state.commands.push(DrawCommand::Stroke);
    }

    fn fill(&self) {
        let mut state = self.state.borrow_mut();
        let color = state.fill_style.clone();
        let new_marks: Vec<Mark> = state
            .path
            .iter()
            .filter_map(|segment| match *segment {
                PathSegment::Arc(center, radius) => Some(Mark::Dot {
                    center,
                    radius,
                    color: color.clone(),
                }),
                PathSegment::Rect(rect) => Some(Mark::Block {
                    rect,
                    color: color.clone(),
                }),
                PathSegment::MoveTo(_) | PathSegment::LineTo(_) => None,
            })
            .collect();
        state.marks.extend(new_marks);
        state.commands.push(DrawCommand::Fill);
    }

    fn set_stroke_style(&self, color: &str) {
        let mut state = self.state.borrow_mut();
        state.stroke_style = color.to_string();
        state.commands.push(DrawCommand::SetStrokeStyle(color.to_string()));
    }

    fn set_fill_style(&self, color: &str) {
        let mut state = self.state.borrow_mut();
        state.fill_style = color.to_string();
        state.commands.push(DrawCommand::SetFillStyle(color.to_string()));
    }

    fn set_line_width(&self, width: f64) {
        let mut state = self.state.borrow_mut();
        state.line_width = width;
        state.commands.push(DrawCommand::SetLineWidth(width));
    }

    fn set_font(&self, font: &str) {
        self.record(DrawCommand::SetFont(font.to_string()));
    }

    fn fill_text(&self, text: &str, x: f64, y: f64) {
        let at = Point::new(x, y);
        let mut state = self.state.borrow_mut();
        let color = state.fill_style.clone();
        state.marks.push(Mark::Text {
            text: text.to_string(),
            at,
            color,
        });
        state.commands.push(DrawCommand::FillText(text.to_string(), at));
    }

    fn snapshot(&self) -> Option<PixelSnapshot> {
        let state = self.state.borrow();
        if state.pixel_width == 0 || state.pixel_height == 0 {
            return None;
        }
        let len = state.pixel_width as usize * state.pixel_height as usize * 4;
        Some(PixelSnapshot {
            width: state.pixel_width,
            height: state.pixel_height,
            data: vec![0; len],
        })
    }

    fn restore_snapshot(&self, _snapshot: &PixelSnapshot, dx: f64, dy: f64) {
        self.record(DrawCommand::PutImage { dx, dy });
    }

    fn composite_from(&self, source: &Self) {
        let copied = source.marks();
        let mut state = self.state.borrow_mut();
        state.marks.extend(copied);
        state
            .commands
            .push(DrawCommand::Composite(source.id().to_string()));
    }

    fn detach(&self) {
        let mut state = self.state.borrow_mut();
        state.detached = true;
        state.commands.push(DrawCommand::Detach);
    }
}

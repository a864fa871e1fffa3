//! # Canvas Sandbox Core
//!
//! Browser-independent building blocks for the canvas sandbox: geometry in
//! the centre-origin logical space, drawing options, the 2D [`Surface`]
//! contract with its drawing primitives, and the per-frame animation records.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                sandbox-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Geometry        │  Drawing                 │
//! │  - Point / Line  │  - Surface contract      │
//! │  - Pivot rotate  │  - Primitives            │
//! │  - Rect regions  │  - Recording surface     │
//! ├─────────────────────────────────────────────┤
//! │  Animation       │  Options                 │
//! │  - Grow / Move   │  - DrawOptions           │
//! │  - Rotate        │  - CanvasOptions         │
//! │  - Typewriter    │  - Colors                │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animate;
pub mod color;
pub mod draw;
pub mod error;
pub mod geometry;
pub mod options;
pub mod recording;
pub mod surface;

pub use animate::{
    GrowLine, GrowStep, MoveFrame, MoveLine, RotateFrame, RotateLines, Timeline, Typewriter,
    is_instant, FRAME_INTERVAL_MS, MOVE_CLEAR_MARGIN,
};
pub use color::Rgba;
pub use draw::{
    align_line, align_to_pixel_grid, clear_canvas, default_clear_region, draw_arc, draw_line,
    draw_point, draw_rect, draw_text,
};
pub use error::{CoreError, CoreResult};
pub use geometry::{rotate_point, Line, Point, Rect, RotateLine};
pub use options::{CanvasOptions, DrawOptions};
pub use recording::{DrawCommand, Mark, RecordingSurface};
pub use surface::{PixelSnapshot, Surface, Transform2d};

/// Sandbox core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! The opening animation: a point, a line growing out of it, four parallel
//! copies fanning out, and the copies swinging a quarter turn into a grid.

use sandbox_core::{DrawOptions, Line, Point, RotateLine};

use crate::{host::Host, Canvas2DRenderer};

/// Length of the first line.
pub const MAX_LINE_LENGTH: f64 = 300.0;
/// Spacing between the parallel lines.
pub const GAP: f64 = 100.0;
/// Duration of each step.
pub const STEP_DURATION_MS: f64 = 600.0;
/// Stroke color.
pub const LINE_COLOR: &str = "#006400";

/// Vertical offsets of the four parallel lines, in units of [`GAP`].
const GAP_FACTORS: [f64; 4] = [1.5, 0.5, -0.5, -1.5];

fn line_options() -> DrawOptions {
    DrawOptions::with_color(LINE_COLOR).line_width(1.0)
}

fn base_line(center: Point) -> Line {
    Line::new(
        Point::new(center.x - MAX_LINE_LENGTH / 2.0, center.y),
        Point::new(center.x + MAX_LINE_LENGTH / 2.0, center.y),
    )
}

/// Play the opening animation on `renderer`, resolving after the last step.
pub async fn first_screen_animation<H: Host + 'static>(renderer: &Canvas2DRenderer<H>) {
    let center = Point::origin();
    let options = line_options();
    let line = base_line(center);
    let gaps = GAP_FACTORS.map(|factor| factor * GAP);

    renderer.draw_point(center, &options);
    renderer
        .draw_animate_line(line.start, line.end, &options, STEP_DURATION_MS)
        .await;
    renderer.clear();

    tracing::debug!("Opening: fanning out parallel lines");
    renderer
        .move_lines(&[line; 4], &options, STEP_DURATION_MS, &gaps)
        .await;

    tracing::debug!("Opening: rotating into a grid");
    let rotating: Vec<RotateLine> = gaps
        .iter()
        .map(|gap| {
            let moved = line.translated_y(*gap);
            RotateLine::new(moved.start, moved.end).with_pivot(center)
        })
        .collect();
    renderer
        .rotate_lines(&rotating, &options, STEP_DURATION_MS, 90.0)
        .await;
}

//! Per-frame animation state.
//!
//! Each record holds everything an animation needs between frames and is
//! advanced by a `tick` method. Records never touch a surface; the backend
//! decides where the returned geometry is painted.

use crate::{draw::align_line, Line, Point, Rect, RotateLine};

/// Nominal frame interval used by the frame-step growth model (60 Hz).
pub const FRAME_INTERVAL_MS: f64 = 16.67;

/// Margin added around a moving line's dirty region.
pub const MOVE_CLEAR_MARGIN: f64 = 10.0;

/// Whether a duration leaves nothing to animate: zero, negative, NaN or infinite.
#[must_use]
pub fn is_instant(duration_ms: f64) -> bool {
    !duration_ms.is_finite() || duration_ms <= 0.0
}

/// Linear time progress between a start timestamp and a duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    start: f64,
    duration: f64,
}

impl Timeline {
    /// Create a timeline starting at `start` (milliseconds).
    #[must_use]
    pub const fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    /// Progress at `now`, clamped to `[0, 1]`. Instant durations are
    /// always complete.
    #[must_use]
    pub fn progress(&self, now: f64) -> f64 {
        if is_instant(self.duration) {
            return 1.0;
        }
        ((now - self.start) / self.duration).clamp(0.0, 1.0)
    }

    /// Whether the timeline has reached its end at `now`.
    #[must_use]
    pub fn is_finished(&self, now: f64) -> bool {
        self.progress(now) >= 1.0
    }
}

/// What a [`GrowLine`] wants painted this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrowStep {
    /// Partial line for the animation layer, already snapped to the grid.
    Partial(Line),
    /// Growth is done; the full line should be committed.
    Complete(Line),
}

/// Symmetric growth of a line out of its midpoint.
///
/// Growth advances by a fixed step per frame rather than by elapsed time:
/// `step = length / (duration / 16.67)`, and the animation ends once the
/// accumulated length reaches half the total.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowLine {
    line: Line,
    step: f64,
    current_length: f64,
}

impl GrowLine {
    /// Prepare growth of `line` over roughly `duration_ms`.
    #[must_use]
    pub fn new(line: Line, duration_ms: f64) -> Self {
        let frames = duration_ms / FRAME_INTERVAL_MS;
        let total = line.length();
        let step = if frames > 0.0 { total / frames } else { total };
        Self {
            line,
            step,
            current_length: 0.0,
        }
    }

    /// Per-frame length increment.
    #[must_use]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Advance one frame.
    pub fn tick(&mut self) -> GrowStep {
        let half = self.line.length() / 2.0;
        if self.current_length >= half {
            return GrowStep::Complete(self.line);
        }
        let progress = (self.current_length / half).clamp(0.0, 1.0);
        let mid = self.line.midpoint();
        let partial = Line::new(
            mid.lerp(self.line.start, progress),
            mid.lerp(self.line.end, progress),
        );
        self.current_length += self.step;
        GrowStep::Partial(align_line(partial))
    }
}

/// One frame of a [`MoveLine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveFrame {
    /// Region of the animation layer to clear before painting.
    pub clear: Rect,
    /// Line position for this frame.
    pub line: Line,
    /// Whether this is the last frame.
    pub finished: bool,
}

/// Linear vertical translation of a line by `gap`.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveLine {
    line: Line,
    gap: f64,
    timeline: Timeline,
    last_offset: f64,
}

impl MoveLine {
    /// Prepare moving `line` by `gap` along `timeline`.
    #[must_use]
    pub const fn new(line: Line, gap: f64, timeline: Timeline) -> Self {
        Self {
            line,
            gap,
            timeline,
            last_offset: 0.0,
        }
    }

    /// Advance to `now`.
    ///
    /// The dirty region covers the previous and the current position so the
    /// stale copy is erased without touching the rest of the layer.
    pub fn tick(&mut self, now: f64) -> MoveFrame {
        let progress = self.timeline.progress(now);
        let offset = self.gap * progress;
        let previous = self.line.translated_y(self.last_offset);
        let current = self.line.translated_y(offset);
        self.last_offset = offset;
        MoveFrame {
            clear: previous
                .bounds()
                .union(&current.bounds())
                .inflate(MOVE_CLEAR_MARGIN),
            line: current,
            finished: progress >= 1.0,
        }
    }

    /// Geometry after the full translation.
    #[must_use]
    pub fn final_line(&self) -> Line {
        self.line.translated_y(self.gap)
    }
}

/// One frame of a [`RotateLines`].
#[derive(Debug, Clone, PartialEq)]
pub struct RotateFrame {
    /// Line positions for this frame.
    pub lines: Vec<Line>,
    /// Whether this is the last frame.
    pub finished: bool,
}

/// Linear rotation of one or more lines, each about its own pivot.
#[derive(Debug, Clone, PartialEq)]
pub struct RotateLines {
    lines: Vec<RotateLine>,
    angle: f64,
    timeline: Timeline,
}

impl RotateLines {
    /// Prepare rotating `lines` by `angle_degrees` (counter-clockwise in the
    /// Y-up space) along `timeline`.
    #[must_use]
    pub fn new(lines: Vec<RotateLine>, angle_degrees: f64, timeline: Timeline) -> Self {
        Self {
            lines,
            angle: angle_degrees.to_radians(),
            timeline,
        }
    }

    /// Advance to `now`.
    #[must_use]
    pub fn tick(&self, now: f64) -> RotateFrame {
        let progress = self.timeline.progress(now);
        RotateFrame {
            lines: self.at_angle(self.angle * progress),
            finished: progress >= 1.0,
        }
    }

    /// Geometry after the full rotation.
    #[must_use]
    pub fn final_lines(&self) -> Vec<Line> {
        self.at_angle(self.angle)
    }

    fn at_angle(&self, angle: f64) -> Vec<Line> {
        self.lines.iter().map(|l| l.rotated(angle)).collect()
    }
}

/// Character-by-character text reveal.
#[derive(Debug, Clone, PartialEq)]
pub struct Typewriter {
    text: String,
    position: Point,
    revealed: usize,
}

impl Typewriter {
    /// Prepare revealing `text` at `position`.
    #[must_use]
    pub fn new(text: impl Into<String>, position: Point) -> Self {
        Self {
            text: text.into(),
            position,
            revealed: 0,
        }
    }

    /// Baseline position of the text.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Reveal one more character and return the visible prefix, or `None`
    /// once the whole text is visible.
    pub fn tick(&mut self) -> Option<&str> {
        let next = self.text.get(self.revealed..)?.chars().next()?;
        self.revealed += next.len_utf8();
        self.text.get(..self.revealed)
    }

    /// Whether every character has been revealed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.revealed >= self.text.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_line(a: Line, b: Line) -> bool {
        [
            (a.start.x, b.start.x),
            (a.start.y, b.start.y),
            (a.end.x, b.end.x),
            (a.end.y, b.end.y),
        ]
        .iter()
        .all(|(x, y)| (x - y).abs() < 1e-6)
    }

    // ===== Timeline Tests =====

    #[test]
    fn timeline_clamps() {
        let t = Timeline::new(100.0, 200.0);
        assert!(t.progress(50.0).abs() < EPSILON);
        assert!((t.progress(200.0) - 0.5).abs() < EPSILON);
        assert!((t.progress(1000.0) - 1.0).abs() < EPSILON);
        assert!(t.is_finished(300.0));
    }

    #[test]
    fn zero_duration_timeline_is_complete() {
        assert!(Timeline::new(0.0, 0.0).is_finished(0.0));
        assert!(Timeline::new(0.0, -5.0).is_finished(0.0));
    }

    #[test]
    fn non_finite_duration_timeline_is_complete() {
        assert!(Timeline::new(0.0, f64::NAN).is_finished(0.0));
        assert!(Timeline::new(0.0, f64::INFINITY).is_finished(0.0));
        assert!((Timeline::new(0.0, f64::NAN).progress(0.0) - 1.0).abs() < EPSILON);
        assert!(is_instant(0.0) && is_instant(f64::NAN) && !is_instant(600.0));
    }

    // ===== GrowLine Tests =====

    #[test]
    fn grow_line_starts_at_midpoint_and_completes() {
        let line = Line::new(Point::new(-150.0, 0.0), Point::new(150.0, 0.0));
        let mut grow = GrowLine::new(line, 600.0);
        assert!((grow.step() - 300.0 / (600.0 / FRAME_INTERVAL_MS)).abs() < EPSILON);

        let GrowStep::Partial(first) = grow.tick() else {
            panic!("first frame should be partial");
        };
        assert_eq!(first, Line::new(Point::new(0.5, 0.5), Point::new(0.5, 0.5)));

        let mut frames = 1;
        loop {
            match grow.tick() {
                GrowStep::Partial(partial) => {
                    assert!(partial.length() <= 301.0);
                    frames += 1;
                }
                GrowStep::Complete(full) => {
                    assert_eq!(full, line);
                    break;
                }
            }
        }
        // Half the length at one step per frame.
        assert_eq!(frames, 18);
    }

    #[test]
    fn grow_line_degenerate_completes_immediately() {
        let p = Point::new(3.0, 3.0);
        let mut grow = GrowLine::new(Line::new(p, p), 600.0);
        assert_eq!(grow.tick(), GrowStep::Complete(Line::new(p, p)));
    }

    // ===== MoveLine Tests =====

    #[test]
    fn move_line_halfway_and_final() {
        let line = Line::new(Point::new(-50.0, 0.0), Point::new(50.0, 0.0));
        let mut mv = MoveLine::new(line, 200.0, Timeline::new(0.0, 600.0));

        let half = mv.tick(300.0);
        assert!(!half.finished);
        assert!(approx_line(
            half.line,
            Line::new(Point::new(-50.0, 100.0), Point::new(50.0, 100.0))
        ));
        assert!(half.clear.contains_rect(&line.bounds()));
        assert!(half.clear.contains_rect(&half.line.bounds()));

        let last = mv.tick(600.0);
        assert!(last.finished);
        assert!(approx_line(last.line, mv.final_line()));
        assert!(last.clear.contains_rect(&half.line.bounds()));
    }

    #[test]
    fn move_line_negative_gap_clears_both_positions() {
        let line = Line::new(Point::new(-10.0, 0.0), Point::new(10.0, 0.0));
        let mut mv = MoveLine::new(line, -150.0, Timeline::new(0.0, 100.0));
        let first = mv.tick(50.0);
        let second = mv.tick(100.0);
        assert!(second.clear.contains_rect(&first.line.bounds()));
        assert!(second.clear.contains_rect(&second.line.bounds()));
        assert!((second.line.start.y + 150.0).abs() < EPSILON);
    }

    // ===== RotateLines Tests =====

    #[test]
    fn rotate_quarter_turn_about_midpoint() {
        let line = RotateLine::new(Point::new(-150.0, 0.0), Point::new(150.0, 0.0));
        let rot = RotateLines::new(vec![line], 90.0, Timeline::new(0.0, 600.0));
        let end = rot.tick(600.0);
        assert!(end.finished);
        assert!(approx_line(
            end.lines[0],
            Line::new(Point::new(0.0, -150.0), Point::new(0.0, 150.0))
        ));
        assert_eq!(rot.final_lines().len(), 1);
    }

    #[test]
    fn rotate_uses_explicit_pivot() {
        let line = RotateLine::new(Point::new(-150.0, 100.0), Point::new(150.0, 100.0))
            .with_pivot(Point::origin());
        let rot = RotateLines::new(vec![line], 90.0, Timeline::new(0.0, 10.0));
        let lines = rot.final_lines();
        assert!(approx_line(
            lines[0],
            Line::new(Point::new(-100.0, -150.0), Point::new(-100.0, 150.0))
        ));
    }

    #[test]
    fn rotate_halfway_is_partial() {
        let line = RotateLine::new(Point::new(-1.0, 0.0), Point::new(1.0, 0.0));
        let rot = RotateLines::new(vec![line], 90.0, Timeline::new(0.0, 100.0));
        let frame = rot.tick(50.0);
        assert!(!frame.finished);
        let angle = frame.lines[0].end.y.atan2(frame.lines[0].end.x);
        assert!((angle - std::f64::consts::FRAC_PI_4).abs() < 1e-9);
    }

    // ===== Typewriter Tests =====

    #[test]
    fn typewriter_reveals_prefixes() {
        let mut tw = Typewriter::new("héllo", Point::origin());
        let mut seen = Vec::new();
        while let Some(prefix) = tw.tick() {
            seen.push(prefix.to_string());
        }
        assert_eq!(seen, vec!["h", "hé", "hél", "héll", "héllo"]);
        assert!(tw.is_finished());
    }

    #[test]
    fn typewriter_empty_text_is_finished() {
        let mut tw = Typewriter::new("", Point::origin());
        assert!(tw.is_finished());
        assert!(tw.tick().is_none());
    }
}

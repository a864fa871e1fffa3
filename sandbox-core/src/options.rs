//! Drawing and canvas configuration.

use serde::{Deserialize, Serialize};

use crate::CoreResult;

/// Default stroke and fill color.
pub const DEFAULT_COLOR: &str = "black";
/// Default stroke width and point radius.
pub const DEFAULT_LINE_WIDTH: f64 = 1.0;
/// Default font family for text.
pub const DEFAULT_FONT: &str = "Arial";
/// Default font size in CSS pixels.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Style options for drawing primitives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrawOptions {
    /// Stroke and fill color (CSS color string).
    pub color: Option<String>,
    /// Stroke width, also used as the radius of points.
    pub line_width: Option<f64>,
    /// Fill color for closed shapes.
    pub fill_color: Option<String>,
    /// Font family for text.
    pub font: Option<String>,
    /// Font size in CSS pixels.
    pub font_size: Option<f64>,
}

impl DrawOptions {
    /// Options with only a color set.
    #[must_use]
    pub fn with_color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }

    /// Set the line width.
    #[must_use]
    pub fn line_width(mut self, width: f64) -> Self {
        self.line_width = Some(width);
        self
    }

    /// Parse options from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Effective color.
    #[must_use]
    pub fn color(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_COLOR)
    }

    /// Effective stroke width. Zero or negative widths fall back to the default.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.line_width
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_LINE_WIDTH)
    }

    /// Effective fill color for closed shapes, if any.
    #[must_use]
    pub fn fill(&self) -> Option<&str> {
        self.fill_color.as_deref()
    }

    /// CSS font shorthand, e.g. `16px Arial`.
    #[must_use]
    pub fn css_font(&self) -> String {
        let size = self
            .font_size
            .filter(|s| *s > 0.0)
            .unwrap_or(DEFAULT_FONT_SIZE);
        let family = self.font.as_deref().unwrap_or(DEFAULT_FONT);
        format!("{size}px {family}")
    }
}

/// Sizing and behaviour options for a backend's surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasOptions {
    /// Explicit CSS width; the container width is used when absent.
    pub width: Option<f64>,
    /// Explicit CSS height; the container height is used when absent.
    pub height: Option<f64>,
    /// Background color of the visible surface.
    pub background_color: Option<String>,
    /// Follow container size changes.
    pub responsive: bool,
}

impl Default for CanvasOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            background_color: None,
            responsive: true,
        }
    }
}

impl CanvasOptions {
    /// Options with a fixed size.
    #[must_use]
    pub fn fixed(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Parse options from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve the CSS size, preferring explicit positive overrides.
    #[must_use]
    pub fn resolve_size(&self, container: (f64, f64)) -> (f64, f64) {
        let pick = |explicit: Option<f64>, measured: f64| {
            explicit.filter(|v| *v > 0.0).unwrap_or(measured).max(0.0)
        };
        (pick(self.width, container.0), pick(self.height, container.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_options_defaults() {
        let opts = DrawOptions::default();
        assert_eq!(opts.color(), "black");
        assert!((opts.width() - 1.0).abs() < f64::EPSILON);
        assert_eq!(opts.css_font(), "16px Arial");
        assert!(opts.fill().is_none());
    }

    #[test]
    fn zero_line_width_falls_back() {
        let opts = DrawOptions::default().line_width(0.0);
        assert!((opts.width() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn draw_options_from_camel_case_json() {
        let opts = DrawOptions::from_json(r#"{"color":"green","lineWidth":3,"fontSize":24}"#)
            .unwrap();
        assert_eq!(opts.color(), "green");
        assert!((opts.width() - 3.0).abs() < f64::EPSILON);
        assert_eq!(opts.css_font(), "24px Arial");
    }

    #[test]
    fn canvas_options_default_is_responsive() {
        let opts = CanvasOptions::from_json("{}").unwrap();
        assert!(opts.responsive);
        assert_eq!(opts.resolve_size((640.0, 480.0)), (640.0, 480.0));
    }

    #[test]
    fn canvas_options_overrides_container() {
        let opts = CanvasOptions::fixed(300.0, 0.0);
        assert_eq!(opts.resolve_size((640.0, 480.0)), (300.0, 480.0));
    }

    #[test]
    fn malformed_options_are_rejected() {
        assert!(CanvasOptions::from_json("{ nope").is_err());
    }
}

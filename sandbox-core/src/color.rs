//! CSS color parsing for backends that need numeric colors.

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// A linear RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Rgba {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a color from components.
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Components as an array.
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa` or a basic named color.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Color`] for anything else.
    pub fn parse(css: &str) -> CoreResult<Self> {
        let value = css.trim().to_ascii_lowercase();
        if let Some(hex) = value.strip_prefix('#') {
            return Self::parse_hex(hex).ok_or_else(|| CoreError::Color(css.to_string()));
        }
        let named = match value.as_str() {
            "black" => "000000",
            "white" => "ffffff",
            "red" => "ff0000",
            "green" => "008000",
            "lime" => "00ff00",
            "blue" => "0000ff",
            "yellow" => "ffff00",
            "cyan" | "aqua" => "00ffff",
            "magenta" | "fuchsia" => "ff00ff",
            "gray" | "grey" => "808080",
            "orange" => "ffa500",
            "purple" => "800080",
            "darkgreen" => "006400",
            "transparent" => return Ok(Self::TRANSPARENT),
            _ => return Err(CoreError::Color(css.to_string())),
        };
        Self::parse_hex(named).ok_or_else(|| CoreError::Color(css.to_string()))
    }

    /// Parse a color, falling back to `fallback` and logging when unsupported.
    #[must_use]
    pub fn parse_or(css: &str, fallback: Self) -> Self {
        Self::parse(css).unwrap_or_else(|err| {
            tracing::debug!("{err}, using fallback");
            fallback
        })
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| f32::from(v) / 255.0);
        match hex.len() {
            3 => {
                let mut out = [0.0f32; 3];
                for (slot, c) in out.iter_mut().zip(hex.chars()) {
                    let digit = c.to_digit(16)?;
                    #[allow(clippy::cast_precision_loss)]
                    let v = (digit * 17) as f32 / 255.0;
                    *slot = v;
                }
                Some(Self::new(out[0], out[1], out[2], 1.0))
            }
            6 | 8 => {
                let r = channel(hex.get(0..2)?)?;
                let g = channel(hex.get(2..4)?)?;
                let b = channel(hex.get(4..6)?)?;
                let a = if hex.len() == 8 {
                    channel(hex.get(6..8)?)?
                } else {
                    1.0
                };
                Some(Self::new(r, g, b, a))
            }
            _ => None,
        }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

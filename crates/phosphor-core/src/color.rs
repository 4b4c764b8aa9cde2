//! Color values and color string parsing
//!
//! Colors arrive from the host UI (or config file) as strings. They are
//! normalized to floating point channels in `[0, 1]` before reaching the
//! rasterizer or the GPU.

use thiserror::Error;

/// RGBA color as floats (0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Create a new opaque color
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a new color with alpha
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create from 8-bit components
    pub fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Quantize to 8-bit RGBA
    pub fn to_u8(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Channels as an array, the layout uniform buffers expect
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Same color with every channel clamped into `[0, 1]`
    ///
    /// Non-finite channels become 0.
    pub fn normalized(self) -> Self {
        let n = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Self::rgba(n(self.r), n(self.g), n(self.b), n(self.a))
    }

    /// Same color with a different alpha
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ColorParseError {
    #[error("invalid hex color: {0}")]
    InvalidHex(String),

    #[error("invalid rgb() color: {0}")]
    InvalidRgb(String),

    #[error("unknown color: {0}")]
    Unknown(String),
}

/// Parse a color string: `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(..)`, `rgba(..)`
/// or a CSS color name.
pub fn parse_color(value: &str) -> Result<Color, ColorParseError> {
    let value = value.trim();

    if value.starts_with('#') {
        parse_hex_color(value)
    } else if value.starts_with("rgb") {
        parse_rgb_color(value)
    } else {
        parse_named_color(value).ok_or_else(|| ColorParseError::Unknown(value.to_string()))
    }
}

/// Parse a color, falling back to opaque black when the input is malformed
pub fn parse_color_or_black(value: &str) -> Color {
    match parse_color(value) {
        Ok(color) => color,
        Err(e) => {
            log::warn!("{}, using opaque black", e);
            Color::BLACK
        }
    }
}

/// Parse a hex color (#rgb, #rrggbb, #rrggbbaa)
pub fn parse_hex_color(hex: &str) -> Result<Color, ColorParseError> {
    let digits = hex.trim().trim_start_matches('#');
    let invalid = || ColorParseError::InvalidHex(hex.to_string());

    if !digits.is_ascii() {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

    match digits.len() {
        3 => {
            let r = channel(&digits[0..1].repeat(2))?;
            let g = channel(&digits[1..2].repeat(2))?;
            let b = channel(&digits[2..3].repeat(2))?;
            Ok(Color::from_u8(r, g, b, 255))
        }
        6 | 8 => {
            let r = channel(&digits[0..2])?;
            let g = channel(&digits[2..4])?;
            let b = channel(&digits[4..6])?;
            let a = if digits.len() == 8 {
                channel(&digits[6..8])?
            } else {
                255
            };
            Ok(Color::from_u8(r, g, b, a))
        }
        _ => Err(invalid()),
    }
}

/// Parse rgb(r, g, b) or rgba(r, g, b, a)
///
/// Channels above 1.0 are read as 0-255 values.
pub fn parse_rgb_color(input: &str) -> Result<Color, ColorParseError> {
    let input = input.trim();
    let invalid = || ColorParseError::InvalidRgb(input.to_string());

    let (is_rgba, inner) = if let Some(inner) = input.strip_prefix("rgba(") {
        (true, inner.strip_suffix(')').ok_or_else(invalid)?)
    } else if let Some(inner) = input.strip_prefix("rgb(") {
        (false, inner.strip_suffix(')').ok_or_else(invalid)?)
    } else {
        return Err(invalid());
    };

    let parts: Vec<f32> = inner
        .split(',')
        .map(|s| s.trim().parse::<f32>().map_err(|_| invalid()))
        .collect::<Result<_, _>>()?;

    let expected = if is_rgba { 4 } else { 3 };
    if parts.len() != expected || parts.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(invalid());
    }

    let norm = |v: f32| if v > 1.0 { v / 255.0 } else { v };
    let a = if is_rgba { parts[3].min(1.0) } else { 1.0 };

    Ok(Color::rgba(norm(parts[0]), norm(parts[1]), norm(parts[2]), a).normalized())
}

/// Parse CSS named colors
fn parse_named_color(name: &str) -> Option<Color> {
    let (r, g, b) = match name.to_lowercase().as_str() {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "lime" => (0, 255, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "cyan" | "aqua" => (0, 255, 255),
        "magenta" | "fuchsia" => (255, 0, 255),
        "orange" => (255, 165, 0),
        "amber" => (255, 191, 0),
        "gold" => (255, 215, 0),
        "pink" => (255, 192, 203),
        "hotpink" => (255, 105, 180),
        "purple" => (128, 0, 128),
        "gray" | "grey" => (128, 128, 128),
        "silver" => (192, 192, 192),
        "navy" => (0, 0, 128),
        "teal" => (0, 128, 128),
        "transparent" => return Some(Color::TRANSPARENT),
        _ => return None,
    };
    Some(Color::from_u8(r, g, b, 255))
}

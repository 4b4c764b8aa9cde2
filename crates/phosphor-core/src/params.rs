//! Effect, text and animation parameters
//!
//! These are the values the host UI supplies. Every frame reads the latest
//! copy through a [`crate::ParamSnapshot`]; nothing here is cached by the
//! renderer between frames.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// How alpha is produced when the text texture is rasterized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TransparencyMode {
    /// Opaque background fill, colored glyphs
    #[default]
    Normal,
    /// Opaque background fill, glyphs punched out as holes
    TransparentText,
    /// Cleared background, colored glyphs
    TransparentBackground,
}

impl TransparencyMode {
    /// Whether the frame clear (and the rasterizer fill) is fully transparent
    pub fn clears_background(self) -> bool {
        matches!(self, Self::TransparentBackground)
    }
}

pub const DISTORTION_RANGE: RangeInclusive<f32> = 0.0..=5.0;
pub const ZOOM_RANGE: RangeInclusive<f32> = 0.5..=10.0;
pub const NOISE_RANGE: RangeInclusive<f32> = 0.0..=0.2;
pub const SCANLINE_INTENSITY_RANGE: RangeInclusive<f32> = 0.0..=0.5;
pub const BLUR_RANGE: RangeInclusive<f32> = 0.0..=5.0;
pub const GLITCH_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const FONT_SIZE_RANGE: RangeInclusive<f32> = 20.0..=200.0;
pub const LINE_SPACING_RANGE: RangeInclusive<f32> = 0.8..=2.0;

/// Scanline frequency multiplier applied to the live target height
pub const SCANLINE_FREQUENCY_PER_PIXEL: f32 = 1.5;

/// Scanline frequency for a render target of the given height
pub fn scanline_frequency(target_height: u32) -> f32 {
    target_height as f32 * SCANLINE_FREQUENCY_PER_PIXEL
}

/// Clamp `value` into `range`, replacing non-finite input with `fallback`
fn sanitize(name: &str, value: f32, range: &RangeInclusive<f32>, fallback: f32) -> f32 {
    if !value.is_finite() {
        log::warn!("{} is not finite ({}), using {}", name, value, fallback);
        return fallback;
    }
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        log::warn!(
            "{} = {} outside {:?}, clamped to {}",
            name,
            value,
            range,
            clamped
        );
    }
    clamped
}

/// Per-frame shader parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParameters {
    /// Barrel distortion strength
    pub distortion: f32,
    /// Zoom applied around the screen center before distortion
    pub zoom: f32,
    /// Peak-to-peak amplitude of per-pixel noise
    pub noise_amount: f32,
    /// Brightness subtracted at scanline peaks
    pub scanline_intensity: f32,
    /// Box blur radius in texels (0 disables blur)
    pub blur_amount: f32,
    /// Probability scale for glitched rows (0 disables glitch)
    pub glitch_intensity: f32,
    pub background_color: Color,
    pub transparency: TransparencyMode,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            distortion: 0.25,
            zoom: 1.0,
            noise_amount: 0.05,
            scanline_intensity: 0.15,
            blur_amount: 0.0,
            glitch_intensity: 0.0,
            background_color: Color::rgb(0.02, 0.05, 0.02),
            transparency: TransparencyMode::Normal,
        }
    }
}

impl EffectParameters {
    /// Copy with every field forced into its valid range
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        Self {
            distortion: sanitize("distortion", self.distortion, &DISTORTION_RANGE, d.distortion),
            zoom: sanitize("zoom", self.zoom, &ZOOM_RANGE, d.zoom),
            noise_amount: sanitize("noise", self.noise_amount, &NOISE_RANGE, d.noise_amount),
            scanline_intensity: sanitize(
                "scanline_intensity",
                self.scanline_intensity,
                &SCANLINE_INTENSITY_RANGE,
                d.scanline_intensity,
            ),
            blur_amount: sanitize("blur", self.blur_amount, &BLUR_RANGE, d.blur_amount),
            glitch_intensity: sanitize(
                "glitch",
                self.glitch_intensity,
                &GLITCH_RANGE,
                d.glitch_intensity,
            ),
            background_color: self.background_color.normalized(),
            transparency: self.transparency,
        }
    }

    /// Color the render target is cleared to before the draw
    pub fn clear_color(&self) -> Color {
        if self.transparency.clears_background() {
            Color::TRANSPARENT
        } else {
            self.background_color.normalized().with_alpha(1.0)
        }
    }
}

/// Text content and styling for the rasterizer
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// Text to draw; may contain explicit line breaks
    pub content: String,
    pub font_size_px: f32,
    pub line_spacing: f32,
    pub font_color: Color,
    pub background_color: Color,
    pub transparency: TransparencyMode,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            content: "HELLO WORLD".to_string(),
            font_size_px: 48.0,
            line_spacing: 1.2,
            font_color: Color::rgb(0.2, 1.0, 0.4),
            background_color: EffectParameters::default().background_color,
            transparency: TransparencyMode::Normal,
        }
    }
}

impl TextStyle {
    /// Copy with size and spacing forced into range and colors normalized
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        Self {
            content: self.content.clone(),
            font_size_px: sanitize("font_size", self.font_size_px, &FONT_SIZE_RANGE, d.font_size_px),
            line_spacing: sanitize(
                "line_spacing",
                self.line_spacing,
                &LINE_SPACING_RANGE,
                d.line_spacing,
            ),
            font_color: self.font_color.normalized(),
            background_color: self.background_color.normalized(),
            transparency: self.transparency,
        }
    }

    /// Same style with different content
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }

    /// Distance between consecutive baselines
    pub fn line_height(&self) -> f32 {
        self.font_size_px * self.line_spacing
    }
}

/// Animated export settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationSettings {
    /// Reveal text word by word instead of animating only the effects
    pub typing_enabled: bool,
    /// How long each intermediate prefix stays on screen
    pub typing_frame_duration_ms: u32,
    /// How long the final, complete text stays on screen
    pub typing_end_pause_ms: u32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            typing_enabled: false,
            typing_frame_duration_ms: 500,
            typing_end_pause_ms: 1500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps_ranges() {
        let params = EffectParameters {
            distortion: 9.0,
            zoom: 0.1,
            noise_amount: -1.0,
            glitch_intensity: f32::INFINITY,
            ..Default::default()
        };
        let s = params.sanitized();
        assert_eq!(s.distortion, 5.0);
        assert_eq!(s.zoom, 0.5);
        assert_eq!(s.noise_amount, 0.0);
        assert_eq!(s.glitch_intensity, EffectParameters::default().glitch_intensity);
    }

    #[test]
    fn test_text_style_sanitize() {
        let style = TextStyle {
            font_size_px: 500.0,
            line_spacing: f32::NAN,
            ..Default::default()
        };
        let s = style.sanitized();
        assert_eq!(s.font_size_px, 200.0);
        assert_eq!(s.line_spacing, TextStyle::default().line_spacing);
    }

    #[test]
    fn test_clear_color_follows_transparency() {
        let mut params = EffectParameters {
            background_color: Color::rgb(0.1, 0.2, 0.3),
            ..Default::default()
        };
        assert_eq!(params.clear_color(), Color::rgb(0.1, 0.2, 0.3));

        params.transparency = TransparencyMode::TransparentText;
        assert_eq!(params.clear_color().a, 1.0);

        params.transparency = TransparencyMode::TransparentBackground;
        assert_eq!(params.clear_color(), Color::TRANSPARENT);
    }

    #[test]
    fn test_scanline_frequency_tracks_height() {
        assert_eq!(scanline_frequency(512), 768.0);
        assert_eq!(scanline_frequency(100), 150.0);
    }

    #[test]
    fn test_line_height() {
        let style = TextStyle {
            font_size_px: 40.0,
            line_spacing: 1.5,
            ..Default::default()
        };
        assert_eq!(style.line_height(), 60.0);
    }
}

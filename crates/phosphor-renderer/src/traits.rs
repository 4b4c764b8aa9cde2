//! Renderer trait abstractions
//!
//! Font access and frame rendering sit behind traits so the rasterizer and
//! the export pipeline can run against mocks or the CPU renderer in tests,
//! without a GPU context or system fonts.

use image::RgbaImage;
use phosphor_core::EffectParameters;

use crate::bitmap::TextureBitmap;
use crate::error::RenderError;

/// Vertical font metrics at a given pixel size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    /// Distance from baseline to the top of the em box (positive)
    pub ascent: f32,
    /// Distance from baseline to the bottom of the em box (negative)
    pub descent: f32,
}

impl LineMetrics {
    /// Offset from the vertical middle of the em box down to the baseline
    pub fn middle_to_baseline(&self) -> f32 {
        (self.ascent + self.descent) / 2.0
    }
}

/// Coverage bitmap of a single glyph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    /// Left edge relative to the pen position
    pub xmin: i32,
    /// Bottom edge relative to the baseline, positive upward
    pub ymin: i32,
    /// Coverage values, row-major, top row first
    pub coverage: Vec<u8>,
}

impl GlyphBitmap {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Source of glyph metrics and glyph coverage
pub trait GlyphSource {
    /// Horizontal advance of `ch` at `px`
    fn advance(&self, ch: char, px: f32) -> f32;

    /// Ascent and descent at `px`
    fn line_metrics(&self, px: f32) -> LineMetrics;

    /// Rasterize `ch` at `px`
    fn rasterize(&self, ch: char, px: f32) -> Result<GlyphBitmap, RenderError>;

    /// Rendered width of `text` on one line
    fn measure(&self, text: &str, px: f32) -> f32 {
        text.chars().map(|ch| self.advance(ch, px)).sum()
    }
}

/// Outcome of a single draw request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The render target was overwritten
    Drawn,
    /// Required state was not ready; nothing was drawn
    Skipped,
}

/// Draws the effect pipeline over an uploaded text texture
///
/// Implementors own the render target. `read_pixels` returns the result of
/// the most recent completed `render_frame`.
pub trait FrameRenderer {
    /// Render target size in pixels
    fn size(&self) -> (u32, u32);

    /// Replace the source texture with the contents of `bitmap`
    fn upload_texture(&mut self, bitmap: &TextureBitmap) -> Result<(), RenderError>;

    /// Draw one frame at `time_seconds` using `params` as they are right now
    fn render_frame(
        &mut self,
        params: &EffectParameters,
        time_seconds: f32,
    ) -> Result<FrameStatus, RenderError>;

    /// Copy the render target back to the host
    fn read_pixels(&mut self) -> Result<RgbaImage, RenderError>;
}

impl<R: FrameRenderer + ?Sized> FrameRenderer for Box<R> {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn upload_texture(&mut self, bitmap: &TextureBitmap) -> Result<(), RenderError> {
        (**self).upload_texture(bitmap)
    }

    fn render_frame(
        &mut self,
        params: &EffectParameters,
        time_seconds: f32,
    ) -> Result<FrameStatus, RenderError> {
        (**self).render_frame(params, time_seconds)
    }

    fn read_pixels(&mut self) -> Result<RgbaImage, RenderError> {
        (**self).read_pixels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_to_baseline() {
        let metrics = LineMetrics {
            ascent: 40.0,
            descent: -10.0,
        };
        assert_eq!(metrics.middle_to_baseline(), 15.0);
    }

    #[test]
    fn test_glyph_bitmap_empty() {
        assert!(GlyphBitmap::default().is_empty());
        let glyph = GlyphBitmap {
            width: 2,
            height: 1,
            coverage: vec![255, 255],
            ..Default::default()
        };
        assert!(!glyph.is_empty());
    }
}

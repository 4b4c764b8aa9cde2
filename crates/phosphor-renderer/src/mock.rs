//! Mock glyph source and renderer for testing
//!
//! `MockGlyphSource` produces fixed-proportion block glyphs so layout can be
//! asserted exactly. `RecordingRenderer` implements [`FrameRenderer`] and
//! records every call, without requiring a GPU context.

use image::RgbaImage;
use phosphor_core::EffectParameters;

use crate::bitmap::TextureBitmap;
use crate::error::RenderError;
use crate::traits::*;

/// Glyph source with metrics proportional to the pixel size
///
/// Every non-space character is a solid block `0.5 * px` wide and
/// `0.7 * px` tall sitting on the baseline, advancing `0.6 * px`.
#[derive(Debug, Clone, Default)]
pub struct MockGlyphSource {
    /// Character whose rasterization fails, for error-path tests
    pub failing_char: Option<char>,
}

impl MockGlyphSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that fails to rasterize `ch`
    pub fn failing_on(ch: char) -> Self {
        Self {
            failing_char: Some(ch),
        }
    }
}

impl GlyphSource for MockGlyphSource {
    fn advance(&self, _ch: char, px: f32) -> f32 {
        px * 0.6
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        LineMetrics {
            ascent: px * 0.8,
            descent: -px * 0.2,
        }
    }

    fn rasterize(&self, ch: char, px: f32) -> Result<GlyphBitmap, RenderError> {
        if self.failing_char == Some(ch) {
            return Err(RenderError::rasterize(format!("mock glyph '{}'", ch)));
        }
        if ch.is_whitespace() {
            return Ok(GlyphBitmap::default());
        }

        let width = (px * 0.5).round().max(1.0) as usize;
        let height = (px * 0.7).round().max(1.0) as usize;
        Ok(GlyphBitmap {
            width,
            height,
            xmin: (px * 0.05).round() as i32,
            ymin: 0,
            coverage: vec![255; width * height],
        })
    }
}

/// Record of a renderer call for test inspection
#[derive(Debug, Clone)]
pub enum RenderCall {
    /// A bitmap was uploaded
    Upload(RgbaImage),
    /// A frame was drawn
    Render { time: f32, params: EffectParameters },
    /// Pixels were read back
    Read,
}

/// Renderer that records calls and echoes the last upload on readback
#[derive(Debug)]
pub struct RecordingRenderer {
    width: u32,
    height: u32,
    /// All calls made to this renderer
    pub calls: Vec<RenderCall>,
    last_upload: Option<RgbaImage>,
    has_frame: bool,
}

impl RecordingRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            calls: Vec::new(),
            last_upload: None,
            has_frame: false,
        }
    }

    /// Clear all recorded calls
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    // === Assertion helpers ===

    /// Number of frames drawn
    pub fn render_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::Render { .. }))
            .count()
    }

    /// Number of bitmap uploads
    pub fn upload_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::Upload(_)))
            .count()
    }

    /// Simulated times of all drawn frames, in order
    pub fn render_times(&self) -> Vec<f32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RenderCall::Render { time, .. } => Some(*time),
                _ => None,
            })
            .collect()
    }

    /// The most recently uploaded bitmap
    pub fn last_upload(&self) -> Option<&RgbaImage> {
        self.last_upload.as_ref()
    }
}

impl FrameRenderer for RecordingRenderer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn upload_texture(&mut self, bitmap: &TextureBitmap) -> Result<(), RenderError> {
        if bitmap.size() != self.size() {
            return Err(RenderError::SizeMismatch {
                expected: self.size(),
                actual: bitmap.size(),
            });
        }
        let image = bitmap.as_image().clone();
        self.calls.push(RenderCall::Upload(image.clone()));
        self.last_upload = Some(image);
        Ok(())
    }

    fn render_frame(
        &mut self,
        params: &EffectParameters,
        time_seconds: f32,
    ) -> Result<FrameStatus, RenderError> {
        if self.last_upload.is_none() {
            return Ok(FrameStatus::Skipped);
        }
        self.calls.push(RenderCall::Render {
            time: time_seconds,
            params: *params,
        });
        self.has_frame = true;
        Ok(FrameStatus::Drawn)
    }

    fn read_pixels(&mut self) -> Result<RgbaImage, RenderError> {
        if !self.has_frame {
            return Err(RenderError::NoFrame);
        }
        self.calls.push(RenderCall::Read);
        self.last_upload.clone().ok_or(RenderError::NoFrame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_glyph_proportions() {
        let source = MockGlyphSource::new();
        let glyph = source.rasterize('A', 100.0).unwrap();
        assert_eq!((glyph.width, glyph.height), (50, 70));
        assert_eq!(glyph.coverage.len(), 50 * 70);
        assert!(source.rasterize(' ', 100.0).unwrap().is_empty());
        assert_eq!(source.measure("AB", 100.0), 120.0);
    }

    #[test]
    fn test_mock_failing_char() {
        let source = MockGlyphSource::failing_on('X');
        assert!(source.rasterize('A', 20.0).is_ok());
        assert!(matches!(
            source.rasterize('X', 20.0),
            Err(RenderError::Rasterize(_))
        ));
    }

    #[test]
    fn test_render_skipped_before_upload() {
        let mut renderer = RecordingRenderer::new(4, 4);
        let status = renderer
            .render_frame(&EffectParameters::default(), 0.0)
            .unwrap();
        assert_eq!(status, FrameStatus::Skipped);
        assert!(matches!(renderer.read_pixels(), Err(RenderError::NoFrame)));
    }

    #[test]
    fn test_records_calls() {
        let mut renderer = RecordingRenderer::new(4, 4);
        let bitmap = TextureBitmap::new(4, 4);
        renderer.upload_texture(&bitmap).unwrap();
        renderer
            .render_frame(&EffectParameters::default(), 0.5)
            .unwrap();
        let pixels = renderer.read_pixels().unwrap();

        assert_eq!(pixels.dimensions(), (4, 4));
        assert_eq!(renderer.upload_count(), 1);
        assert_eq!(renderer.render_times(), vec![0.5]);
        assert!(matches!(renderer.calls.last(), Some(RenderCall::Read)));
    }

    #[test]
    fn test_upload_size_mismatch() {
        let mut renderer = RecordingRenderer::new(4, 4);
        let err = renderer
            .upload_texture(&TextureBitmap::new(8, 8))
            .unwrap_err();
        assert!(matches!(err, RenderError::SizeMismatch { .. }));
    }
}

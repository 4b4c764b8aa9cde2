//! fontdue-backed glyph source

use std::path::Path;

use fontdue::{Font, FontSettings};

use crate::error::RenderError;
use crate::traits::{GlyphBitmap, GlyphSource, LineMetrics};

/// Glyph source backed by a single parsed font face
pub struct FontdueGlyphSource {
    font: Font,
}

impl FontdueGlyphSource {
    /// Parse font data (TTF/OTF)
    pub fn from_bytes(data: &[u8]) -> Result<Self, RenderError> {
        Self::from_collection(data, 0)
    }

    /// Parse face `index` of a font collection (TTC); 0 for single-face files
    pub fn from_collection(data: &[u8], index: u32) -> Result<Self, RenderError> {
        let settings = FontSettings {
            collection_index: index,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(data, settings).map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self { font })
    }

    /// Read and parse a font file
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let data = std::fs::read(path)
            .map_err(|e| RenderError::Font(format!("{}: {}", path.display(), e)))?;
        log::debug!("Loaded font from {}", path.display());
        Self::from_bytes(&data)
    }

    pub fn name(&self) -> Option<&str> {
        self.font.name()
    }
}

impl GlyphSource for FontdueGlyphSource {
    fn advance(&self, ch: char, px: f32) -> f32 {
        self.font.metrics(ch, px).advance_width
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        match self.font.horizontal_line_metrics(px) {
            Some(m) => LineMetrics {
                ascent: m.ascent,
                descent: m.descent,
            },
            // Faces without horizontal metrics (rare); approximate from the size
            None => LineMetrics {
                ascent: px * 0.8,
                descent: -px * 0.2,
            },
        }
    }

    fn rasterize(&self, ch: char, px: f32) -> Result<GlyphBitmap, RenderError> {
        let (metrics, coverage) = self.font.rasterize(ch, px);
        if coverage.len() != metrics.width * metrics.height {
            return Err(RenderError::rasterize(format!(
                "glyph '{}' returned {} bytes for {}x{}",
                ch,
                coverage.len(),
                metrics.width,
                metrics.height
            )));
        }
        Ok(GlyphBitmap {
            width: metrics.width,
            height: metrics.height,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            coverage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_font_data() {
        let result = FontdueGlyphSource::from_bytes(b"not a font");
        assert!(matches!(result, Err(RenderError::Font(_))));
    }

    #[test]
    fn test_missing_font_file() {
        let result = FontdueGlyphSource::from_path(Path::new("/nonexistent/font.ttf"));
        assert!(matches!(result, Err(RenderError::Font(_))));
    }
}

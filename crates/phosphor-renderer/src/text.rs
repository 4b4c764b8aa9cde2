//! Text rasterizer
//!
//! Lays out multi-line text centered on the texture, wraps lines that are too
//! wide, and paints them with a soft drop shadow. The transparency mode picks
//! between a filled or cleared background and painted or cut-out glyphs.

use phosphor_core::{Color, TextStyle, TransparencyMode};

use crate::bitmap::{CompositeMode, CoverageMask, TextureBitmap};
use crate::error::RenderError;
use crate::traits::GlyphSource;

/// Fraction of the texture width a line may occupy before it is wrapped
pub const WRAP_WIDTH_FRACTION: f32 = 0.9;

/// Drop shadow offset in pixels, applied to both axes
pub const SHADOW_OFFSET: i32 = 2;

/// Drop shadow box blur radius in pixels
pub const SHADOW_BLUR_RADIUS: u32 = 2;

pub const SHADOW_COLOR: Color = Color::rgba(0.0, 0.0, 0.0, 0.5);

/// A laid-out line: its text and the pen origin of its first glyph
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub baseline: f32,
}

/// Turns a [`TextStyle`] into texture pixels
pub struct TextRasterizer {
    glyphs: Box<dyn GlyphSource>,
}

impl TextRasterizer {
    pub fn new(glyphs: Box<dyn GlyphSource>) -> Self {
        Self { glyphs }
    }

    pub fn glyph_source(&self) -> &dyn GlyphSource {
        self.glyphs.as_ref()
    }

    /// Rasterize into a fresh bitmap of the given size
    pub fn rasterize(
        &self,
        style: &TextStyle,
        size: (u32, u32),
    ) -> Result<TextureBitmap, RenderError> {
        let mut bitmap = TextureBitmap::new(size.0, size.1);
        self.rasterize_into(style, &mut bitmap)?;
        Ok(bitmap)
    }

    /// Overwrite `bitmap` with `style` rendered at the bitmap's size
    pub fn rasterize_into(
        &self,
        style: &TextStyle,
        bitmap: &mut TextureBitmap,
    ) -> Result<(), RenderError> {
        let style = style.sanitized();

        if style.transparency.clears_background() {
            bitmap.clear();
        } else {
            bitmap.fill(style.background_color.with_alpha(1.0));
        }

        let mode = match style.transparency {
            TransparencyMode::TransparentText => CompositeMode::DestinationOut,
            TransparencyMode::Normal | TransparencyMode::TransparentBackground => {
                CompositeMode::SourceOver
            }
        };

        let lines = self.layout(&style, bitmap.size());
        let mut scope = bitmap.scoped_composite(mode);
        let mask = self.coverage_mask(&lines, style.font_size_px, scope.size())?;

        let shadow = mask.blurred_offset(SHADOW_BLUR_RADIUS, SHADOW_OFFSET, SHADOW_OFFSET);
        scope.paint_mask(&shadow, SHADOW_COLOR);
        scope.paint_mask(&mask, style.font_color);

        log::debug!(
            "Rasterized {} line(s) at {}px ({:?})",
            lines.len(),
            style.font_size_px,
            style.transparency
        );
        Ok(())
    }

    /// Split, wrap and position every line of `style.content`
    pub fn layout(&self, style: &TextStyle, size: (u32, u32)) -> Vec<PlacedLine> {
        let px = style.font_size_px;
        let (width, height) = (size.0 as f32, size.1 as f32);
        let max_width = width * WRAP_WIDTH_FRACTION;

        let lines: Vec<String> = style
            .content
            .split('\n')
            .map(|raw| raw.trim_end_matches('\r'))
            .flat_map(|raw| self.wrap_line(raw, px, max_width))
            .collect();

        let line_height = style.line_height();
        let start_y = (height - (lines.len() as f32 - 1.0) * line_height) / 2.0;
        let to_baseline = self.glyphs.line_metrics(px).middle_to_baseline();

        lines
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let line_width = self.glyphs.measure(&text, px);
                let middle = start_y + i as f32 * line_height;
                PlacedLine {
                    x: ((width - line_width) / 2.0).floor(),
                    baseline: (middle + to_baseline).floor(),
                    text,
                }
            })
            .collect()
    }

    /// Greedy word wrap; lines without a space are never broken
    pub fn wrap_line(&self, line: &str, px: f32, max_width: f32) -> Vec<String> {
        if self.glyphs.measure(line, px) <= max_width || !line.contains(' ') {
            return vec![line.to_string()];
        }

        let mut words = line.split(' ');
        let mut current = words.next().unwrap_or_default().to_string();
        let mut wrapped = Vec::new();

        for word in words {
            let candidate = format!("{} {}", current, word);
            if self.glyphs.measure(&candidate, px) < max_width {
                current = candidate;
            } else {
                wrapped.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        wrapped.push(current);
        wrapped
    }

    fn coverage_mask(
        &self,
        lines: &[PlacedLine],
        px: f32,
        size: (u32, u32),
    ) -> Result<CoverageMask, RenderError> {
        let mut mask = CoverageMask::new(size.0, size.1);

        for line in lines {
            let mut pen_x = line.x;
            for ch in line.text.chars() {
                let glyph = self.glyphs.rasterize(ch, px)?;
                if !glyph.is_empty() {
                    let left = pen_x.floor() as i32 + glyph.xmin;
                    let top = line.baseline as i32 - glyph.height as i32 - glyph.ymin;
                    for gy in 0..glyph.height {
                        for gx in 0..glyph.width {
                            let coverage = glyph.coverage[gy * glyph.width + gx];
                            if coverage > 0 {
                                mask.accumulate(
                                    left + gx as i32,
                                    top + gy as i32,
                                    coverage as f32 / 255.0,
                                );
                            }
                        }
                    }
                }
                pen_x += self.glyphs.advance(ch, px);
            }
        }

        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGlyphSource;

    fn rasterizer() -> TextRasterizer {
        TextRasterizer::new(Box::new(MockGlyphSource::new()))
    }

    fn style(content: &str) -> TextStyle {
        TextStyle {
            content: content.to_string(),
            font_size_px: 20.0,
            line_spacing: 1.2,
            font_color: Color::WHITE,
            background_color: Color::rgb(0.0, 0.0, 1.0),
            transparency: TransparencyMode::Normal,
        }
    }

    #[test]
    fn test_wrap_requires_space() {
        let r = rasterizer();
        // 10 glyphs * 12px = 120px, far wider than 0.9 * 64
        let lines = r.layout(&style("AAAAAAAAAA"), (64, 64));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "AAAAAAAAAA");
    }

    #[test]
    fn test_wrap_greedy() {
        let r = rasterizer();
        // max width 57.6 at 64px; "A B" = 36, "A B C" = 60
        let wrapped = r.wrap_line("A B C D E", 20.0, 57.6);
        assert_eq!(wrapped, vec!["A B", "C D", "E"]);
    }

    #[test]
    fn test_short_line_not_wrapped() {
        let r = rasterizer();
        assert_eq!(r.wrap_line("HI YO", 20.0, 100.0), vec!["HI YO"]);
    }

    #[test]
    fn test_explicit_breaks_preserved() {
        let r = rasterizer();
        let lines = r.layout(&style("ONE\r\nTWO\nSIX"), (64, 64));
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["ONE", "TWO", "SIX"]);
    }

    #[test]
    fn test_vertical_centering() {
        let r = rasterizer();
        let lines = r.layout(&style("A\nB"), (64, 64));
        // line height 24, start_y = (64 - 24) / 2 = 20; baseline offset (16 - 4) / 2 = 6
        assert_eq!(lines[0].baseline, 26.0);
        assert_eq!(lines[1].baseline, 50.0);
        // "A" is 12px wide, centered
        assert_eq!(lines[0].x, 26.0);
    }

    #[test]
    fn test_normal_mode_paints_text_over_fill() {
        let bitmap = rasterizer().rasterize(&style("H"), (64, 64)).unwrap();
        assert_eq!(bitmap.pixel(0, 0), [0, 0, 255, 255]);
        assert_eq!(bitmap.pixel(32, 31), [255, 255, 255, 255]);
    }

    #[test]
    fn test_transparent_text_cuts_holes() {
        let mut s = style("H");
        s.transparency = TransparencyMode::TransparentText;
        let bitmap = rasterizer().rasterize(&s, (64, 64)).unwrap();

        assert_eq!(bitmap.pixel(0, 0)[3], 255);
        assert!(bitmap.pixel(32, 31)[3] < bitmap.pixel(0, 0)[3]);
        assert_eq!(bitmap.pixel(32, 31)[3], 0);
        assert_eq!(bitmap.composite_mode(), CompositeMode::SourceOver);
    }

    #[test]
    fn test_transparent_background_clears() {
        let mut s = style("H");
        s.transparency = TransparencyMode::TransparentBackground;
        let bitmap = rasterizer().rasterize(&s, (64, 64)).unwrap();

        assert_eq!(bitmap.pixel(0, 0), [0, 0, 0, 0]);
        assert_eq!(bitmap.pixel(32, 31)[3], 255);
    }

    #[test]
    fn test_rasterize_is_deterministic() {
        let r = rasterizer();
        let s = style("HELLO CRT WORLD\nLINE TWO");
        let a = r.rasterize(&s, (64, 64)).unwrap();
        let b = r.rasterize(&s, (64, 64)).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_composite_restored_after_glyph_failure() {
        let r = TextRasterizer::new(Box::new(MockGlyphSource::failing_on('X')));
        let mut s = style("AXA");
        s.transparency = TransparencyMode::TransparentText;

        let mut bitmap = TextureBitmap::new(64, 64);
        let result = r.rasterize_into(&s, &mut bitmap);
        assert!(matches!(result, Err(RenderError::Rasterize(_))));
        assert_eq!(bitmap.composite_mode(), CompositeMode::SourceOver);
    }

    #[test]
    fn test_shadow_darkens_offset_region() {
        let mut s = style("H");
        s.background_color = Color::WHITE;
        s.font_color = Color::WHITE;
        let bitmap = rasterizer().rasterize(&s, (64, 64)).unwrap();
        // Glyph spans x 27..37, y 24..38; shadow extends to the lower right
        let [r, _, _, _] = bitmap.pixel(38, 39);
        assert!(r < 255);
        assert_eq!(bitmap.pixel(2, 2), [255, 255, 255, 255]);
    }
}

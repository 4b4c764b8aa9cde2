//! Fixed-size RGBA surface the text is rasterized into
//!
//! Pixels are stored with straight (non-premultiplied) alpha, which is what
//! the GPU texture and the encoders expect. Dimensions are set once at
//! construction; drawing only ever overwrites content.

use image::{Rgba, RgbaImage};
use phosphor_core::Color;

/// How painted coverage combines with existing pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// Paint color over the destination
    #[default]
    SourceOver,
    /// Erase the destination where coverage is painted
    DestinationOut,
}

/// Single-channel coverage mask the size of a bitmap
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageMask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl CoverageMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }

    /// Merge coverage at a possibly out-of-range position; outside is ignored
    pub fn accumulate(&mut self, x: i32, y: i32, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as u32 * self.width + x as u32) as usize;
        self.data[idx] = self.data[idx].max(coverage.clamp(0.0, 1.0));
    }

    /// Box-blurred copy translated by `(dx, dy)` pixels
    pub fn blurred_offset(&self, radius: u32, dx: i32, dy: i32) -> Self {
        let (w, h) = (self.width as i32, self.height as i32);
        let r = radius as i32;
        let at = |data: &[f32], x: i32, y: i32| -> f32 {
            if x < 0 || y < 0 || x >= w || y >= h {
                0.0
            } else {
                data[(y * w + x) as usize]
            }
        };

        // Separable: horizontal pass, then vertical pass
        let window = (2 * r + 1) as f32;
        let mut horizontal = vec![0.0; self.data.len()];
        for y in 0..h {
            for x in 0..w {
                let sum: f32 = (-r..=r).map(|k| at(&self.data, x + k, y)).sum();
                horizontal[(y * w + x) as usize] = sum / window;
            }
        }

        let mut out = Self::new(self.width, self.height);
        for y in 0..h {
            for x in 0..w {
                let (sx, sy) = (x - dx, y - dy);
                let sum: f32 = (-r..=r).map(|k| at(&horizontal, sx, sy + k)).sum();
                out.data[(y * w + x) as usize] = sum / window;
            }
        }
        out
    }
}

/// The text texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBitmap {
    image: RgbaImage,
    composite: CompositeMode,
}

impl TextureBitmap {
    /// Reference edge length of the square texture
    pub const REFERENCE_SIZE: u32 = 512;

    /// Fully transparent bitmap
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
            composite: CompositeMode::SourceOver,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Raw RGBA bytes, row-major
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn composite_mode(&self) -> CompositeMode {
        self.composite
    }

    /// Replace every pixel with `color`
    pub fn fill(&mut self, color: Color) {
        let px = Rgba(color.to_u8());
        self.image.pixels_mut().for_each(|p| *p = px);
    }

    /// Replace every pixel with transparent black
    pub fn clear(&mut self) {
        self.fill(Color::TRANSPARENT);
    }

    /// Switch the composite mode until the returned scope is dropped
    pub fn scoped_composite(&mut self, mode: CompositeMode) -> CompositeScope<'_> {
        let previous = self.composite;
        self.composite = mode;
        CompositeScope {
            bitmap: self,
            previous,
        }
    }

    /// Paint `color` through `mask` with the current composite mode
    pub fn paint_mask(&mut self, mask: &CoverageMask, color: Color) {
        debug_assert_eq!((mask.width(), mask.height()), self.size());
        let color = color.normalized();
        let mode = self.composite;

        for (x, y, px) in self.image.enumerate_pixels_mut() {
            if x >= mask.width() || y >= mask.height() {
                continue;
            }
            let coverage = mask.get(x, y);
            if coverage <= 0.0 {
                continue;
            }
            px.0 = blend(px.0, color, coverage, mode);
        }
    }
}

/// Composite one source sample over a straight-alpha destination pixel
fn blend(dst: [u8; 4], src: Color, coverage: f32, mode: CompositeMode) -> [u8; 4] {
    let sa = (src.a * coverage).clamp(0.0, 1.0);
    let da = dst[3] as f32 / 255.0;

    match mode {
        CompositeMode::SourceOver => {
            let out_a = sa + da * (1.0 - sa);
            if out_a <= 0.0 {
                return [0, 0, 0, 0];
            }
            let channel = |s: f32, d: u8| {
                let d = d as f32 / 255.0;
                (s * sa + d * da * (1.0 - sa)) / out_a
            };
            Color::rgba(
                channel(src.r, dst[0]),
                channel(src.g, dst[1]),
                channel(src.b, dst[2]),
                out_a,
            )
            .to_u8()
        }
        CompositeMode::DestinationOut => {
            let out_a = da * (1.0 - sa);
            [dst[0], dst[1], dst[2], (out_a * 255.0).round() as u8]
        }
    }
}

/// Restores the previous composite mode when dropped
///
/// Dropping happens on every exit path, including early `?` returns, so a
/// failed paint can never leave the bitmap in cut-out mode.
pub struct CompositeScope<'a> {
    bitmap: &'a mut TextureBitmap,
    previous: CompositeMode,
}

impl std::ops::Deref for CompositeScope<'_> {
    type Target = TextureBitmap;

    fn deref(&self) -> &TextureBitmap {
        self.bitmap
    }
}

impl std::ops::DerefMut for CompositeScope<'_> {
    fn deref_mut(&mut self) -> &mut TextureBitmap {
        self.bitmap
    }
}

impl Drop for CompositeScope<'_> {
    fn drop(&mut self) {
        self.bitmap.composite = self.previous;
    }
}

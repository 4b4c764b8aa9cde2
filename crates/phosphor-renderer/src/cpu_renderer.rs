//! Host frame renderer
//!
//! Evaluates the same stage plan as the GPU shader, one pixel at a time.
//! Used as the reference in tests and as a headless fallback when no adapter
//! is available.

use image::{Rgba, RgbaImage};
use phosphor_core::EffectParameters;
use phosphor_core::params::scanline_frequency;

use crate::bitmap::TextureBitmap;
use crate::error::RenderError;
use crate::stages::{ShadeContext, StagePlan, TextureSampler, to_rgba8};
use crate::traits::{FrameRenderer, FrameStatus};

pub struct CpuFrameRenderer {
    width: u32,
    height: u32,
    source: Option<TextureBitmap>,
    target: RgbaImage,
    has_frame: bool,
}

impl CpuFrameRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            source: None,
            target: RgbaImage::new(width, height),
            has_frame: false,
        }
    }
}

impl FrameRenderer for CpuFrameRenderer {
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
        self.source = Some(bitmap.clone());
        Ok(())
    }

    fn render_frame(
        &mut self,
        params: &EffectParameters,
        time_seconds: f32,
    ) -> Result<FrameStatus, RenderError> {
        let Some(source) = &self.source else {
            return Ok(FrameStatus::Skipped);
        };

        let plan = StagePlan::from_params(params);
        let ctx = ShadeContext::new(
            params,
            time_seconds,
            scanline_frequency(self.height),
            source.texel_size(),
        );
        let (w, h) = (self.width as f32, self.height as f32);

        for (x, y, px) in self.target.enumerate_pixels_mut() {
            let uv = [(x as f32 + 0.5) / w, (y as f32 + 0.5) / h];
            *px = Rgba(to_rgba8(plan.shade(uv, &ctx, source)));
        }

        self.has_frame = true;
        Ok(FrameStatus::Drawn)
    }

    fn read_pixels(&mut self) -> Result<RgbaImage, RenderError> {
        if !self.has_frame {
            return Err(RenderError::NoFrame);
        }
        Ok(self.target.clone())
    }
}

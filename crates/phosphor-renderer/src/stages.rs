//! Host-side effect stages
//!
//! The fragment program is an ordered list of pure per-pixel stages. Each
//! stage has a host implementation here, used by the CPU renderer and by
//! tests, and a WGSL counterpart emitted by [`crate::shaders::ShaderGenerator`].
//! Both follow the same formulas and constants.

use phosphor_core::{Color, EffectParameters};

use crate::bitmap::TextureBitmap;

/// Glitch frame rate: bands re-roll this many times per second
pub const GLITCH_FRAME_RATE: f32 = 15.0;
/// Number of horizontal bands the glitch hash is evaluated over
pub const GLITCH_ROWS: f32 = 20.0;
/// Probability of a band glitching at full intensity
pub const GLITCH_PROBABILITY: f32 = 0.3;
/// Largest horizontal shift of a glitched band, in UV units
pub const GLITCH_MAX_SHIFT: f32 = 0.05;
/// Scanline scroll speed, UV units per second
pub const SCANLINE_SCROLL_SPEED: f32 = 0.05;
/// Time multiplier folded into the noise hash input
pub const NOISE_TIME_SCALE: f32 = 10.0;

/// Sine-based hash in `[0, 1)`
///
/// Pure function of its input. Results depend on the platform's `sin`, so
/// GPU and host output agree only approximately.
pub fn hash(p: [f32; 2]) -> f32 {
    let x = (p[0] * 12.9898 + p[1] * 78.233).sin() * 43758.5453;
    x - x.floor()
}

/// Barrel remap around the center; zoom scales the radius before distortion
pub fn barrel_distort(uv: [f32; 2], distortion: f32, zoom: f32) -> [f32; 2] {
    let r = [(uv[0] - 0.5) * zoom, (uv[1] - 0.5) * zoom];
    let factor = 1.0 + distortion * (r[0] * r[0] + r[1] * r[1]);
    [r[0] * factor / zoom + 0.5, r[1] * factor / zoom + 0.5]
}

pub fn in_unit_square(uv: [f32; 2]) -> bool {
    (0.0..=1.0).contains(&uv[0]) && (0.0..=1.0).contains(&uv[1])
}

/// Read access to a texture in normalized coordinates
pub trait TextureSampler {
    /// Bilinear sample with clamp-to-edge addressing, straight alpha
    fn sample(&self, uv: [f32; 2]) -> [f32; 4];

    /// Size of one texel in UV units
    fn texel_size(&self) -> [f32; 2];
}

impl TextureSampler for TextureBitmap {
    fn sample(&self, uv: [f32; 2]) -> [f32; 4] {
        let (w, h) = self.size();
        let px = uv[0] * w as f32 - 0.5;
        let py = uv[1] * h as f32 - 0.5;
        let (x0, y0) = (px.floor(), py.floor());
        let (fx, fy) = (px - x0, py - y0);

        let texel = |x: f32, y: f32| -> [f32; 4] {
            let x = (x as i64).clamp(0, w as i64 - 1) as u32;
            let y = (y as i64).clamp(0, h as i64 - 1) as u32;
            self.pixel(x, y).map(|c| c as f32 / 255.0)
        };

        let (a, b) = (texel(x0, y0), texel(x0 + 1.0, y0));
        let (c, d) = (texel(x0, y0 + 1.0), texel(x0 + 1.0, y0 + 1.0));
        std::array::from_fn(|i| {
            let top = a[i] + (b[i] - a[i]) * fx;
            let bottom = c[i] + (d[i] - c[i]) * fx;
            top + (bottom - top) * fy
        })
    }

    fn texel_size(&self) -> [f32; 2] {
        let (w, h) = self.size();
        [1.0 / w as f32, 1.0 / h as f32]
    }
}

/// Per-frame values shared by every fragment
#[derive(Debug, Clone, Copy)]
pub struct ShadeContext {
    pub params: EffectParameters,
    pub time: f32,
    pub scanline_frequency: f32,
    pub texel_size: [f32; 2],
    pub clear_color: [f32; 4],
}

impl ShadeContext {
    pub fn new(
        params: &EffectParameters,
        time: f32,
        scanline_frequency: f32,
        texel_size: [f32; 2],
    ) -> Self {
        Self {
            params: params.sanitized(),
            time,
            scanline_frequency,
            texel_size,
            clear_color: params.clear_color().to_array(),
        }
    }
}

/// State carried from one stage to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    /// Undistorted screen coordinate
    pub screen_uv: [f32; 2],
    /// Texture coordinate after the stages so far
    pub uv: [f32; 2],
    /// False once the remap left the unit square
    pub in_bounds: bool,
    pub color: [f32; 4],
}

impl Fragment {
    pub fn new(screen_uv: [f32; 2], clear_color: [f32; 4]) -> Self {
        Self {
            screen_uv,
            uv: screen_uv,
            in_bounds: true,
            color: clear_color,
        }
    }
}

/// One step of the fragment program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    BarrelDistortion,
    GlitchDisplacement,
    PointSample,
    BoxBlur,
    ScanlineNoise,
}

impl Stage {
    /// Bit identifying this stage in a [`StagePlan::key`]
    pub fn bit(self) -> u32 {
        match self {
            Self::BarrelDistortion => 1 << 0,
            Self::GlitchDisplacement => 1 << 1,
            Self::PointSample => 1 << 2,
            Self::BoxBlur => 1 << 3,
            Self::ScanlineNoise => 1 << 4,
        }
    }

    /// Run this stage on `frag`; stages after an out-of-bounds remap do nothing
    pub fn apply(self, frag: &mut Fragment, ctx: &ShadeContext, texture: &dyn TextureSampler) {
        if !frag.in_bounds {
            return;
        }
        let p = &ctx.params;

        match self {
            Self::BarrelDistortion => {
                frag.uv = barrel_distort(frag.uv, p.distortion, p.zoom);
                if !in_unit_square(frag.uv) {
                    frag.in_bounds = false;
                    frag.color = ctx.clear_color;
                }
            }
            Self::GlitchDisplacement => {
                let frame = (ctx.time * GLITCH_FRAME_RATE).floor();
                let row = (frag.uv[1] * GLITCH_ROWS).floor();
                if hash([frame, row]) < p.glitch_intensity * GLITCH_PROBABILITY {
                    frag.uv[0] += (hash([row, frame]) - 0.5) * 2.0 * GLITCH_MAX_SHIFT;
                    if !in_unit_square(frag.uv) {
                        frag.in_bounds = false;
                        frag.color = ctx.clear_color;
                    }
                }
            }
            Self::PointSample => {
                frag.color = texture.sample(frag.uv);
            }
            Self::BoxBlur => {
                let offset = [
                    ctx.texel_size[0] * p.blur_amount,
                    ctx.texel_size[1] * p.blur_amount,
                ];
                let mut sum = [0.0_f32; 4];
                for i in -1..=1 {
                    for j in -1..=1 {
                        let uv = [
                            frag.uv[0] + i as f32 * offset[0],
                            frag.uv[1] + j as f32 * offset[1],
                        ];
                        let s = texture.sample(uv);
                        sum.iter_mut().zip(s).for_each(|(acc, v)| *acc += v);
                    }
                }
                frag.color = sum.map(|v| v / 9.0);
            }
            Self::ScanlineNoise => {
                let scanline = ((frag.uv[1] + ctx.time * SCANLINE_SCROLL_SPEED)
                    * ctx.scanline_frequency)
                    .sin()
                    * p.scanline_intensity;
                let t = ctx.time * NOISE_TIME_SCALE;
                let noise =
                    (hash([frag.screen_uv[0] + t, frag.screen_uv[1] + t]) - 0.5) * p.noise_amount;
                for c in &mut frag.color[..3] {
                    *c = (*c - scanline + noise).clamp(0.0, 1.0);
                }
            }
        }
    }
}

/// Ordered list of enabled stages for one set of parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl StagePlan {
    pub fn from_params(params: &EffectParameters) -> Self {
        let mut stages = vec![Stage::BarrelDistortion];
        if params.glitch_intensity > 0.0 {
            stages.push(Stage::GlitchDisplacement);
        }
        if params.blur_amount > 0.0 {
            stages.push(Stage::BoxBlur);
        } else {
            stages.push(Stage::PointSample);
        }
        stages.push(Stage::ScanlineNoise);
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Bitmask of the enabled stages; stage order is fixed, so this is unique
    pub fn key(&self) -> u32 {
        self.stages.iter().fold(0, |acc, s| acc | s.bit())
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    /// Evaluate every stage for one pixel
    pub fn shade(
        &self,
        screen_uv: [f32; 2],
        ctx: &ShadeContext,
        texture: &dyn TextureSampler,
    ) -> [f32; 4] {
        let mut frag = Fragment::new(screen_uv, ctx.clear_color);
        for stage in &self.stages {
            stage.apply(&mut frag, ctx, texture);
        }
        frag.color
    }
}

/// Clear color as 8-bit RGBA, what an out-of-bounds pixel reads back as
pub fn clear_rgba8(params: &EffectParameters) -> [u8; 4] {
    params.clear_color().to_u8()
}

pub(crate) fn to_rgba8(color: [f32; 4]) -> [u8; 4] {
    Color::rgba(color[0], color[1], color[2], color[3]).to_u8()
}

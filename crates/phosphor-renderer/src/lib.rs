//! Phosphor Renderer - text rasterization and CRT effect rendering
//!
//! The pipeline has two halves:
//! - Text rasterizer: lays out and paints text into a fixed-size bitmap,
//!   only when the text or its style changes
//! - Frame renderer: runs the effect stages (barrel distortion, glitch,
//!   blur, scanlines, noise) over that bitmap once per frame
//!
//! The effect stages exist twice, as WGSL generated per enabled stage list
//! for the GPU renderer and as host code for the CPU renderer. Traits at
//! both seams let tests run without a GPU or system fonts.

pub mod bitmap;
pub mod cpu_renderer;
pub mod error;
pub mod font;
pub mod gpu;
pub mod gpu_renderer;
pub mod mock;
pub mod shaders;
pub mod stages;
pub mod text;
pub mod traits;

pub use bitmap::{CompositeMode, CompositeScope, CoverageMask, TextureBitmap};
pub use cpu_renderer::CpuFrameRenderer;
pub use error::RenderError;
pub use font::FontdueGlyphSource;
pub use gpu::GpuContext;
pub use gpu_renderer::{GpuFrameRenderer, TEXTURE_FORMAT};
pub use mock::{MockGlyphSource, RecordingRenderer, RenderCall};
pub use shaders::{CrtUniforms, ShaderGenerator};
pub use stages::{Stage, StagePlan};
pub use text::TextRasterizer;
pub use traits::{FrameRenderer, FrameStatus, GlyphBitmap, GlyphSource, LineMetrics};

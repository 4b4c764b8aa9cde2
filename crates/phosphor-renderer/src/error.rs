//! Renderer error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    /// No usable graphics adapter or device
    #[error("graphics initialization failed: {0}")]
    Initialization(String),

    /// The generated shader was rejected by the device
    #[error("shader '{label}' failed to compile: {diagnostic}")]
    ShaderCompile { label: String, diagnostic: String },

    /// Pixels were requested before any frame was drawn
    #[error("no frame has been rendered yet")]
    NoFrame,

    /// Copying the render target back to the host failed
    #[error("pixel readback failed: {0}")]
    Readback(String),

    /// Bitmap dimensions do not match the renderer
    #[error("texture is {actual:?}, renderer expects {expected:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Text could not be laid out or painted
    #[error("text rasterization failed: {0}")]
    Rasterize(String),

    /// Font data could not be parsed
    #[error("failed to load font: {0}")]
    Font(String),
}

impl RenderError {
    pub fn rasterize(msg: impl Into<String>) -> Self {
        Self::Rasterize(msg.into())
    }

    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }
}

//! phosphor - CRT-style text effects renderer
//!
//! Ties the workspace crates together:
//! - [`studio::Studio`] keeps the text texture in sync with the shared
//!   parameters and drives a frame renderer for preview and export
//! - [`export`] turns captured frames into PNG sequences and looping GIFs
//! - [`font`] finds a usable system font

pub mod export;
pub mod font;
pub mod studio;

pub use export::{
    ExportError, ExportFlag, ExportSettings, ExportTicket, FrameSink, GifSink, PngSequenceSink,
};
pub use studio::Studio;

//! Phosphor Core - parameter model and frame sequencing
//!
//! This crate provides:
//! - Effect and text parameters with their valid ranges
//! - Color parsing for user supplied color strings
//! - A versioned, shared parameter snapshot read once per frame
//! - Frame schedules for typing-reveal and continuous animated export

pub mod color;
pub mod params;
pub mod sequence;
pub mod snapshot;

pub use color::{Color, ColorParseError, parse_color, parse_color_or_black};
pub use params::{AnimationSettings, EffectParameters, TextStyle, TransparencyMode};
pub use sequence::{
    AnimationFrameSpec, CONTINUOUS_DURATION_SECS, FRAME_RATE, build_typing_sequence,
    continuous_schedule, frame_delay_ms, frames_for_duration, still_schedule, typing_schedule,
};
pub use snapshot::{ParamSnapshot, SharedParams};

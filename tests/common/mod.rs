//! Common test utilities and harness
//!
//! Provides reusable utilities for export testing:
//! - Isolated output directories
//! - Studios over the CPU renderer or the recording renderer, with
//!   deterministic block glyphs
//! - GIF decoding helpers

#![allow(dead_code)]

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, Frame};
use phosphor::{ExportSettings, Studio};
use phosphor_core::{AnimationSettings, EffectParameters, SharedParams, TextStyle};
use phosphor_renderer::{
    CpuFrameRenderer, FrameRenderer, MockGlyphSource, RecordingRenderer, TextRasterizer,
};
use tempfile::TempDir;

pub const TEST_SIZE: u32 = 64;

/// Test environment with an isolated output directory
pub struct TestEnvironment {
    /// Temporary directory, removed on drop
    pub temp_dir: TempDir,
    pub output_dir: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let output_dir = temp_dir.path().join("exports");
        Self {
            temp_dir,
            output_dir,
        }
    }

    pub fn settings(&self) -> ExportSettings {
        ExportSettings::new(&self.output_dir)
    }

    /// Files in the output directory, sorted by name
    pub fn output_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.output_dir) else {
            return Vec::new();
        };
        let mut files: Vec<_> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        files.sort();
        files
    }
}

pub fn params(text: &str, typing: bool) -> SharedParams {
    SharedParams::new(
        EffectParameters::default(),
        TextStyle {
            content: text.to_string(),
            font_size_px: 20.0,
            ..Default::default()
        },
        AnimationSettings {
            typing_enabled: typing,
            ..Default::default()
        },
    )
}

fn studio_with<R: FrameRenderer>(
    renderer: R,
    glyphs: MockGlyphSource,
    params: SharedParams,
    env: &TestEnvironment,
) -> Studio<R> {
    Studio::new(
        renderer,
        TextRasterizer::new(Box::new(glyphs)),
        params,
        env.settings(),
    )
}

/// Studio over the CPU reference renderer
pub fn cpu_studio(env: &TestEnvironment, text: &str, typing: bool) -> Studio<CpuFrameRenderer> {
    studio_with(
        CpuFrameRenderer::new(TEST_SIZE, TEST_SIZE),
        MockGlyphSource::new(),
        params(text, typing),
        env,
    )
}

/// Studio over the call-recording renderer
pub fn recording_studio(
    env: &TestEnvironment,
    text: &str,
    typing: bool,
) -> Studio<RecordingRenderer> {
    studio_with(
        RecordingRenderer::new(TEST_SIZE, TEST_SIZE),
        MockGlyphSource::new(),
        params(text, typing),
        env,
    )
}

/// Recording studio whose glyph source fails on `ch`
pub fn failing_studio(
    env: &TestEnvironment,
    text: &str,
    typing: bool,
    ch: char,
) -> Studio<RecordingRenderer> {
    studio_with(
        RecordingRenderer::new(TEST_SIZE, TEST_SIZE),
        MockGlyphSource::failing_on(ch),
        params(text, typing),
        env,
    )
}

/// Decode every frame of a GIF file
pub fn decode_gif(path: &Path) -> Vec<Frame> {
    let file = File::open(path).expect("Failed to open GIF");
    let decoder = GifDecoder::new(BufReader::new(file)).expect("Failed to read GIF header");
    decoder
        .into_frames()
        .collect_frames()
        .expect("Failed to decode GIF frames")
}

/// Frame delay in whole milliseconds
pub fn delay_ms(frame: &Frame) -> u32 {
    let (numer, denom) = frame.delay().numer_denom_ms();
    numer / denom.max(1)
}

//! Export encoders
//!
//! Sinks receive captured frames in schedule order. Stills become a numbered
//! PNG sequence; animations become a single looping GIF whose frame delays
//! come from the schedule.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageFormat, RgbaImage};
use phosphor_config::OutputConfig;
use phosphor_core::AnimationFrameSpec;
use phosphor_renderer::RenderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to encode {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where exports are written
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub directory: PathBuf,
    pub still_prefix: String,
    pub animation_name: String,
}

impl ExportSettings {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::from_output(&OutputConfig {
            directory: directory.into(),
            ..Default::default()
        })
    }

    pub fn from_output(output: &OutputConfig) -> Self {
        Self {
            directory: output.directory.clone(),
            still_prefix: output.still_prefix.clone(),
            animation_name: output.animation_name.clone(),
        }
    }

    pub fn animation_path(&self) -> PathBuf {
        self.directory.join(&self.animation_name)
    }
}

/// Receives captured frames in order
pub trait FrameSink {
    fn push(&mut self, frame: RgbaImage, spec: &AnimationFrameSpec) -> Result<(), ExportError>;

    /// Finalize and return the files written
    fn finish(&mut self) -> Result<Vec<PathBuf>, ExportError>;
}

fn create_dir(dir: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Numbered PNG files, `<prefix>_<index:03>.png`, in push order
pub struct PngSequenceSink {
    directory: PathBuf,
    prefix: String,
    written: Vec<PathBuf>,
}

impl PngSequenceSink {
    pub fn new(directory: &Path, prefix: &str) -> Result<Self, ExportError> {
        create_dir(directory)?;
        Ok(Self {
            directory: directory.to_path_buf(),
            prefix: prefix.to_string(),
            written: Vec::new(),
        })
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.directory.join(format!("{}_{:03}.png", self.prefix, index))
    }
}

impl FrameSink for PngSequenceSink {
    fn push(&mut self, frame: RgbaImage, _spec: &AnimationFrameSpec) -> Result<(), ExportError> {
        let path = self.frame_path(self.written.len());
        frame
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| ExportError::Encode {
                path: path.clone(),
                source,
            })?;
        log::debug!("Wrote {:?}", path);
        self.written.push(path);
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<PathBuf>, ExportError> {
        Ok(self.written.clone())
    }
}

/// Single looping GIF
pub struct GifSink {
    path: PathBuf,
    encoder: Option<GifEncoder<BufWriter<File>>>,
    frames: usize,
}

impl GifSink {
    pub fn new(path: &Path) -> Result<Self, ExportError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                create_dir(dir)?;
            }
        }

        let file = File::create(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut encoder = GifEncoder::new(BufWriter::new(file));
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|source| ExportError::Encode {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            encoder: Some(encoder),
            frames: 0,
        })
    }
}

impl FrameSink for GifSink {
    fn push(&mut self, frame: RgbaImage, spec: &AnimationFrameSpec) -> Result<(), ExportError> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Ok(());
        };
        let delay = Delay::from_numer_denom_ms(spec.delay_ms, 1);
        encoder
            .encode_frame(Frame::from_parts(frame, 0, 0, delay))
            .map_err(|source| ExportError::Encode {
                path: self.path.clone(),
                source,
            })?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<PathBuf>, ExportError> {
        // Dropping the encoder writes the trailer
        if self.encoder.take().is_some() {
            log::debug!("Finalized {:?} ({} frames)", self.path, self.frames);
        }
        Ok(vec![self.path.clone()])
    }
}

/// Shared "export in progress" flag
///
/// Readable from anywhere; only one [`ExportTicket`] can exist at a time.
#[derive(Debug, Clone, Default)]
pub struct ExportFlag {
    busy: Arc<AtomicBool>,
}

impl ExportFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the flag, or `None` if an export is already running
    pub fn try_acquire(&self) -> Option<ExportTicket> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExportTicket {
                busy: Arc::clone(&self.busy),
            })
    }
}

/// Clears the export flag when dropped
#[derive(Debug)]
pub struct ExportTicket {
    busy: Arc<AtomicBool>,
}

impl Drop for ExportTicket {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(delay_ms: u32) -> AnimationFrameSpec {
        AnimationFrameSpec {
            text_snapshot: String::new(),
            simulated_time_seconds: 0.0,
            delay_ms,
        }
    }

    #[test]
    fn test_flag_single_flight() {
        let flag = ExportFlag::new();
        assert!(!flag.is_set());

        let ticket = flag.try_acquire().unwrap();
        assert!(flag.is_set());
        assert!(flag.try_acquire().is_none());
        assert!(flag.clone().is_set());

        drop(ticket);
        assert!(!flag.is_set());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn test_png_sequence_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngSequenceSink::new(dir.path(), "frame").unwrap();
        for _ in 0..3 {
            sink.push(RgbaImage::new(4, 4), &spec(42)).unwrap();
        }
        let files = sink.finish().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["frame_000.png", "frame_001.png", "frame_002.png"]);
        assert!(files.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_gif_sink_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("anim.gif");
        let mut sink = GifSink::new(&path).unwrap();
        sink.push(RgbaImage::new(4, 4), &spec(42)).unwrap();
        assert_eq!(sink.finish().unwrap(), vec![path.clone()]);
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_settings_from_output() {
        let settings = ExportSettings::new("exports");
        assert_eq!(settings.still_prefix, "phosphor");
        assert_eq!(settings.animation_path(), PathBuf::from("exports/phosphor.gif"));
    }
}

//! Studio orchestrator
//!
//! Owns the live text texture and a frame renderer, and drives both from the
//! shared parameter snapshot. Exports temporarily swap the texture for
//! typing prefixes; the full text is put back whatever happens.

use std::path::{Path, PathBuf};

use phosphor_core::{
    AnimationFrameSpec, FRAME_RATE, ParamSnapshot, SharedParams, TextStyle, continuous_schedule,
    still_schedule, typing_schedule,
};
use phosphor_renderer::{
    FrameRenderer, FrameStatus, GpuFrameRenderer, RenderError, TextRasterizer, TextureBitmap,
};

use crate::export::{ExportError, ExportFlag, ExportSettings, FrameSink, GifSink, PngSequenceSink};

pub struct Studio<R: FrameRenderer> {
    params: SharedParams,
    rasterizer: TextRasterizer,
    bitmap: TextureBitmap,
    renderer: R,
    settings: ExportSettings,
    export_flag: ExportFlag,
    /// `text_version` the texture was last built from, `None` once an export
    /// has replaced it with a prefix
    texture_version: Option<u64>,
    last_render_time: f32,
}

impl<R: FrameRenderer> Studio<R> {
    pub fn new(
        renderer: R,
        rasterizer: TextRasterizer,
        params: SharedParams,
        settings: ExportSettings,
    ) -> Self {
        let (width, height) = renderer.size();
        Self {
            params,
            rasterizer,
            bitmap: TextureBitmap::new(width, height),
            renderer,
            settings,
            export_flag: ExportFlag::new(),
            texture_version: None,
            last_render_time: 0.0,
        }
    }

    pub fn params(&self) -> &SharedParams {
        &self.params
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ExportSettings) {
        self.settings = settings;
    }

    /// Handle to the export-in-progress flag, for UI code that needs to poll it
    pub fn export_flag(&self) -> ExportFlag {
        self.export_flag.clone()
    }

    pub fn is_exporting(&self) -> bool {
        self.export_flag.is_set()
    }

    /// Replace the text and rebuild the texture
    pub fn update_text(&mut self, text: impl Into<String>) -> Result<(), RenderError> {
        self.params.set_text(text);
        let snapshot = self.params.snapshot();
        self.sync_texture(&snapshot)
    }

    /// Rasterize and upload the text when it changed since the last upload
    fn sync_texture(&mut self, snapshot: &ParamSnapshot) -> Result<(), RenderError> {
        if self.texture_version == Some(snapshot.text_version) {
            return Ok(());
        }
        // Marked before rasterizing so a failing glyph is reported once, not every frame
        self.texture_version = Some(snapshot.text_version);
        if let Err(e) = self.upload_text(&snapshot.text) {
            // Never leave an older text (or an export prefix) standing in for this version
            self.bitmap.clear();
            if let Err(blank) = self.renderer.upload_texture(&self.bitmap) {
                log::warn!("Failed to blank texture: {}", blank);
            }
            return Err(e);
        }
        log::debug!("Texture re-rasterized (text version {})", snapshot.text_version);
        Ok(())
    }

    fn upload_text(&mut self, style: &TextStyle) -> Result<(), RenderError> {
        self.rasterizer.rasterize_into(style, &mut self.bitmap)?;
        self.renderer.upload_texture(&self.bitmap)
    }

    /// Draw one frame at `time_seconds` with the latest parameters
    ///
    /// Skipped while an export owns the renderer.
    pub fn render_frame(&mut self, time_seconds: f32) -> Result<FrameStatus, RenderError> {
        if self.is_exporting() {
            return Ok(FrameStatus::Skipped);
        }
        let snapshot = self.params.snapshot();
        self.sync_texture(&snapshot)?;
        self.last_render_time = time_seconds;
        self.renderer.render_frame(&snapshot.effects, time_seconds)
    }

    /// Capture still images
    ///
    /// With typing enabled, one PNG per word prefix, each rendered at time
    /// zero. Otherwise a single PNG of the current canvas. `Ok(None)` when
    /// another export is already running.
    pub fn export_still(&mut self) -> Result<Option<Vec<PathBuf>>, ExportError> {
        let Some(_ticket) = self.export_flag.try_acquire() else {
            log::warn!("Export already in progress, still export ignored");
            return Ok(None);
        };

        let snapshot = self.params.snapshot();
        let result = self.capture_stills(&snapshot);
        let restored = self.restore_texture();

        let files = result?;
        restored?;
        log::info!(
            "Still export finished: {} image(s) in {:?}",
            files.len(),
            self.settings.directory
        );
        Ok(Some(files))
    }

    fn capture_stills(&mut self, snapshot: &ParamSnapshot) -> Result<Vec<PathBuf>, ExportError> {
        let mut sink = PngSequenceSink::new(&self.settings.directory, &self.settings.still_prefix)?;

        if snapshot.animation.typing_enabled {
            let schedule = still_schedule(&snapshot.text.content, FRAME_RATE);
            self.capture_schedule(&snapshot.text, &schedule, &mut sink)?;
        } else {
            // Current canvas: same text, same time as the last drawn frame
            let frame = AnimationFrameSpec {
                text_snapshot: snapshot.text.content.clone(),
                simulated_time_seconds: self.last_render_time,
                delay_ms: 0,
            };
            self.capture_schedule(&snapshot.text, std::slice::from_ref(&frame), &mut sink)?;
        }

        sink.finish()
    }

    /// Capture an animated GIF
    ///
    /// Typing-reveal when enabled, otherwise two seconds of the running
    /// effects. `Ok(None)` when another export is already running.
    pub fn export_animated(&mut self) -> Result<Option<PathBuf>, ExportError> {
        let Some(_ticket) = self.export_flag.try_acquire() else {
            log::warn!("Export already in progress, animated export ignored");
            return Ok(None);
        };

        let snapshot = self.params.snapshot();
        let path = self.settings.animation_path();
        let result = self.capture_animation(&snapshot, &path);
        let restored = self.restore_texture();

        let frames = result?;
        restored?;
        log::info!("Animated export finished: {} frames -> {:?}", frames, path);
        Ok(Some(path))
    }

    fn capture_animation(
        &mut self,
        snapshot: &ParamSnapshot,
        path: &Path,
    ) -> Result<usize, ExportError> {
        let animation = &snapshot.animation;
        let schedule = if animation.typing_enabled {
            typing_schedule(
                &snapshot.text.content,
                animation.typing_frame_duration_ms,
                animation.typing_end_pause_ms,
                FRAME_RATE,
            )
        } else {
            continuous_schedule(&snapshot.text.content, FRAME_RATE)
        };

        let mut sink = GifSink::new(path)?;
        self.capture_schedule(&snapshot.text, &schedule, &mut sink)?;
        sink.finish()?;
        Ok(schedule.len())
    }

    /// Render every scheduled frame in order and hand it to `sink`
    ///
    /// The texture is rebuilt only when the text snapshot changes between
    /// frames. Effect parameters are read fresh for every frame.
    fn capture_schedule(
        &mut self,
        style: &TextStyle,
        schedule: &[AnimationFrameSpec],
        sink: &mut dyn FrameSink,
    ) -> Result<(), ExportError> {
        let mut current_text: Option<&str> = None;

        for frame in schedule {
            if current_text != Some(frame.text_snapshot.as_str()) {
                self.texture_version = None;
                self.upload_text(&style.with_content(frame.text_snapshot.as_str()))?;
                current_text = Some(frame.text_snapshot.as_str());
            }

            let effects = self.params.snapshot().effects;
            if self
                .renderer
                .render_frame(&effects, frame.simulated_time_seconds)?
                == FrameStatus::Skipped
            {
                log::warn!("Frame at t={} skipped", frame.simulated_time_seconds);
            }
            let pixels = self.renderer.read_pixels()?;
            sink.push(pixels, frame)?;
        }

        Ok(())
    }

    /// Put the full, current text back on the texture
    fn restore_texture(&mut self) -> Result<(), RenderError> {
        let snapshot = self.params.snapshot();
        self.texture_version = None;
        self.sync_texture(&snapshot)
    }
}

impl Studio<GpuFrameRenderer> {
    /// Draw one frame straight into a window surface view
    pub fn present(
        &mut self,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        target_size: (u32, u32),
        time_seconds: f32,
    ) -> Result<FrameStatus, RenderError> {
        if self.is_exporting() {
            return Ok(FrameStatus::Skipped);
        }
        let snapshot = self.params.snapshot();
        self.sync_texture(&snapshot)?;
        self.last_render_time = time_seconds;
        self.renderer
            .render_to_view(view, format, target_size, &snapshot.effects, time_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phosphor_core::{AnimationSettings, EffectParameters};
    use phosphor_renderer::{MockGlyphSource, RecordingRenderer};

    fn studio(text: &str) -> Studio<RecordingRenderer> {
        let params = SharedParams::new(
            EffectParameters::default(),
            TextStyle {
                content: text.to_string(),
                ..Default::default()
            },
            AnimationSettings::default(),
        );
        Studio::new(
            RecordingRenderer::new(64, 64),
            TextRasterizer::new(Box::new(MockGlyphSource::new())),
            params,
            ExportSettings::new(std::env::temp_dir().join("phosphor-studio-unit")),
        )
    }

    #[test]
    fn test_first_frame_uploads_once() {
        let mut studio = studio("HELLO");
        studio.render_frame(0.0).unwrap();
        studio.render_frame(0.5).unwrap();
        assert_eq!(studio.renderer().upload_count(), 1);
        assert_eq!(studio.renderer().render_times(), vec![0.0, 0.5]);
    }

    #[test]
    fn test_effect_change_does_not_reupload() {
        let mut studio = studio("HELLO");
        studio.render_frame(0.0).unwrap();
        studio.params().update(|effects, _, _| effects.blur_amount = 2.0);
        studio.render_frame(0.1).unwrap();
        assert_eq!(studio.renderer().upload_count(), 1);
    }

    #[test]
    fn test_update_text_uploads_immediately() {
        let mut studio = studio("HELLO");
        studio.update_text("WORLD").unwrap();
        assert_eq!(studio.renderer().upload_count(), 1);
        assert_eq!(studio.params().snapshot().text.content, "WORLD");

        studio.render_frame(0.0).unwrap();
        assert_eq!(studio.renderer().upload_count(), 1);
    }

    #[test]
    fn test_render_skipped_while_exporting() {
        let mut studio = studio("HELLO");
        let flag = studio.export_flag();
        let _ticket = flag.try_acquire().unwrap();
        assert!(studio.is_exporting());
        assert_eq!(studio.render_frame(0.0).unwrap(), FrameStatus::Skipped);
        assert_eq!(studio.renderer().render_count(), 0);
    }
}

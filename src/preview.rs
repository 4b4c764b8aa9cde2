//! Interactive preview window
//!
//! One window, one surface, one studio. Redraws are requested from
//! `about_to_wait` at display rate; `S` exports a still, `G` an animation,
//! `Esc` quits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use phosphor::export::ExportSettings;
use phosphor::studio::Studio;
use phosphor_config::{ConfigEvent, ConfigWatcher};
use phosphor_core::SharedParams;
use phosphor_renderer::{FrameStatus, GpuContext, GpuFrameRenderer, TextRasterizer};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

const TARGET_FRAME_TIME: Duration = Duration::from_micros(16_666);

/// Stop handle for a running preview
///
/// Cloneable; stopping twice, or before the window exists, is harmless.
#[derive(Debug, Clone, Default)]
pub struct PreviewLoop {
    stopped: Arc<AtomicBool>,
}

impl PreviewLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            log::info!("Preview stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Everything the preview needs before the window exists
pub struct PreviewOptions {
    pub params: SharedParams,
    pub settings: ExportSettings,
    pub texture_size: u32,
    pub config_watcher: Option<ConfigWatcher>,
}

struct WindowState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    studio: Studio<GpuFrameRenderer>,
}

impl WindowState {
    fn create(
        event_loop: &ActiveEventLoop,
        options: &PreviewOptions,
        rasterizer: TextRasterizer,
    ) -> Result<Self> {
        let size = options.texture_size;
        let window_attrs = Window::default_attributes()
            .with_title("phosphor")
            .with_inner_size(winit::dpi::PhysicalSize::new(size, size));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("failed to create window")?,
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let context = GpuContext::from_instance(instance, Some(&surface))?;

        let caps = surface.get_capabilities(&context.adapter);
        // Colors are authored in sRGB already; an sRGB view would encode twice
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let inner = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: inner.width.max(1),
            height: inner.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &surface_config);
        log::info!("Surface {:?} {}x{}", format, surface_config.width, surface_config.height);

        let renderer = GpuFrameRenderer::new(context, size, size);
        let studio = Studio::new(
            renderer,
            rasterizer,
            options.params.clone(),
            options.settings.clone(),
        );

        Ok(Self {
            window,
            surface,
            surface_config,
            studio,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        let device = &self.studio.renderer().context().device;
        self.surface.configure(device, &self.surface_config);
    }

    fn redraw(&mut self, time_seconds: f32) {
        if self.studio.is_exporting() {
            return;
        }

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (w, h) = (self.surface_config.width, self.surface_config.height);
                self.resize(w, h);
                return;
            }
            Err(e) => {
                log::warn!("Skipping frame: {}", e);
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let target = (self.surface_config.width, self.surface_config.height);

        match self
            .studio
            .present(&view, self.surface_config.format, target, time_seconds)
        {
            Ok(FrameStatus::Drawn) => {
                self.window.pre_present_notify();
                frame.present();
            }
            Ok(FrameStatus::Skipped) => {}
            Err(e) => log::error!("Frame failed: {}", e),
        }
    }

    fn export_still(&mut self) {
        match self.studio.export_still() {
            Ok(Some(files)) => {
                for file in files {
                    println!("{}", file.display());
                }
            }
            Ok(None) => {}
            Err(e) => log::error!("Still export failed: {}", e),
        }
    }

    fn export_animated(&mut self) {
        match self.studio.export_animated() {
            Ok(Some(path)) => println!("{}", path.display()),
            Ok(None) => {}
            Err(e) => log::error!("Animated export failed: {}", e),
        }
    }
}

struct PreviewApp {
    options: PreviewOptions,
    rasterizer: Option<TextRasterizer>,
    state: Option<WindowState>,
    handle: PreviewLoop,
    started: Instant,
    last_frame_time: Instant,
    error: Option<anyhow::Error>,
}

impl PreviewApp {
    fn reload_config(&mut self) {
        let Some(watcher) = self.options.config_watcher.as_ref() else {
            return;
        };
        for event in watcher.drain_events() {
            match event {
                ConfigEvent::Reloaded(config) => {
                    config.publish(&self.options.params);
                    if let Some(state) = self.state.as_mut() {
                        state
                            .studio
                            .set_settings(ExportSettings::from_output(&config.output));
                    }
                    log::info!("Config reloaded");
                }
                ConfigEvent::ReloadError(e) => log::warn!("Keeping previous config: {}", e),
            }
        }
    }
}

impl ApplicationHandler for PreviewApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let Some(rasterizer) = self.rasterizer.take() else {
            return;
        };
        match WindowState::create(event_loop, &self.options, rasterizer) {
            Ok(state) => self.state = Some(state),
            Err(e) => {
                log::error!("Preview setup failed: {:#}", e);
                self.error = Some(e);
                self.handle.stop();
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else { return };

        match event {
            WindowEvent::CloseRequested => {
                self.handle.stop();
                event_loop.exit();
            }

            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match &event.logical_key {
                    Key::Named(NamedKey::Escape) => {
                        self.handle.stop();
                        event_loop.exit();
                    }
                    Key::Character(c) if c.eq_ignore_ascii_case("s") => state.export_still(),
                    Key::Character(c) if c.eq_ignore_ascii_case("g") => state.export_animated(),
                    _ => {}
                }
            }

            WindowEvent::Resized(size) => state.resize(size.width, size.height),

            WindowEvent::RedrawRequested => {
                let time = self.started.elapsed().as_secs_f32();
                state.redraw(time);
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.handle.is_stopped() {
            event_loop.exit();
            return;
        }

        self.reload_config();

        if self.last_frame_time.elapsed() >= TARGET_FRAME_TIME {
            self.last_frame_time = Instant::now();
            if let Some(state) = self.state.as_ref() {
                state.window.request_redraw();
            }
        }
    }
}

/// Open the preview window and block until it closes
pub fn run(
    options: PreviewOptions,
    rasterizer: TextRasterizer,
    handle: PreviewLoop,
) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = PreviewApp {
        options,
        rasterizer: Some(rasterizer),
        state: None,
        handle,
        started: Instant::now(),
        last_frame_time: Instant::now(),
        error: None,
    };
    event_loop.run_app(&mut app).context("event loop failed")?;

    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_idempotent() {
        let handle = PreviewLoop::new();
        assert!(!handle.is_stopped());
        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());
    }

    #[test]
    fn test_stop_visible_through_clones() {
        let handle = PreviewLoop::new();
        let other = handle.clone();
        other.stop();
        assert!(handle.is_stopped());
    }
}

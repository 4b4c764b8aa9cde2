//! phosphor - CRT-style text effects
//!
//! Two-pass rendering:
//! 1. Rasterize text into an offscreen bitmap whenever the text changes
//! 2. Run the CRT stages over that bitmap every frame, to a window or to
//!    exported PNG/GIF files

mod cli;
mod preview;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use phosphor::export::ExportSettings;
use phosphor::font;
use phosphor::studio::Studio;
use phosphor_config::{Config, ConfigWatcher};
use phosphor_renderer::{CpuFrameRenderer, FrameRenderer, GpuFrameRenderer, TextRasterizer};

use cli::{Backend, Cli, Command, CommonArgs};
use preview::{PreviewLoop, PreviewOptions};

/// Load the config named on the command line, or the one under ~/.phosphor
fn load_config(args: &CommonArgs) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = &args.config {
        let config = Config::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        return Ok((config, Some(path.clone())));
    }

    match Config::load() {
        Ok(config) => Ok((config, Config::config_file_path().ok())),
        Err(e) => {
            log::warn!("Using built-in defaults: {}", e);
            Ok((Config::default(), None))
        }
    }
}

/// Command line flags take precedence over the file
fn apply_overrides(config: &mut Config, args: &CommonArgs) {
    if let Some(text) = &args.text {
        config.text.content = cli::unescape_text(text);
    }
    if args.typing {
        config.animation.typing = true;
    }
    if let Some(font) = &args.font {
        config.text.font_path = Some(font.clone());
    }
    if let Some(out) = &args.out {
        config.output.directory = out.clone();
    }
}

fn rasterizer_for(config: &Config) -> Result<TextRasterizer> {
    let glyphs =
        font::load_glyph_source(config.text.font_path.as_deref(), &config.text.font_family)
            .context("no usable font")?;
    Ok(TextRasterizer::new(Box::new(glyphs)))
}

fn headless_studio(config: &Config, backend: Backend) -> Result<Studio<Box<dyn FrameRenderer>>> {
    let size = config.output.texture_size();
    let renderer: Box<dyn FrameRenderer> = match backend {
        Backend::Gpu => Box::new(
            GpuFrameRenderer::headless(size, size)
                .context("GPU initialization failed (try --backend cpu)")?,
        ),
        Backend::Cpu => Box::new(CpuFrameRenderer::new(size, size)),
    };

    Ok(Studio::new(
        renderer,
        rasterizer_for(config)?,
        config.shared_params(),
        ExportSettings::from_output(&config.output),
    ))
}

fn cmd_still(args: CommonArgs) -> Result<()> {
    let (mut config, _) = load_config(&args)?;
    apply_overrides(&mut config, &args);

    let mut studio = headless_studio(&config, args.backend)?;
    if let Some(files) = studio.export_still().context("still export failed")? {
        for file in files {
            println!("{}", file.display());
        }
    }
    Ok(())
}

fn cmd_animate(args: CommonArgs) -> Result<()> {
    let (mut config, _) = load_config(&args)?;
    apply_overrides(&mut config, &args);

    let mut studio = headless_studio(&config, args.backend)?;
    if let Some(path) = studio.export_animated().context("animated export failed")? {
        println!("{}", path.display());
    }
    Ok(())
}

fn cmd_preview(args: CommonArgs) -> Result<()> {
    let (mut config, config_path) = load_config(&args)?;
    apply_overrides(&mut config, &args);

    if args.backend == Backend::Cpu {
        log::warn!("The preview window always renders on the GPU");
    }

    let config_watcher = config_path.and_then(|path| match ConfigWatcher::new(&path) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            log::warn!("Config hot reload disabled: {}", e);
            None
        }
    });

    let options = PreviewOptions {
        params: config.shared_params(),
        settings: ExportSettings::from_output(&config.output),
        texture_size: config.output.texture_size(),
        config_watcher,
    };
    preview::run(options, rasterizer_for(&config)?, PreviewLoop::new())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,phosphor=info"),
    )
    .init();

    match Cli::parse().command() {
        Command::Preview(args) => cmd_preview(args),
        Command::Still(args) => cmd_still(args),
        Command::Animate(args) => cmd_animate(args),
    }
}

//! Phosphor Configuration Management
//!
//! Handles loading and managing configuration from ~/.phosphor/config.toml
//! Supports hot-reloading and default config generation.

pub mod watcher;

pub use watcher::{ConfigEvent, ConfigWatcher, ConfigWatcherBuilder};

use phosphor_core::{
    AnimationSettings, EffectParameters, SharedParams, TextStyle, TransparencyMode,
    parse_color_or_black,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration directory name
const CONFIG_DIR_NAME: &str = ".phosphor";
/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Smallest and largest accepted texture edge
const MIN_OUTPUT_SIZE: u32 = 16;
const MAX_OUTPUT_SIZE: u32 = 4096;

/// Text section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    /// Text to render; `\n` starts a new line
    #[serde(default = "default_content")]
    pub content: String,

    /// Font size in pixels (20-200)
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    /// Line height as a multiple of the font size (0.8-2.0)
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,

    #[serde(default = "default_font_color")]
    pub font_color: String,

    /// Font families to try, in order
    #[serde(default = "default_font_family")]
    pub font_family: Vec<String>,

    /// Explicit font file, takes precedence over `font_family`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

fn default_content() -> String {
    "HELLO WORLD".to_string()
}

fn default_font_size() -> f32 {
    48.0
}

fn default_line_spacing() -> f32 {
    1.2
}

fn default_font_color() -> String {
    "#33ff66".to_string()
}

fn default_font_family() -> Vec<String> {
    vec![
        "DejaVu Sans Mono".to_string(),
        "Liberation Mono".to_string(),
        "Menlo".to_string(),
        "Courier New".to_string(),
    ]
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            content: default_content(),
            font_size: default_font_size(),
            line_spacing: default_line_spacing(),
            font_color: default_font_color(),
            font_family: default_font_family(),
            font_path: None,
        }
    }
}

/// Effects section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectsConfig {
    /// Barrel distortion strength (0-5)
    #[serde(default = "default_distortion")]
    pub distortion: f32,

    /// Zoom (0.5-10)
    #[serde(default = "default_zoom")]
    pub zoom: f32,

    /// Noise amount (0-0.2)
    #[serde(default = "default_noise")]
    pub noise: f32,

    /// Scanline intensity (0-0.5)
    #[serde(default = "default_scanline_intensity")]
    pub scanline_intensity: f32,

    /// Blur radius in texels (0-5)
    #[serde(default)]
    pub blur: f32,

    /// Glitch intensity (0-1)
    #[serde(default)]
    pub glitch: f32,

    #[serde(default = "default_background_color")]
    pub background_color: String,

    #[serde(default)]
    pub transparency: TransparencyMode,
}

fn default_distortion() -> f32 {
    0.25
}

fn default_zoom() -> f32 {
    1.0
}

fn default_noise() -> f32 {
    0.05
}

fn default_scanline_intensity() -> f32 {
    0.15
}

fn default_background_color() -> String {
    "#050d05".to_string()
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            distortion: default_distortion(),
            zoom: default_zoom(),
            noise: default_noise(),
            scanline_intensity: default_scanline_intensity(),
            blur: 0.0,
            glitch: 0.0,
            background_color: default_background_color(),
            transparency: TransparencyMode::default(),
        }
    }
}

/// Animation section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Reveal the text word by word in exports
    #[serde(default)]
    pub typing: bool,

    /// How long each intermediate word stays on screen
    #[serde(default = "default_typing_frame_ms")]
    pub typing_frame_ms: u32,

    /// How long the complete text stays on screen
    #[serde(default = "default_typing_end_pause_ms")]
    pub typing_end_pause_ms: u32,
}

fn default_typing_frame_ms() -> u32 {
    500
}

fn default_typing_end_pause_ms() -> u32 {
    1500
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            typing: false,
            typing_frame_ms: default_typing_frame_ms(),
            typing_end_pause_ms: default_typing_end_pause_ms(),
        }
    }
}

/// Output section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory exports are written to
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// File name prefix of still images
    #[serde(default = "default_still_prefix")]
    pub still_prefix: String,

    /// File name of the animated export
    #[serde(default = "default_animation_name")]
    pub animation_name: String,

    /// Edge length of the square texture and render target
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_directory() -> PathBuf {
    PathBuf::from("phosphor-export")
}

fn default_still_prefix() -> String {
    "phosphor".to_string()
}

fn default_animation_name() -> String {
    "phosphor.gif".to_string()
}

fn default_size() -> u32 {
    512
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            still_prefix: default_still_prefix(),
            animation_name: default_animation_name(),
            size: default_size(),
        }
    }
}

impl OutputConfig {
    /// Texture edge clamped to a usable range
    pub fn texture_size(&self) -> u32 {
        let size = self.size.clamp(MIN_OUTPUT_SIZE, MAX_OUTPUT_SIZE);
        if size != self.size {
            log::warn!("output size {} clamped to {}", self.size, size);
        }
        size
    }

    /// Full path of the animated export
    pub fn animation_path(&self) -> PathBuf {
        self.directory.join(&self.animation_name)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub text: TextConfig,

    #[serde(default)]
    pub effects: EffectsConfig,

    #[serde(default)]
    pub animation: AnimationConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_file_path()?;

        if !config_path.exists() {
            log::info!("Config file not found, creating default at {:?}", config_path);
            Self::create_default_config()?;
        }

        let config = Self::load_from(&config_path)?;
        log::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))
    }

    /// Get the configuration directory path (~/.phosphor/)
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(home.join(CONFIG_DIR_NAME))
    }

    /// Get the configuration file path (~/.phosphor/config.toml)
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Create the default configuration file in ~/.phosphor/
    pub fn create_default_config() -> Result<(), ConfigError> {
        Self::write_default(&Self::config_file_path()?)
    }

    /// Write the default configuration with its header comment to `path`
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDirError(dir.to_path_buf(), e))?;
        }

        let toml_content =
            toml::to_string_pretty(&Config::default()).map_err(ConfigError::SerializeError)?;

        let content = format!(
            "# Phosphor Configuration\n\
             #\n\
             # Colors accept #rgb, #rrggbb, #rrggbbaa, rgb(r, g, b) and CSS names.\n\
             # transparency: normal | transparent-text | transparent-background\n\
             # Out-of-range values are clamped when loaded.\n\
             \n\
             {toml_content}"
        );

        fs::write(path, content).map_err(|e| ConfigError::WriteError(path.to_path_buf(), e))?;

        log::info!("Created default configuration at {:?}", path);
        Ok(())
    }

    /// Effect parameters, clamped into range
    pub fn effect_parameters(&self) -> EffectParameters {
        let e = &self.effects;
        EffectParameters {
            distortion: e.distortion,
            zoom: e.zoom,
            noise_amount: e.noise,
            scanline_intensity: e.scanline_intensity,
            blur_amount: e.blur,
            glitch_intensity: e.glitch,
            background_color: parse_color_or_black(&e.background_color),
            transparency: e.transparency,
        }
        .sanitized()
    }

    /// Text style, clamped into range
    pub fn text_style(&self) -> TextStyle {
        let t = &self.text;
        TextStyle {
            content: t.content.clone(),
            font_size_px: t.font_size,
            line_spacing: t.line_spacing,
            font_color: parse_color_or_black(&t.font_color),
            background_color: parse_color_or_black(&self.effects.background_color),
            transparency: self.effects.transparency,
        }
        .sanitized()
    }

    pub fn animation_settings(&self) -> AnimationSettings {
        AnimationSettings {
            typing_enabled: self.animation.typing,
            typing_frame_duration_ms: self.animation.typing_frame_ms,
            typing_end_pause_ms: self.animation.typing_end_pause_ms,
        }
    }

    /// Fresh shared parameter snapshot holding this configuration
    pub fn shared_params(&self) -> SharedParams {
        SharedParams::new(
            self.effect_parameters(),
            self.text_style(),
            self.animation_settings(),
        )
    }

    /// Publish this configuration into an existing snapshot
    pub fn publish(&self, params: &SharedParams) {
        params.replace(
            self.effect_parameters(),
            self.text_style(),
            self.animation_settings(),
        );
    }
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    /// Home directory not found
    NoHomeDirectory,
    /// Failed to read config file
    ReadError(PathBuf, std::io::Error),
    /// Failed to parse config file
    ParseError(PathBuf, toml::de::Error),
    /// Failed to serialize config
    SerializeError(toml::ser::Error),
    /// Failed to write config file
    WriteError(PathBuf, std::io::Error),
    /// Failed to create directory
    CreateDirError(PathBuf, std::io::Error),
    /// Failed to set up file watcher
    WatchError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoHomeDirectory => write!(f, "Could not determine home directory"),
            ConfigError::ReadError(path, e) => write!(f, "Failed to read {:?}: {}", path, e),
            ConfigError::ParseError(path, e) => write!(f, "Failed to parse {:?}: {}", path, e),
            ConfigError::SerializeError(e) => write!(f, "Failed to serialize config: {}", e),
            ConfigError::WriteError(path, e) => write!(f, "Failed to write {:?}: {}", path, e),
            ConfigError::CreateDirError(path, e) => write!(f, "Failed to create {:?}: {}", path, e),
            ConfigError::WatchError(e) => write!(f, "Failed to watch files: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use phosphor_core::Color;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.text.content, "HELLO WORLD");
        assert_eq!(config.text.font_size, 48.0);
        assert_eq!(config.effects.transparency, TransparencyMode::Normal);
        assert!(!config.animation.typing);
        assert_eq!(config.output.size, 512);
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config() {
        let partial = r#"
            [effects]
            glitch = 0.4
            transparency = "transparent-text"
        "#;
        let config: Config = toml::from_str(partial).unwrap();
        assert_eq!(config.effects.glitch, 0.4);
        assert_eq!(config.effects.transparency, TransparencyMode::TransparentText);
        // Other fields should have defaults
        assert_eq!(config.effects.zoom, 1.0);
        assert_eq!(config.text.line_spacing, 1.2);
    }

    #[test]
    fn test_unknown_transparency_rejected() {
        let bad = r#"
            [effects]
            transparency = "invisible"
        "#;
        assert!(toml::from_str::<Config>(bad).is_err());
    }

    #[test]
    fn test_parameters_are_clamped() {
        let mut config = Config::default();
        config.effects.distortion = 12.0;
        config.effects.noise = -3.0;
        config.text.font_size = 5.0;
        config.text.line_spacing = 3.0;

        let effects = config.effect_parameters();
        assert_eq!(effects.distortion, 5.0);
        assert_eq!(effects.noise_amount, 0.0);

        let text = config.text_style();
        assert_eq!(text.font_size_px, 20.0);
        assert_eq!(text.line_spacing, 2.0);
    }

    #[test]
    fn test_malformed_color_falls_back_to_black() {
        let mut config = Config::default();
        config.text.font_color = "not-a-color".to_string();
        config.effects.background_color = "#12345".to_string();

        assert_eq!(config.text_style().font_color, Color::BLACK);
        assert_eq!(config.effect_parameters().background_color, Color::BLACK);
    }

    #[test]
    fn test_write_default_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::write_default(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Phosphor Configuration"));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_load_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[effects\nzoom = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/phosphor.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(..)));
    }

    #[test]
    fn test_publish_bumps_text_version() {
        let config = Config::default();
        let shared = config.shared_params();
        assert_eq!(shared.snapshot().text_version, 0);

        let mut changed = config.clone();
        changed.text.content = "NEW".to_string();
        changed.publish(&shared);

        let snap = shared.snapshot();
        assert_eq!(snap.text.content, "NEW");
        assert_eq!(snap.text_version, 1);
    }

    #[test]
    fn test_output_size_clamped() {
        let output = OutputConfig {
            size: 2,
            ..Default::default()
        };
        assert_eq!(output.texture_size(), MIN_OUTPUT_SIZE);
        assert_eq!(
            OutputConfig::default().animation_path(),
            PathBuf::from("phosphor-export/phosphor.gif")
        );
    }
}

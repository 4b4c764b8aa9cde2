//! Configuration Hot-Reload
//!
//! Watches the config file for changes, sending reload events through a
//! channel for the preview loop to publish into the shared parameters.

use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use crate::{Config, ConfigError};

/// Events emitted by the configuration watcher
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// Configuration file changed, contains new config
    Reloaded(Config),
    /// Error occurred during reload
    ReloadError(String),
}

/// Watches a configuration file for changes
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<ConfigEvent>,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Watch `path` with the default 100ms debounce
    pub fn new(path: &Path) -> Result<Self, ConfigError> {
        ConfigWatcherBuilder::new().build(path)
    }

    fn with_debounce(path: &Path, debounce: Duration) -> Result<Self, ConfigError> {
        let (tx, rx) = mpsc::channel();

        let config_file = path.to_path_buf();
        // Events carry absolute, resolved paths
        let resolved = path.canonicalize().unwrap_or_else(|_| config_file.clone());
        let watch_dir = match resolved.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let file_for_events = resolved;
        let mut last_event: Option<Instant> = None;

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    // Editors either rewrite in place or rename a new file over the old one
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    if !event.paths.iter().any(|p| p == &file_for_events) {
                        return;
                    }

                    let now = Instant::now();
                    if let Some(last) = last_event {
                        if now.duration_since(last) < debounce {
                            return;
                        }
                    }
                    last_event = Some(now);

                    log::info!("Config file changed, reloading...");
                    match Config::load_from(&file_for_events) {
                        Ok(new_config) => {
                            let _ = tx.send(ConfigEvent::Reloaded(new_config));
                        }
                        Err(e) => {
                            log::error!("Failed to reload config: {}", e);
                            let _ = tx.send(ConfigEvent::ReloadError(e.to_string()));
                        }
                    }
                }
                Err(e) => {
                    log::error!("Watch error: {:?}", e);
                }
            },
            NotifyConfig::default().with_poll_interval(Duration::from_secs(1)),
        )
        .map_err(|e| ConfigError::WatchError(e.to_string()))?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::WatchError(e.to_string()))?;
        log::info!("Watching config file: {:?}", config_file);

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            path: config_file,
        })
    }

    /// The file being watched
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to receive a config event without blocking
    pub fn try_recv(&self) -> Option<ConfigEvent> {
        self.receiver.try_recv().ok()
    }

    /// Get all pending events
    pub fn drain_events(&self) -> Vec<ConfigEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Builder for creating a ConfigWatcher with custom options
pub struct ConfigWatcherBuilder {
    debounce_ms: u64,
}

impl Default for ConfigWatcherBuilder {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

impl ConfigWatcherBuilder {
    /// Create a new builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set debounce duration in milliseconds
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Build the watcher for `path`
    pub fn build(self, path: &Path) -> Result<ConfigWatcher, ConfigError> {
        ConfigWatcher::with_debounce(path, Duration::from_millis(self.debounce_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_event_debug() {
        let event = ConfigEvent::Reloaded(Config::default());
        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("Reloaded"));
    }

    #[test]
    fn test_reload_error_event() {
        let event = ConfigEvent::ReloadError("test error".to_string());
        match event {
            ConfigEvent::ReloadError(msg) => assert_eq!(msg, "test error"),
            _ => panic!("Expected ReloadError"),
        }
    }

    #[test]
    fn test_watcher_builder_default() {
        let builder = ConfigWatcherBuilder::new();
        assert_eq!(builder.debounce_ms, 100);
        assert_eq!(ConfigWatcherBuilder::new().debounce_ms(250).debounce_ms, 250);
    }

    #[test]
    fn test_watch_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::write_default(&path).unwrap();

        let watcher = ConfigWatcher::new(&path).unwrap();
        assert_eq!(watcher.path(), path.as_path());
        assert!(watcher.try_recv().is_none());
    }

    #[test]
    fn test_watch_missing_directory_fails() {
        let result = ConfigWatcher::new(Path::new("/nonexistent/phosphor/config.toml"));
        assert!(matches!(result, Err(ConfigError::WatchError(_))));
    }
}

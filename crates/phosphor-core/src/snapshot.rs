//! Versioned parameter snapshot shared between the UI and the render loop
//!
//! One writer (the UI or the config watcher) publishes new values; the render
//! loop takes a full copy at the start of every frame. Versions let readers
//! detect what changed without comparing fields.

use std::sync::{Arc, RwLock};

use crate::params::{AnimationSettings, EffectParameters, TextStyle};

/// A consistent copy of every user parameter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamSnapshot {
    /// Bumped on every publish
    pub version: u64,
    /// Bumped only when `text` changes
    pub text_version: u64,
    pub effects: EffectParameters,
    pub text: TextStyle,
    pub animation: AnimationSettings,
}

/// Cloneable handle to the shared parameter snapshot
#[derive(Debug, Clone, Default)]
pub struct SharedParams {
    inner: Arc<RwLock<ParamSnapshot>>,
}

impl SharedParams {
    pub fn new(effects: EffectParameters, text: TextStyle, animation: AnimationSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ParamSnapshot {
                version: 0,
                text_version: 0,
                effects: effects.sanitized(),
                text: text.sanitized(),
                animation,
            })),
        }
    }

    /// Copy of the current values
    pub fn snapshot(&self) -> ParamSnapshot {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            // A panicking writer cannot leave a scalar field half written
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Current version without copying the values
    pub fn version(&self) -> u64 {
        self.snapshot_ref(|s| s.version)
    }

    fn snapshot_ref<T>(&self, f: impl FnOnce(&ParamSnapshot) -> T) -> T {
        match self.inner.read() {
            Ok(guard) => f(&*guard),
            Err(poisoned) => {
                let guard = poisoned.into_inner();
                f(&*guard)
            }
        }
    }

    /// Apply a change and publish it
    ///
    /// Values are sanitized after `f` runs, so readers never observe an
    /// out-of-range field.
    pub fn update(&self, f: impl FnOnce(&mut EffectParameters, &mut TextStyle, &mut AnimationSettings)) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let snapshot = &mut *guard;
        let old_text = snapshot.text.clone();
        f(
            &mut snapshot.effects,
            &mut snapshot.text,
            &mut snapshot.animation,
        );
        snapshot.effects = snapshot.effects.sanitized();
        snapshot.text = snapshot.text.sanitized();

        snapshot.version += 1;
        if snapshot.text != old_text {
            snapshot.text_version += 1;
        }
    }

    /// Replace the text content
    pub fn set_text(&self, content: impl Into<String>) {
        let content = content.into();
        self.update(|_, text, _| text.content = content);
    }

    /// Replace every value at once (e.g. after a config reload)
    pub fn replace(&self, effects: EffectParameters, text: TextStyle, animation: AnimationSettings) {
        self.update(|e, t, a| {
            *e = effects;
            *t = text;
            *a = animation;
        });
    }
}

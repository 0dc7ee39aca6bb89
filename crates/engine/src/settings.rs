//! Read-only access to the host's application settings.
//!
//! Builder options may reference ordinary app settings with `${key}` tokens.
//! The host injects an accessor instead of the engine reaching for a global,
//! so the engine stays testable without a real document system.
//!
//! Invariants:
//! - While the app-settings section itself is being processed the accessor
//!   reports `InProgress` and tokens are left as written.
//! - `SharedAppSettings` always hands out the most recently published snapshot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::section::AppSettings;

/// What the host can offer for self-referential token resolution.
#[derive(Debug, Clone)]
pub enum SettingsSnapshot {
    /// App settings are being processed right now; do not read them.
    InProgress,
    /// The current (or most recently processed) app settings.
    Ready(Arc<AppSettings>),
}

/// Source of app settings for resolving tokens inside builder options.
///
/// Implementations that call back into the host's loading machinery should
/// report failures as `BuilderError::Host`.
pub trait SettingsAccessor: Send + Sync {
    fn snapshot(&self) -> Result<SettingsSnapshot>;
}

/// Accessor backed by a snapshot the host publishes as it loads sections.
#[derive(Debug, Default)]
pub struct SharedAppSettings {
    current: RwLock<Arc<AppSettings>>,
    in_progress: AtomicUsize,
}

impl SharedAppSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-known set of settings.
    pub fn with_settings(settings: AppSettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
            in_progress: AtomicUsize::new(0),
        }
    }

    /// Replace the published snapshot.
    pub fn publish(&self, settings: AppSettings) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Arc::new(settings);
    }

    /// Mark app settings as mid-processing until the guard drops.
    pub fn begin_processing(&self) -> ProcessingGuard<'_> {
        self.in_progress.fetch_add(1, Ordering::SeqCst);
        ProcessingGuard { owner: self }
    }

    pub fn is_processing(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst) > 0
    }

    /// The published snapshot, regardless of processing state.
    pub fn current(&self) -> Arc<AppSettings> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }
}

impl SettingsAccessor for SharedAppSettings {
    fn snapshot(&self) -> Result<SettingsSnapshot> {
        if self.is_processing() {
            return Ok(SettingsSnapshot::InProgress);
        }
        Ok(SettingsSnapshot::Ready(self.current()))
    }
}

/// Clears the in-progress mark of a `SharedAppSettings` on drop.
#[must_use = "app settings stop being marked in progress when the guard drops"]
pub struct ProcessingGuard<'a> {
    owner: &'a SharedAppSettings,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.owner.in_progress.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fixed settings, handy for hosts that resolve options up front.
impl SettingsAccessor for HashMap<String, String> {
    fn snapshot(&self) -> Result<SettingsSnapshot> {
        let settings = self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<AppSettings>();
        Ok(SettingsSnapshot::Ready(Arc::new(settings)))
    }
}

//! Persisted user preferences.

mod atomic;

pub use atomic::{atomic_read_json, atomic_write_json};

use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Preferences remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlamaLinkSettings {
    /// Unix time of the last completed (non report-only) run.
    pub last_sync_time: i64,
    pub skip_config_presets: bool,
    pub overwrite_config_presets: bool,
    pub report_only: bool,
}

impl LlamaLinkSettings {
    /// Load settings from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let settings: Self = atomic_read_json(path)?.unwrap_or_default();
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write_json(path, self)
    }

    /// Record a completed sync at the current time.
    pub fn touch(&mut self) {
        self.last_sync_time = Utc::now().timestamp();
    }
}

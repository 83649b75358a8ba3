//! Centralized configuration for llamalink.
//!
//! Constants are grouped in unit structs; the runtime configuration is the
//! [`LinkConfig`] value handed to every component constructor.

use crate::error::Result;
use crate::paths;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Naming and layout defaults for the destination tree.
pub struct LinkDefaults;

impl LinkDefaults {
    /// Extension (without the dot) carried by model files and their links.
    pub const MODEL_EXTENSION: &'static str = "gguf";
    /// Marker appended to per-model destination directory names.
    pub const DIR_SUFFIX: &'static str = "-GGUF";
    /// Author segment used when an identifier has no namespace.
    pub const UNKNOWN_AUTHOR: &'static str = "unknown";
}

/// External command settings for the Ollama model source.
pub struct CommandConfig;

impl CommandConfig {
    pub const OLLAMA_BIN: &'static str = "ollama";
    pub const LIST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);
    /// Prefix of the modelfile line that names the backing blob.
    pub const MODELFILE_PATH_MARKER: &'static str = "FROM ";
}

/// Directory and file names used to locate default paths.
pub struct PathsConfig;

impl PathsConfig {
    pub const OLLAMA_MODELS_ENV: &'static str = "OLLAMA_MODELS";
    pub const OLLAMA_DIR_NAME: &'static str = ".ollama";
    pub const MODELS_DIR_NAME: &'static str = "models";
    pub const LM_STUDIO_DIR_NAME: &'static str = "lm-studio";
    pub const CONFIG_PRESETS_DIR_NAME: &'static str = "config-presets";
    pub const CONFIG_MAP_FILENAME: &'static str = "config.map.json";
    pub const APP_CONFIG_DIR_NAME: &'static str = "llamalink";
    pub const SETTINGS_FILENAME: &'static str = "config.json";
}

/// Runtime configuration shared by the reconciliation components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Root of the content-addressed store (read-only ground truth).
    pub source_root: PathBuf,
    /// Root of the directory-per-model destination tree.
    pub dest_root: PathBuf,
    /// Extension, without the dot, that links must carry.
    pub extension: String,
    /// Marker appended to destination directory names.
    pub dir_suffix: String,
}

impl LinkConfig {
    /// Create a configuration with the default extension and suffix.
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            extension: LinkDefaults::MODEL_EXTENSION.to_string(),
            dir_suffix: LinkDefaults::DIR_SUFFIX.to_string(),
        }
    }

    /// Build a configuration from optional overrides, falling back to the
    /// platform default locations.
    pub fn resolve(source_root: Option<&Path>, dest_root: Option<&Path>) -> Result<Self> {
        let source_root = match source_root {
            Some(path) => path.to_path_buf(),
            None => paths::default_ollama_models_dir()?,
        };
        let dest_root = match dest_root {
            Some(path) => path.to_path_buf(),
            None => paths::default_lm_studio_models_dir()?,
        };
        Ok(Self::new(source_root, dest_root))
    }

    /// Dotted suffix links must end with, e.g. `.gguf`.
    pub fn dotted_extension(&self) -> String {
        format!(".{}", self.extension)
    }
}

//! Default filesystem locations.
//!
//! # Platform Behavior
//! Home-relative paths come from the `dirs` crate, which handles the
//! per-platform home and config directory lookups.

use crate::config::PathsConfig;
use crate::error::{LinkError, Result};
use std::path::PathBuf;

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| LinkError::Config {
        message: "Could not determine home directory".to_string(),
    })
}

/// Ollama's model store.
///
/// Honours `OLLAMA_MODELS` the way Ollama itself does, else `~/.ollama/models`.
pub fn default_ollama_models_dir() -> Result<PathBuf> {
    if let Some(custom) = std::env::var_os(PathsConfig::OLLAMA_MODELS_ENV) {
        if !custom.is_empty() {
            return Ok(PathBuf::from(custom));
        }
    }
    Ok(home_dir()?
        .join(PathsConfig::OLLAMA_DIR_NAME)
        .join(PathsConfig::MODELS_DIR_NAME))
}

/// LM Studio's model tree: `~/.cache/lm-studio/models`.
pub fn default_lm_studio_models_dir() -> Result<PathBuf> {
    Ok(lm_studio_root()?.join(PathsConfig::MODELS_DIR_NAME))
}

/// LM Studio's config-preset directory: `~/.cache/lm-studio/config-presets`.
pub fn default_config_presets_dir() -> Result<PathBuf> {
    Ok(lm_studio_root()?.join(PathsConfig::CONFIG_PRESETS_DIR_NAME))
}

/// Location of the persisted user settings.
///
/// # Platform Behavior
/// - **Linux**: `~/.config/llamalink/config.json`
/// - **Windows**: `%APPDATA%\llamalink\config.json`
/// - **macOS**: `~/Library/Application Support/llamalink/config.json`
pub fn default_settings_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| LinkError::Config {
        message: "Could not determine platform config directory".to_string(),
    })?;
    Ok(config_dir
        .join(PathsConfig::APP_CONFIG_DIR_NAME)
        .join(PathsConfig::SETTINGS_FILENAME))
}

fn lm_studio_root() -> Result<PathBuf> {
    Ok(home_dir()?
        .join(".cache")
        .join(PathsConfig::LM_STUDIO_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lm_studio_dirs_share_root() {
        if dirs::home_dir().is_none() {
            return;
        }
        let models = default_lm_studio_models_dir().unwrap();
        let presets = default_config_presets_dir().unwrap();
        assert!(models.ends_with("lm-studio/models"));
        assert_eq!(models.parent(), presets.parent());
    }

    #[test]
    fn test_settings_path_file_name() {
        if dirs::config_dir().is_none() {
            return;
        }
        let path = default_settings_path().unwrap();
        assert!(path.ends_with("llamalink/config.json"));
    }
}

//! LM Studio config presets.
//!
//! LM Studio keeps `config.map.json` in its preset directory; the
//! `preset_map` object maps model name patterns to preset files living
//! next to it.

use crate::config::PathsConfig;
use crate::error::{LinkError, Result};
use crate::settings::{atomic_read_json, atomic_write_json};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Substring of a model name → preset file applied to it.
const PRESET_RULES: &[(&str, &str)] = &[("codellama", "codellama_instruct.preset.json")];

const PRESET_MAP_KEY: &str = "preset_map";

fn default_preset() -> Value {
    json!({
        "name": "Default Preset",
        "inference_params": {
            "input_prefix": "### Instruction:\n",
            "input_suffix": "\n### Response:\n",
            "antiprompt": ["### Instruction:"],
            "pre_prompt": "Below is an instruction that describes a task. Write a response that appropriately completes the request.",
            "pre_prompt_suffix": "\n",
            "pre_prompt_prefix": ""
        }
    })
}

/// Preset file for `model`, if any rule applies.
pub fn preset_for(model: &str) -> Option<&'static str> {
    let lowered = model.to_lowercase();
    PRESET_RULES
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, file)| *file)
}

/// What a preset sync changed.
#[derive(Debug, Clone, Default)]
pub struct PresetSyncReport {
    pub written: Vec<PathBuf>,
    /// `(model, preset file)` pairs recorded in the map.
    pub mapped: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct PresetSync {
    presets_dir: PathBuf,
}

impl PresetSync {
    pub fn new(presets_dir: impl Into<PathBuf>) -> Self {
        Self {
            presets_dir: presets_dir.into(),
        }
    }

    pub fn presets_dir(&self) -> &Path {
        &self.presets_dir
    }

    fn map_path(&self) -> PathBuf {
        self.presets_dir.join(PathsConfig::CONFIG_MAP_FILENAME)
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        let path = self.map_path();
        match atomic_read_json::<Value>(&path)? {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(LinkError::Config {
                message: format!("{} is not a JSON object", path.display()),
            }),
        }
    }

    /// Ensure preset files exist for `models` and map each model to its preset.
    pub fn sync(&self, models: &[String], overwrite: bool) -> Result<PresetSyncReport> {
        let mut config_map = self.read_map()?;
        let mut report = PresetSyncReport::default();

        for model in models {
            let Some(preset_file) = preset_for(model) else {
                continue;
            };

            let preset_path = self.presets_dir.join(preset_file);
            if overwrite || !preset_path.exists() {
                if let Err(e) = atomic_write_json(&preset_path, &default_preset()) {
                    warn!("Failed to create config preset file {}: {}", preset_file, e);
                    continue;
                }
                report.written.push(preset_path);
            }

            let preset_map = config_map
                .entry(PRESET_MAP_KEY)
                .or_insert_with(|| Value::Object(Map::new()));
            if !preset_map.is_object() {
                *preset_map = Value::Object(Map::new());
            }
            if let Value::Object(preset_map) = preset_map {
                preset_map.insert(model.clone(), Value::String(preset_file.to_string()));
            }
            debug!("Mapped {} to preset {}", model, preset_file);
            report.mapped.push((model.clone(), preset_file.to_string()));
        }

        if !report.mapped.is_empty() {
            atomic_write_json(&self.map_path(), &Value::Object(config_map))?;
            info!("Config presets synced ({} models)", report.mapped.len());
        }
        Ok(report)
    }

    /// Preset applying to `model`: the first mapped pattern, in sorted order,
    /// that matches it as a regular expression.
    pub fn show(&self, model: &str) -> Result<Option<Value>> {
        let config_map = self.read_map()?;
        let Some(Value::Object(preset_map)) = config_map.get(PRESET_MAP_KEY) else {
            return Ok(None);
        };

        let mut patterns: Vec<(&String, &Value)> = preset_map.iter().collect();
        patterns.sort_by(|a, b| a.0.cmp(b.0));

        for (pattern, preset) in patterns {
            let Some(preset_file) = preset.as_str() else {
                continue;
            };
            let matches = match Regex::new(pattern) {
                Ok(re) => re.is_match(model),
                Err(e) => {
                    debug!("Ignoring invalid preset pattern {:?}: {}", pattern, e);
                    false
                }
            };
            if !matches {
                continue;
            }

            let path = self.presets_dir.join(preset_file);
            return match atomic_read_json::<Value>(&path)? {
                Some(value) => Ok(Some(value)),
                None => Err(LinkError::Io {
                    message: format!("Config preset file {} does not exist", path.display()),
                    path: Some(path),
                    source: None,
                }),
            };
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_preset_for() {
        assert_eq!(preset_for("codellama:7b"), Some("codellama_instruct.preset.json"));
        assert_eq!(preset_for("acme/CodeLlama:13b"), Some("codellama_instruct.preset.json"));
        assert_eq!(preset_for("llama3:8b"), None);
    }

    #[test]
    fn test_sync_writes_preset_and_map() {
        let temp = TempDir::new().unwrap();
        let sync = PresetSync::new(temp.path().join("config-presets"));

        let report = sync
            .sync(&models(&["codellama:7b", "llama3:8b"]), false)
            .unwrap();

        assert_eq!(report.written.len(), 1);
        assert_eq!(report.mapped.len(), 1);
        let map: Value = serde_json::from_str(
            &fs::read_to_string(sync.presets_dir().join("config.map.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(
            map["preset_map"]["codellama:7b"],
            "codellama_instruct.preset.json"
        );
        assert!(map["preset_map"].get("llama3:8b").is_none());
    }

    #[test]
    fn test_sync_keeps_existing_preset_and_other_keys() {
        let temp = TempDir::new().unwrap();
        let sync = PresetSync::new(temp.path());
        fs::write(temp.path().join("codellama_instruct.preset.json"), r#"{"name":"mine"}"#).unwrap();
        fs::write(
            temp.path().join("config.map.json"),
            r#"{"other": 1, "preset_map": {"x": "y.json"}}"#,
        )
        .unwrap();

        let report = sync.sync(&models(&["codellama:7b"]), false).unwrap();
        assert!(report.written.is_empty());

        let preset: Value = serde_json::from_str(
            &fs::read_to_string(temp.path().join("codellama_instruct.preset.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(preset["name"], "mine");

        let map: Value =
            serde_json::from_str(&fs::read_to_string(temp.path().join("config.map.json")).unwrap())
                .unwrap();
        assert_eq!(map["other"], 1);
        assert_eq!(map["preset_map"]["x"], "y.json");
    }

    #[test]
    fn test_sync_overwrite_replaces_preset() {
        let temp = TempDir::new().unwrap();
        let sync = PresetSync::new(temp.path());
        fs::write(temp.path().join("codellama_instruct.preset.json"), r#"{"name":"mine"}"#).unwrap();

        let report = sync.sync(&models(&["codellama:7b"]), true).unwrap();
        assert_eq!(report.written.len(), 1);

        let shown = sync.show("codellama:7b").unwrap().unwrap();
        assert_eq!(shown["name"], "Default Preset");
    }

    #[test]
    fn test_show_matches_patterns() {
        let temp = TempDir::new().unwrap();
        let sync = PresetSync::new(temp.path());
        fs::write(temp.path().join("a.json"), r#"{"name":"A"}"#).unwrap();
        fs::write(
            temp.path().join("config.map.json"),
            r#"{"preset_map": {"(unclosed": "a.json", "^code.*": "a.json"}}"#,
        )
        .unwrap();

        assert_eq!(sync.show("codellama:7b").unwrap().unwrap()["name"], "A");
        assert!(sync.show("llama3:8b").unwrap().is_none());
    }

    #[test]
    fn test_show_without_map() {
        let temp = TempDir::new().unwrap();
        assert!(PresetSync::new(temp.path()).show("anything").unwrap().is_none());
    }
}

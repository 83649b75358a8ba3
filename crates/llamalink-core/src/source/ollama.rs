//! Model source backed by the `ollama` command-line tool.
//!
//! `ollama list` prints a whitespace-aligned table:
//!
//! ```text
//! NAME              ID              SIZE      MODIFIED
//! llama3:8b         365c0bd3c000    4.7 GB    2 weeks ago
//! ```
//!
//! `ollama show --modelfile NAME` prints a modelfile whose `FROM` line holds
//! the absolute path of the backing blob.

use super::size::find_size;
use super::{ModelEntry, ModelSource};
use crate::config::CommandConfig;
use crate::error::{LinkError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Parse `ollama list` output into model entries.
///
/// The first line is a header. Rows without a recognizable size get
/// `size_bytes = None`.
pub fn parse_list_output(output: &str) -> Result<Vec<ModelEntry>> {
    let mut lines = output.lines().filter(|line| !line.trim().is_empty());
    if lines.next().is_none() {
        return Err(LinkError::ListParse {
            message: "model list output is empty".to_string(),
        });
    }

    Ok(lines
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (name, rest) = fields.split_first()?;
            Some(ModelEntry::new(*name, find_size(rest)))
        })
        .collect())
}

/// Extract the backing path from `ollama show --modelfile` output.
pub fn parse_modelfile_path(model: &str, modelfile: &str) -> Result<PathBuf> {
    let raw = modelfile
        .lines()
        .find_map(|line| line.strip_prefix(CommandConfig::MODELFILE_PATH_MARKER))
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .ok_or_else(|| LinkError::ResolutionFailed {
            model: model.to_string(),
        })?;

    let path = PathBuf::from(raw);
    if !path.is_absolute() {
        return Err(LinkError::InvalidBackingFile {
            model: model.to_string(),
            path,
            reason: "not an absolute path".to_string(),
        });
    }
    Ok(path)
}

/// Runs the `ollama` binary.
#[derive(Debug, Clone)]
pub struct OllamaCli {
    binary: PathBuf,
    list_timeout: Duration,
    resolve_timeout: Duration,
}

impl Default for OllamaCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(CommandConfig::OLLAMA_BIN),
            list_timeout: CommandConfig::LIST_TIMEOUT,
            resolve_timeout: CommandConfig::RESOLVE_TIMEOUT,
        }
    }
}

impl OllamaCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `ollama` executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Bound both the listing and each resolution by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self.resolve_timeout = timeout;
        self
    }

    async fn run(&self, args: &[&str], timeout: Duration) -> Result<String> {
        let command = format!("{} {}", self.binary.display(), args.join(" "));
        debug!("Executing command: {}", command);

        let mut cmd = Command::new(&self.binary);
        cmd.args(args).kill_on_drop(true);

        let output: Output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(LinkError::CommandFailed {
                    command,
                    message: e.to_string(),
                })
            }
            Err(_) => return Err(LinkError::CommandTimeout { command, timeout }),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LinkError::CommandFailed {
                command,
                message: format!("{} ({})", stderr.trim(), output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ModelSource for OllamaCli {
    async fn list(&self) -> Result<Vec<ModelEntry>> {
        let stdout = self.run(&["list"], self.list_timeout).await?;
        parse_list_output(&stdout)
    }

    async fn resolve(&self, name: &str) -> Result<PathBuf> {
        let stdout = self
            .run(&["show", "--modelfile", name], self.resolve_timeout)
            .await?;
        let path = parse_modelfile_path(name, &stdout)?;
        debug!("Model path for {}: {}", name, path.display());
        Ok(path)
    }
}

//! Model sources: where the model list and backing paths come from.
//!
//! The reconciliation engine only sees the [`ModelSource`] trait. Production
//! code uses [`OllamaCli`]; tests and embedders use [`StaticModelSource`].

mod ollama;
mod size;

pub use ollama::{parse_list_output, parse_modelfile_path, OllamaCli};
pub use size::{find_size, parse_size, parse_size_arg, SizeFilter};

use crate::error::{LinkError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

/// One model as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    pub name: String,
    /// Approximate size, when the listing carried one.
    pub size_bytes: Option<u64>,
}

impl ModelEntry {
    pub fn new(name: impl Into<String>, size_bytes: Option<u64>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
        }
    }
}

/// Enumerates models and resolves each to its backing file.
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// All models known to the store, in listing order.
    ///
    /// Failure here is fatal to a run.
    async fn list(&self) -> Result<Vec<ModelEntry>>;

    /// Absolute path of the file backing `name`.
    async fn resolve(&self, name: &str) -> Result<PathBuf>;
}

/// Fixed model table.
#[derive(Debug, Clone, Default)]
pub struct StaticModelSource {
    models: Vec<(ModelEntry, Option<PathBuf>)>,
    list_error: Option<String>,
}

impl StaticModelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model resolving to `path`.
    pub fn with_model(
        mut self,
        name: impl Into<String>,
        size_bytes: Option<u64>,
        path: impl Into<PathBuf>,
    ) -> Self {
        self.models
            .push((ModelEntry::new(name, size_bytes), Some(path.into())));
        self
    }

    /// Add a model that lists but cannot be resolved.
    pub fn with_unresolvable(mut self, name: impl Into<String>, size_bytes: Option<u64>) -> Self {
        self.models.push((ModelEntry::new(name, size_bytes), None));
        self
    }

    /// Make `list` fail as if the listing could not be parsed.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            models: Vec::new(),
            list_error: Some(message.into()),
        }
    }
}

#[async_trait]
impl ModelSource for StaticModelSource {
    async fn list(&self) -> Result<Vec<ModelEntry>> {
        if let Some(message) = &self.list_error {
            return Err(LinkError::ListParse {
                message: message.clone(),
            });
        }
        Ok(self.models.iter().map(|(entry, _)| entry.clone()).collect())
    }

    async fn resolve(&self, name: &str) -> Result<PathBuf> {
        self.models
            .iter()
            .find(|(entry, _)| entry.name == name)
            .and_then(|(_, path)| path.clone())
            .ok_or_else(|| LinkError::ResolutionFailed {
                model: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_lists_in_order() {
        let source = StaticModelSource::new()
            .with_model("b:1", Some(10), "/store/b")
            .with_unresolvable("a:1", None);

        let names: Vec<String> = source
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["b:1", "a:1"]);
    }

    #[tokio::test]
    async fn test_static_source_resolution() {
        let source = StaticModelSource::new()
            .with_model("b:1", None, "/store/b")
            .with_unresolvable("a:1", None);

        assert_eq!(source.resolve("b:1").await.unwrap(), PathBuf::from("/store/b"));
        assert!(matches!(
            source.resolve("a:1").await,
            Err(LinkError::ResolutionFailed { .. })
        ));
        assert!(source.resolve("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_failing_source_is_fatal() {
        let err = StaticModelSource::failing("garbled").list().await.unwrap_err();
        assert!(err.is_fatal_to_run());
    }
}

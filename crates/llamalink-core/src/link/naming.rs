//! Destination naming for Ollama model identifiers.
//!
//! LM Studio expects `<publisher>/<model-dir>/<file>.gguf`. An Ollama
//! identifier such as `acme/foo:7b` maps to `acme/foo-7b-GGUF/foo-7b.gguf`.

use crate::config::{LinkConfig, LinkDefaults};
use std::path::{Path, PathBuf};

/// Names derived from a single model identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNames {
    /// Publisher segment, or `unknown` for identifiers without a namespace.
    pub author: String,
    /// Per-model directory name, e.g. `foo-7b-GGUF`.
    pub dir_name: String,
    /// Link file name without extension, e.g. `foo-7b`.
    pub file_base_name: String,
}

/// Full destination location for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLayout {
    pub names: LinkNames,
    /// `dest_root/author/dir_name`
    pub model_dir: PathBuf,
    /// `model_dir/file_base_name.ext`
    pub link_path: PathBuf,
}

/// Translate an identifier into destination names.
///
/// The author is only taken when the identifier has a tag separator `:` and
/// a `/` precedes it; everything before the last such `/` becomes the author
/// with any remaining `/` turned into `-`. The rest of the identifier has
/// `:`, `_` and `/` replaced by `-`.
///
/// # Examples
///
/// ```
/// use llamalink_core::link::map_model_name;
///
/// let names = map_model_name("acme/foo:7b", "-GGUF");
/// assert_eq!(names.author, "acme");
/// assert_eq!(names.dir_name, "foo-7b-GGUF");
/// assert_eq!(names.file_base_name, "foo-7b");
/// ```
pub fn map_model_name(model_name: &str, dir_suffix: &str) -> LinkNames {
    let (author, rest) = split_author(model_name);
    let transformed = rest.replace([':', '_', '/'], "-");

    LinkNames {
        author: author.unwrap_or_else(|| LinkDefaults::UNKNOWN_AUTHOR.to_string()),
        dir_name: format!("{}{}", transformed, dir_suffix),
        file_base_name: transformed,
    }
}

fn split_author(model_name: &str) -> (Option<String>, &str) {
    let Some(colon) = model_name.find(':') else {
        return (None, model_name);
    };
    let head = &model_name[..colon];
    match head.rfind('/') {
        Some(slash) if slash > 0 => (
            Some(head[..slash].replace('/', "-")),
            &model_name[slash + 1..],
        ),
        Some(slash) => (None, &model_name[slash + 1..]),
        None => (None, model_name),
    }
}

/// Computes destination paths under a fixed root.
#[derive(Debug, Clone)]
pub struct NameMapper {
    dest_root: PathBuf,
    dir_suffix: String,
    extension: String,
}

impl NameMapper {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            dest_root: config.dest_root.clone(),
            dir_suffix: config.dir_suffix.clone(),
            extension: config.extension.clone(),
        }
    }

    /// Destination names for an identifier.
    pub fn map(&self, model_name: &str) -> LinkNames {
        map_model_name(model_name, &self.dir_suffix)
    }

    /// Destination directory and link path for an identifier.
    pub fn layout(&self, model_name: &str) -> LinkLayout {
        let names = self.map(model_name);
        let model_dir = self.dest_root.join(&names.author).join(&names.dir_name);
        let link_path = model_dir.join(format!("{}.{}", names.file_base_name, self.extension));
        LinkLayout {
            names,
            model_dir,
            link_path,
        }
    }

    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }
}

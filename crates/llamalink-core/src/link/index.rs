//! Snapshot of the symlinks in the destination tree.
//!
//! Built once per run from a lexical directory walk and kept current as the
//! run creates and removes links, so duplicate detection does not re-walk
//! the tree for every model. Iteration order is lexical path order, which
//! matches the walk order.

use crate::error::{LinkError, Result};
use crate::link::validator::read_target;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Link path → resolved target path.
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    links: BTreeMap<PathBuf, PathBuf>,
    /// Links forgotten since the walk. In report-only runs these may still
    /// exist on disk.
    removed: BTreeSet<PathBuf>,
}

impl LinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `root` and record every symlink found.
    ///
    /// A missing root yields an empty index. Entries that cannot be read are
    /// logged and left out.
    pub fn build(root: &Path) -> Result<Self> {
        let mut index = Self::new();
        if !root.exists() {
            return Ok(index);
        }
        if !root.is_dir() {
            return Err(LinkError::Config {
                message: format!("Destination root is not a directory: {}", root.display()),
            });
        }

        for entry in WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry while indexing links: {}", e);
                    continue;
                }
            };
            if !entry.path_is_symlink() {
                continue;
            }
            match read_target(entry.path()) {
                Ok(target) => index.record(entry.path(), target),
                Err(e) => warn!("Failed to read link {}: {}", entry.path().display(), e),
            }
        }

        debug!("Indexed {} links under {}", index.len(), root.display());
        Ok(index)
    }

    /// Record a link, replacing any previous target.
    pub fn record(&mut self, link: impl Into<PathBuf>, target: impl Into<PathBuf>) {
        let link = link.into();
        self.removed.remove(&link);
        self.links.insert(link, target.into());
    }

    /// Forget a single link, returning its target.
    pub fn forget(&mut self, link: &Path) -> Option<PathBuf> {
        self.removed.insert(link.to_path_buf());
        self.links.remove(link)
    }

    /// Forget every link at or below `dir`.
    pub fn forget_under(&mut self, dir: &Path) -> Vec<PathBuf> {
        let doomed: Vec<PathBuf> = self
            .links
            .keys()
            .filter(|link| link.starts_with(dir))
            .cloned()
            .collect();
        for link in &doomed {
            self.links.remove(link);
            self.removed.insert(link.clone());
        }
        doomed
    }

    /// Whether `link` was forgotten and not recorded again since.
    pub fn was_removed(&self, link: &Path) -> bool {
        self.removed.contains(link)
    }

    pub fn target_of(&self, link: &Path) -> Option<&Path> {
        self.links.get(link).map(PathBuf::as_path)
    }

    /// Links whose target equals `target`, in lexical order.
    pub fn links_to<'a>(&'a self, target: &'a Path) -> impl Iterator<Item = &'a Path> + 'a {
        self.links
            .iter()
            .filter(move |(_, t)| t.as_path() == target)
            .map(|(link, _)| link.as_path())
    }

    /// All `(link, target)` pairs in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.links.iter().map(|(l, t)| (l.as_path(), t.as_path()))
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

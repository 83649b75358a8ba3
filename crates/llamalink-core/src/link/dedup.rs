//! Duplicate link resolution.
//!
//! Two identifiers can resolve to the same backing file (retags, renames).
//! Duplicates are keyed on the resolved backing path, never on the model
//! identifier. The canonical link for a backing path is the first valid link
//! in lexical path order; every later one is redundant.

use crate::error::{LinkError, Result};
use crate::link::index::LinkIndex;
use crate::link::validator::SymlinkValidator;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Valid links sharing one backing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub target: PathBuf,
    pub canonical: PathBuf,
    pub redundant: Vec<PathBuf>,
}

/// Result of pruning pre-existing duplicates.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    pub errors: Vec<(PathBuf, String)>,
}

#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    validator: SymlinkValidator,
}

impl DuplicateResolver {
    pub fn new(validator: SymlinkValidator) -> Self {
        Self { validator }
    }

    /// First valid link to `backing` other than `own_link`.
    pub fn canonical_for(
        &self,
        index: &LinkIndex,
        backing: &Path,
        own_link: &Path,
    ) -> Option<PathBuf> {
        index
            .links_to(backing)
            .filter(|link| *link != own_link)
            .find(|link| self.validator.is_valid(link, backing))
            .map(Path::to_path_buf)
    }

    /// Remove a model's destination directory made redundant by `canonical`.
    ///
    /// When the canonical link lives inside that same directory only the
    /// model's own link is removed. Returns whether anything was removed.
    pub fn remove_redundant(
        &self,
        index: &mut LinkIndex,
        model_dir: &Path,
        own_link: &Path,
        canonical: &Path,
    ) -> Result<bool> {
        if canonical.starts_with(model_dir) {
            let own_is_link = fs::symlink_metadata(own_link)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false);
            if !own_is_link {
                return Ok(false);
            }
            fs::remove_file(own_link).map_err(|e| LinkError::io_with_path(e, own_link))?;
            index.forget(own_link);
            info!("Removed duplicated link {}", own_link.display());
            return Ok(true);
        }

        match fs::symlink_metadata(model_dir) {
            Ok(meta) if meta.is_dir() => {
                fs::remove_dir_all(model_dir)
                    .map_err(|e| LinkError::io_with_path(e, model_dir))?;
                index.forget_under(model_dir);
                info!("Removed duplicated model directory {}", model_dir.display());
                Ok(true)
            }
            Ok(_) => Err(LinkError::LinkConflict {
                path: model_dir.to_path_buf(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LinkError::io_with_path(e, model_dir)),
        }
    }

    /// Groups of two or more valid links sharing a backing file.
    pub fn duplicate_groups(&self, index: &LinkIndex) -> Vec<DuplicateGroup> {
        let mut by_target: BTreeMap<&Path, Vec<&Path>> = BTreeMap::new();
        for (link, target) in index.iter() {
            if self.validator.is_valid(link, target) {
                by_target.entry(target).or_default().push(link);
            }
        }

        by_target
            .into_iter()
            .filter(|(_, links)| links.len() > 1)
            .map(|(target, links)| DuplicateGroup {
                target: target.to_path_buf(),
                canonical: links[0].to_path_buf(),
                redundant: links[1..].iter().map(|l| l.to_path_buf()).collect(),
            })
            .collect()
    }

    /// Remove every redundant link so each backing file keeps one canonical link.
    ///
    /// Directories emptied here are left for the cleanup pass.
    pub fn prune(&self, index: &mut LinkIndex) -> PruneReport {
        let mut report = PruneReport::default();
        for group in self.duplicate_groups(index) {
            for link in group.redundant {
                match fs::remove_file(&link) {
                    Ok(()) => {
                        info!(
                            "Removed duplicate link {} (canonical: {})",
                            link.display(),
                            group.canonical.display()
                        );
                        index.forget(&link);
                        report.removed.push(link);
                    }
                    Err(e) => {
                        warn!("Failed to remove duplicate link {}: {}", link.display(), e);
                        report.errors.push((link, e.to_string()));
                    }
                }
            }
        }
        report
    }

    /// Forget every redundant link in `index` without touching disk.
    ///
    /// Returns the links a real prune would remove.
    pub fn simulate_prune(&self, index: &mut LinkIndex) -> Vec<PathBuf> {
        let mut doomed = Vec::new();
        for group in self.duplicate_groups(index) {
            for link in group.redundant {
                debug!(
                    "Would remove duplicate link {} (canonical: {})",
                    link.display(),
                    group.canonical.display()
                );
                index.forget(&link);
                doomed.push(link);
            }
        }
        doomed
    }
}

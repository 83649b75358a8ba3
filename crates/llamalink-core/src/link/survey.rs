//! Read-only report on the state of the destination tree.

use crate::config::LinkConfig;
use crate::error::Result;
use crate::link::dedup::{DuplicateGroup, DuplicateResolver};
use crate::link::index::LinkIndex;
use crate::link::validator::{LinkVerdict, SymlinkValidator};
use std::path::PathBuf;
use tracing::warn;
use walkdir::WalkDir;

/// A link that would be removed by cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLink {
    pub path: PathBuf,
    pub target: PathBuf,
    pub verdict: LinkVerdict,
}

#[derive(Debug, Clone, Default)]
pub struct TreeSurvey {
    /// Regular model files placed in the tree by hand or by another tool.
    pub unmanaged: Vec<PathBuf>,
    pub broken: Vec<BrokenLink>,
    pub duplicates: Vec<DuplicateGroup>,
    /// Number of valid links.
    pub valid_links: usize,
}

impl TreeSurvey {
    pub fn is_tidy(&self) -> bool {
        self.broken.is_empty() && self.duplicates.is_empty()
    }
}

/// Inspect the destination tree without modifying it.
pub fn survey(config: &LinkConfig) -> Result<TreeSurvey> {
    let validator = SymlinkValidator::new(config);
    let index = LinkIndex::build(&config.dest_root)?;
    let mut report = TreeSurvey::default();

    for (link, target) in index.iter() {
        match validator.check(link, target) {
            LinkVerdict::Valid => report.valid_links += 1,
            verdict => report.broken.push(BrokenLink {
                path: link.to_path_buf(),
                target: target.to_path_buf(),
                verdict,
            }),
        }
    }

    report.duplicates = DuplicateResolver::new(validator).duplicate_groups(&index);

    if config.dest_root.is_dir() {
        let dotted = config.dotted_extension();
        for entry in WalkDir::new(&config.dest_root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            match entry {
                Ok(entry) => {
                    let is_model_file = entry.file_type().is_file()
                        && entry.file_name().to_string_lossy().ends_with(&dotted);
                    if is_model_file {
                        report.unmanaged.push(entry.into_path());
                    }
                }
                Err(e) => warn!("Skipping unreadable entry while surveying: {}", e),
            }
        }
    }

    Ok(report)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn test_survey_classifies_entries() {
        let temp = TempDir::new().unwrap();
        let store = temp.path().join("store");
        let dest = temp.path().join("dest");
        fs::create_dir_all(&store).unwrap();
        fs::create_dir_all(dest.join("a/m-GGUF")).unwrap();
        fs::create_dir_all(dest.join("b/m-GGUF")).unwrap();
        fs::create_dir_all(dest.join("me/own-GGUF")).unwrap();
        fs::write(store.join("blob"), b"w").unwrap();

        symlink(store.join("blob"), dest.join("a/m-GGUF/m.gguf")).unwrap();
        symlink(store.join("blob"), dest.join("b/m-GGUF/m.gguf")).unwrap();
        symlink(store.join("gone"), dest.join("b/m-GGUF/old.gguf")).unwrap();
        fs::write(dest.join("me/own-GGUF/own.gguf"), b"real").unwrap();
        fs::write(dest.join("me/own-GGUF/README.md"), b"notes").unwrap();

        let report = survey(&LinkConfig::new(&store, &dest)).unwrap();

        assert_eq!(report.valid_links, 2);
        assert_eq!(report.unmanaged, vec![dest.join("me/own-GGUF/own.gguf")]);
        assert_eq!(report.broken.len(), 1);
        assert_eq!(report.broken[0].verdict, LinkVerdict::MissingTarget);
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].canonical, dest.join("a/m-GGUF/m.gguf"));
        assert!(!report.is_tidy());
    }

    #[test]
    fn test_survey_empty_tree_is_tidy() {
        let temp = TempDir::new().unwrap();
        let report = survey(&LinkConfig::new("/store", temp.path())).unwrap();
        assert!(report.is_tidy());
        assert_eq!(report.valid_links, 0);
        assert!(report.unmanaged.is_empty());
    }
}

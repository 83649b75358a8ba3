//! Destination tree cleanup.
//!
//! Two passes: broken links are removed, then empty directories are removed
//! bottom-up until a full pass removes nothing. The destination root itself
//! is never removed.

use crate::config::LinkConfig;
use crate::link::validator::SymlinkValidator;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What a cleanup pass removed and what it could not.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub links_removed: Vec<PathBuf>,
    pub dirs_removed: Vec<PathBuf>,
    pub errors: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    /// Number of filesystem entries removed.
    pub fn removed(&self) -> usize {
        self.links_removed.len() + self.dirs_removed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.removed() == 0 && self.errors.is_empty()
    }

    fn record_error(&mut self, path: &Path, message: String) {
        if !self.errors.iter().any(|(p, _)| p == path) {
            warn!("Cleanup failed at {}: {}", path.display(), message);
            self.errors.push((path.to_path_buf(), message));
        }
    }
}

/// Best-effort walker restoring the destination tree to a minimal state.
#[derive(Debug, Clone)]
pub struct CleanupWalker {
    root: PathBuf,
    validator: SymlinkValidator,
}

impl CleanupWalker {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            root: config.dest_root.clone(),
            validator: SymlinkValidator::new(config),
        }
    }

    /// Remove invalid links, then empty directories.
    pub fn cleanup(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        self.remove_links(&mut report, |link| {
            let verdict = self.validator.check_link(link);
            if verdict.is_valid() {
                false
            } else {
                debug!("Invalid symlink {} ({})", link.display(), verdict);
                true
            }
        });
        self.remove_empty_dirs(&mut report);
        report
    }

    /// Remove every symlink regardless of validity, then empty directories.
    ///
    /// Only for an explicit wipe of the destination tree.
    pub fn remove_all_links(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        self.remove_links(&mut report, |_| true);
        self.remove_empty_dirs(&mut report);
        report
    }

    fn remove_links(&self, report: &mut CleanupReport, should_remove: impl Fn(&Path) -> bool) {
        for link in self.collect_links(report) {
            if !should_remove(&link) {
                continue;
            }
            match fs::remove_file(&link) {
                Ok(()) => {
                    info!("Removed symlink {}", link.display());
                    report.links_removed.push(link);
                }
                Err(e) => report.record_error(&link, e.to_string()),
            }
        }
    }

    fn collect_links(&self, report: &mut CleanupReport) -> Vec<PathBuf> {
        let mut links = Vec::new();
        if !self.root.is_dir() {
            return links;
        }
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            match entry {
                Ok(entry) if entry.path_is_symlink() => links.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().unwrap_or(&self.root).to_path_buf();
                    report.record_error(&path, e.to_string());
                }
            }
        }
        links
    }

    /// Post-order removal of empty directories, repeated until stable.
    fn remove_empty_dirs(&self, report: &mut CleanupReport) {
        if !self.root.is_dir() {
            return;
        }
        loop {
            let mut removed_this_pass = 0usize;
            for entry in WalkDir::new(&self.root)
                .min_depth(1)
                .follow_links(false)
                .contents_first(true)
                .sort_by_file_name()
            {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e.path().unwrap_or(&self.root).to_path_buf();
                        report.record_error(&path, e.to_string());
                        continue;
                    }
                };
                if !entry.file_type().is_dir() {
                    continue;
                }
                let path = entry.path();
                let is_empty = match fs::read_dir(path) {
                    Ok(mut entries) => entries.next().is_none(),
                    Err(e) => {
                        report.record_error(path, e.to_string());
                        continue;
                    }
                };
                if !is_empty {
                    continue;
                }
                match fs::remove_dir(path) {
                    Ok(()) => {
                        info!("Removed empty directory {}", path.display());
                        report.dirs_removed.push(path.to_path_buf());
                        removed_this_pass += 1;
                    }
                    Err(e) => report.record_error(path, e.to_string()),
                }
            }
            if removed_this_pass == 0 {
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        store: PathBuf,
        dest: PathBuf,
        walker: CleanupWalker,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let store = temp.path().join("store");
        let dest = temp.path().join("dest");
        fs::create_dir_all(&store).unwrap();
        fs::create_dir_all(&dest).unwrap();
        let walker = CleanupWalker::new(&LinkConfig::new(&store, &dest));
        Fixture {
            _temp: temp,
            store,
            dest,
            walker,
        }
    }

    #[test]
    fn test_broken_link_and_its_directory_are_removed() {
        let fx = fixture();
        let link = fx.dest.join("acme/foo-GGUF/foo.gguf");
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        symlink(fx.store.join("missing"), &link).unwrap();

        let report = fx.walker.cleanup();

        assert_eq!(report.links_removed, vec![link]);
        assert!(!fx.dest.join("acme").exists());
        assert!(fx.dest.exists());
        assert_eq!(report.dirs_removed.len(), 2);
    }

    #[test]
    fn test_valid_link_survives() {
        let fx = fixture();
        fs::write(fx.store.join("blob"), b"w").unwrap();
        let link = fx.dest.join("acme/foo-GGUF/foo.gguf");
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        symlink(fx.store.join("blob"), &link).unwrap();

        let report = fx.walker.cleanup();

        assert!(report.is_clean());
        assert!(link.exists());
    }

    #[test]
    fn test_wrong_extension_and_chained_links_removed() {
        let fx = fixture();
        fs::write(fx.store.join("blob"), b"w").unwrap();
        symlink(fx.store.join("blob"), fx.store.join("hop")).unwrap();
        let dir = fx.dest.join("acme/foo-GGUF");
        fs::create_dir_all(&dir).unwrap();
        symlink(fx.store.join("blob"), dir.join("foo.bin")).unwrap();
        symlink(fx.store.join("hop"), dir.join("foo.gguf")).unwrap();

        let report = fx.walker.cleanup();

        assert_eq!(report.links_removed.len(), 2);
        assert!(!fx.dest.join("acme").exists());
    }

    #[test]
    fn test_deeply_nested_empty_dirs_collapse() {
        let fx = fixture();
        fs::create_dir_all(fx.dest.join("a/b/c/d/e")).unwrap();
        fs::create_dir_all(fx.dest.join("z/y")).unwrap();

        let report = fx.walker.cleanup();

        assert_eq!(report.dirs_removed.len(), 7);
        assert_eq!(fs::read_dir(&fx.dest).unwrap().count(), 0);
    }

    #[test]
    fn test_regular_files_keep_their_directories() {
        let fx = fixture();
        let dir = fx.dest.join("me/own-GGUF");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("own.gguf"), b"real").unwrap();

        let report = fx.walker.cleanup();

        assert!(report.is_clean());
        assert!(dir.join("own.gguf").exists());
    }

    #[test]
    fn test_remove_all_links_wipes_valid_links() {
        let fx = fixture();
        fs::write(fx.store.join("blob"), b"w").unwrap();
        let link = fx.dest.join("acme/foo-GGUF/foo.gguf");
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        symlink(fx.store.join("blob"), &link).unwrap();

        let report = fx.walker.remove_all_links();

        assert_eq!(report.links_removed, vec![link]);
        assert_eq!(fs::read_dir(&fx.dest).unwrap().count(), 0);
        assert!(fx.store.join("blob").exists());
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let fx = fixture();
        let link = fx.dest.join("acme/foo-GGUF/foo.gguf");
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        symlink(fx.store.join("missing"), &link).unwrap();

        fx.walker.cleanup();
        assert!(fx.walker.cleanup().is_clean());
    }

    #[test]
    fn test_missing_root_is_noop() {
        let temp = TempDir::new().unwrap();
        let walker = CleanupWalker::new(&LinkConfig::new("/store", temp.path().join("absent")));
        assert!(walker.cleanup().is_clean());
    }
}

//! Link validity policy.
//!
//! A destination link is valid when its own file name carries the model
//! extension and its target is an existing regular file reached in one hop.

use crate::config::LinkConfig;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Outcome of checking one link against the validity policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkVerdict {
    Valid,
    /// Link name lacks the model extension.
    WrongExtension,
    /// Target does not exist (or could not be inspected).
    MissingTarget,
    TargetIsDirectory,
    /// Target is itself a link; chains are not followed.
    TargetIsSymlink,
}

impl LinkVerdict {
    pub fn is_valid(self) -> bool {
        self == LinkVerdict::Valid
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LinkVerdict::Valid => "valid",
            LinkVerdict::WrongExtension => "wrong extension",
            LinkVerdict::MissingTarget => "target missing",
            LinkVerdict::TargetIsDirectory => "target is a directory",
            LinkVerdict::TargetIsSymlink => "target is a symlink",
        }
    }
}

impl std::fmt::Display for LinkVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read a link's target, interpreting relative targets from the link's directory.
pub fn read_target(link_path: &Path) -> io::Result<PathBuf> {
    let raw = fs::read_link(link_path)?;
    Ok(resolve_target(link_path, raw))
}

/// Make a raw link target absolute relative to the link's parent directory.
///
/// The result is lexically normalised so that relative and absolute links to
/// the same file compare equal.
pub fn resolve_target(link_path: &Path, raw_target: PathBuf) -> PathBuf {
    if raw_target.is_absolute() {
        return normalize_lexically(&raw_target);
    }
    match link_path.parent() {
        Some(parent) => normalize_lexically(&parent.join(raw_target)),
        None => normalize_lexically(&raw_target),
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
///
/// `..` at the root, or leading a relative path, is kept as written.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Applies the validity policy. Never fails: inspection errors count as invalid.
#[derive(Debug, Clone)]
pub struct SymlinkValidator {
    dotted_extension: String,
}

impl SymlinkValidator {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            dotted_extension: config.dotted_extension(),
        }
    }

    /// Check `link_path` as if it pointed at `target_path`.
    ///
    /// The link itself need not exist yet, which lets planned links be
    /// judged before they are created.
    pub fn check(&self, link_path: &Path, target_path: &Path) -> LinkVerdict {
        let has_extension = link_path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&self.dotted_extension));
        if !has_extension {
            return LinkVerdict::WrongExtension;
        }

        if fs::metadata(target_path).is_err() {
            return LinkVerdict::MissingTarget;
        }

        match fs::symlink_metadata(target_path) {
            Ok(meta) if meta.file_type().is_symlink() => LinkVerdict::TargetIsSymlink,
            Ok(meta) if meta.is_dir() => LinkVerdict::TargetIsDirectory,
            Ok(_) => LinkVerdict::Valid,
            Err(_) => LinkVerdict::MissingTarget,
        }
    }

    pub fn is_valid(&self, link_path: &Path, target_path: &Path) -> bool {
        self.check(link_path, target_path).is_valid()
    }

    /// Check an existing link on disk; unreadable links count as missing targets.
    pub fn check_link(&self, link_path: &Path) -> LinkVerdict {
        match read_target(link_path) {
            Ok(target) => self.check(link_path, &target),
            Err(_) => LinkVerdict::MissingTarget,
        }
    }
}

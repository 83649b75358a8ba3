//! Per-model link planning and application.
//!
//! [`LinkPlanner::plan`] only reads the filesystem and the run's
//! [`LinkIndex`]; [`LinkPlanner::apply`] performs the mutation the plan
//! names. Report-only runs call `plan` and `simulate` and never `apply`.

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::link::dedup::DuplicateResolver;
use crate::link::index::LinkIndex;
use crate::link::naming::{LinkLayout, NameMapper};
use crate::link::validator::{normalize_lexically, read_target, SymlinkValidator};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What the planner decided for one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDecision {
    /// No link exists yet; create one.
    Create,
    /// A valid link to the backing file is already in place.
    Skip,
    /// A stale link occupies the link path; replace it.
    Repair,
    /// Another link already serves the backing file; drop this model's directory.
    Deduplicate,
    /// The model cannot be linked this run.
    Reject,
}

impl LinkDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkDecision::Create => "create",
            LinkDecision::Skip => "skip",
            LinkDecision::Repair => "repair",
            LinkDecision::Deduplicate => "deduplicate",
            LinkDecision::Reject => "reject",
        }
    }
}

impl std::fmt::Display for LinkDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a model was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    EmptyName,
    /// The source could not name a backing file.
    Unresolved(String),
    MissingBackingFile,
    BackingIsDirectory,
    /// Links must reach their file in one hop.
    BackingIsSymlink,
    /// A regular file or directory sits where the link should go.
    Conflict,
    /// The link path could not be inspected.
    Inaccessible(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::EmptyName => f.write_str("empty model identifier"),
            RejectReason::Unresolved(message) => write!(f, "unresolved: {}", message),
            RejectReason::MissingBackingFile => f.write_str("backing file does not exist"),
            RejectReason::BackingIsDirectory => f.write_str("backing path is a directory"),
            RejectReason::BackingIsSymlink => f.write_str("backing path is a symlink"),
            RejectReason::Conflict => f.write_str("non-link entry at link path"),
            RejectReason::Inaccessible(message) => write!(f, "link path inaccessible: {}", message),
        }
    }
}

/// A decision plus everything needed to carry it out.
#[derive(Debug, Clone)]
pub struct LinkPlan {
    pub model: String,
    pub decision: LinkDecision,
    pub layout: LinkLayout,
    pub backing: Option<PathBuf>,
    /// Surviving link for the backing file when deduplicating.
    pub canonical: Option<PathBuf>,
    pub reject: Option<RejectReason>,
}

impl LinkPlan {
    fn rejected(model: &str, layout: LinkLayout, backing: Option<PathBuf>, reason: RejectReason) -> Self {
        Self {
            model: model.to_string(),
            decision: LinkDecision::Reject,
            layout,
            backing,
            canonical: None,
            reject: Some(reason),
        }
    }

    pub fn link_path(&self) -> &Path {
        &self.layout.link_path
    }

    pub fn model_dir(&self) -> &Path {
        &self.layout.model_dir
    }
}

/// Decides and applies the link operation for one model at a time.
#[derive(Debug, Clone)]
pub struct LinkPlanner {
    mapper: NameMapper,
    validator: SymlinkValidator,
    resolver: DuplicateResolver,
}

impl LinkPlanner {
    pub fn new(config: &LinkConfig) -> Self {
        let validator = SymlinkValidator::new(config);
        Self {
            mapper: NameMapper::new(config),
            resolver: DuplicateResolver::new(validator.clone()),
            validator,
        }
    }

    pub fn resolver(&self) -> &DuplicateResolver {
        &self.resolver
    }

    /// Decide what to do for `model` given the outcome of path resolution.
    pub fn plan(&self, model: &str, resolved: Result<PathBuf>, index: &LinkIndex) -> LinkPlan {
        let layout = self.mapper.layout(model);

        if model.is_empty() {
            return LinkPlan::rejected(model, layout, None, RejectReason::EmptyName);
        }

        let backing = match resolved {
            Ok(path) => normalize_lexically(&path),
            Err(e) => {
                return LinkPlan::rejected(model, layout, None, RejectReason::Unresolved(e.to_string()))
            }
        };

        match fs::metadata(&backing) {
            Ok(meta) if meta.is_dir() => {
                return LinkPlan::rejected(model, layout, Some(backing), RejectReason::BackingIsDirectory)
            }
            Ok(_) => {}
            Err(_) => {
                return LinkPlan::rejected(model, layout, Some(backing), RejectReason::MissingBackingFile)
            }
        }
        let backing_is_link = fs::symlink_metadata(&backing)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        if backing_is_link {
            return LinkPlan::rejected(model, layout, Some(backing), RejectReason::BackingIsSymlink);
        }

        let link_path = layout.link_path.clone();
        // A link forgotten by a report-only prune still exists on disk.
        let on_disk = if index.was_removed(&link_path) {
            Err(std::io::Error::from(ErrorKind::NotFound))
        } else {
            fs::symlink_metadata(&link_path)
        };
        let stale = match on_disk {
            Ok(meta) if meta.file_type().is_symlink() => {
                let current = read_target(&link_path).ok();
                let in_place = current.as_deref() == Some(backing.as_path())
                    && self.validator.is_valid(&link_path, &backing);
                if in_place {
                    debug!("{} already linked at {}", model, link_path.display());
                    return LinkPlan {
                        model: model.to_string(),
                        decision: LinkDecision::Skip,
                        layout,
                        backing: Some(backing),
                        canonical: None,
                        reject: None,
                    };
                }
                true
            }
            Ok(_) => {
                return LinkPlan::rejected(model, layout, Some(backing), RejectReason::Conflict)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                return LinkPlan::rejected(
                    model,
                    layout,
                    Some(backing),
                    RejectReason::Inaccessible(e.to_string()),
                )
            }
        };

        if let Some(canonical) = self.resolver.canonical_for(index, &backing, &link_path) {
            return LinkPlan {
                model: model.to_string(),
                decision: LinkDecision::Deduplicate,
                layout,
                backing: Some(backing),
                canonical: Some(canonical),
                reject: None,
            };
        }

        LinkPlan {
            model: model.to_string(),
            decision: if stale {
                LinkDecision::Repair
            } else {
                LinkDecision::Create
            },
            layout,
            backing: Some(backing),
            canonical: None,
            reject: None,
        }
    }

    /// Carry out a plan. Returns whether the filesystem was changed.
    ///
    /// Directory creation failure stops before the link is attempted; link
    /// creation is always the last step.
    pub fn apply(&self, plan: &LinkPlan, index: &mut LinkIndex) -> Result<bool> {
        match plan.decision {
            LinkDecision::Skip | LinkDecision::Reject => Ok(false),
            LinkDecision::Deduplicate => {
                let canonical = plan.canonical.as_deref().ok_or_else(|| {
                    LinkError::Other(format!("No canonical link recorded for {}", plan.model))
                })?;
                self.resolver
                    .remove_redundant(index, plan.model_dir(), plan.link_path(), canonical)
            }
            LinkDecision::Repair => {
                let link_path = plan.link_path();
                fs::remove_file(link_path).map_err(|e| LinkError::io_with_path(e, link_path))?;
                index.forget(link_path);
                debug!("Removed stale link {}", link_path.display());
                self.create_link(plan, index)?;
                Ok(true)
            }
            LinkDecision::Create => {
                self.create_link(plan, index)?;
                Ok(true)
            }
        }
    }

    /// Update `index` as if `plan` had been applied, without touching disk.
    pub fn simulate(&self, plan: &LinkPlan, index: &mut LinkIndex) {
        match (plan.decision, plan.backing.as_ref()) {
            (LinkDecision::Create | LinkDecision::Repair, Some(backing)) => {
                index.record(plan.link_path(), backing);
            }
            (LinkDecision::Deduplicate, _) => {
                let shares_dir = plan
                    .canonical
                    .as_deref()
                    .is_some_and(|c| c.starts_with(plan.model_dir()));
                if shares_dir {
                    index.forget(plan.link_path());
                } else {
                    index.forget_under(plan.model_dir());
                }
            }
            _ => {}
        }
    }

    fn create_link(&self, plan: &LinkPlan, index: &mut LinkIndex) -> Result<()> {
        let backing = plan.backing.as_deref().ok_or_else(|| {
            LinkError::Other(format!("No backing path recorded for {}", plan.model))
        })?;
        let model_dir = plan.model_dir();
        let link_path = plan.link_path();

        fs::create_dir_all(model_dir).map_err(|e| LinkError::io_with_path(e, model_dir))?;
        create_symlink(backing, link_path)?;
        index.record(link_path, backing);

        info!("Symlinked {} to {}", plan.model, link_path.display());
        Ok(())
    }
}

/// Create a file symlink at `link` pointing to `target`.
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    let outcome = std::os::unix::fs::symlink(target, link);

    #[cfg(windows)]
    let outcome = std::os::windows::fs::symlink_file(target, link);

    outcome.map_err(|e| LinkError::SymlinkFailed {
        src: target.to_path_buf(),
        dest: link.to_path_buf(),
        reason: e.to_string(),
    })
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
        planner: LinkPlanner,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let store = temp.path().join("store/blobs");
        let dest = temp.path().join("dest");
        fs::create_dir_all(&store).unwrap();
        fs::create_dir_all(&dest).unwrap();
        let planner = LinkPlanner::new(&LinkConfig::new(temp.path().join("store"), &dest));
        Fixture {
            _temp: temp,
            store,
            dest,
            planner,
        }
    }

    fn blob(fx: &Fixture, name: &str) -> PathBuf {
        let path = fx.store.join(name);
        fs::write(&path, b"weights").unwrap();
        path
    }

    #[test]
    fn test_create_then_skip() {
        let fx = fixture();
        let backing = blob(&fx, "sha256-abc123");
        let mut index = LinkIndex::build(&fx.dest).unwrap();

        let plan = fx.planner.plan("acme/foo:7b", Ok(backing.clone()), &index);
        assert_eq!(plan.decision, LinkDecision::Create);
        assert!(fx.planner.apply(&plan, &mut index).unwrap());

        let link = fx.dest.join("acme/foo-7b-GGUF/foo-7b.gguf");
        assert_eq!(fs::read_link(&link).unwrap(), backing);

        let again = fx.planner.plan("acme/foo:7b", Ok(backing), &index);
        assert_eq!(again.decision, LinkDecision::Skip);
        assert!(!fx.planner.apply(&again, &mut index).unwrap());
    }

    #[test]
    fn test_reject_unresolved() {
        let fx = fixture();
        let index = LinkIndex::new();
        let plan = fx.planner.plan(
            "acme/foo:7b",
            Err(LinkError::ResolutionFailed {
                model: "acme/foo:7b".into(),
            }),
            &index,
        );
        assert_eq!(plan.decision, LinkDecision::Reject);
        assert!(matches!(plan.reject, Some(RejectReason::Unresolved(_))));
    }

    #[test]
    fn test_reject_missing_and_directory_backing() {
        let fx = fixture();
        let index = LinkIndex::new();

        let missing = fx.planner.plan("a/b:1", Ok(fx.store.join("gone")), &index);
        assert_eq!(missing.reject, Some(RejectReason::MissingBackingFile));

        let dir = fx.planner.plan("a/b:1", Ok(fx.store.clone()), &index);
        assert_eq!(dir.reject, Some(RejectReason::BackingIsDirectory));
    }

    #[test]
    fn test_reject_empty_name() {
        let fx = fixture();
        let backing = blob(&fx, "sha256-abc");
        let plan = fx.planner.plan("", Ok(backing), &LinkIndex::new());
        assert_eq!(plan.reject, Some(RejectReason::EmptyName));
    }

    #[test]
    fn test_repair_stale_link() {
        let fx = fixture();
        let old = blob(&fx, "sha256-old");
        let new = blob(&fx, "sha256-new");
        let link = fx.dest.join("acme/foo-7b-GGUF/foo-7b.gguf");
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        symlink(&old, &link).unwrap();
        let mut index = LinkIndex::build(&fx.dest).unwrap();

        let plan = fx.planner.plan("acme/foo:7b", Ok(new.clone()), &index);
        assert_eq!(plan.decision, LinkDecision::Repair);
        assert!(fx.planner.apply(&plan, &mut index).unwrap());
        assert_eq!(fs::read_link(&link).unwrap(), new);
        assert_eq!(index.target_of(&link), Some(new.as_path()));
    }

    #[test]
    fn test_repair_broken_link() {
        let fx = fixture();
        let backing = blob(&fx, "sha256-abc");
        let link = fx.dest.join("acme/foo-7b-GGUF/foo-7b.gguf");
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        symlink(fx.store.join("vanished"), &link).unwrap();
        let index = LinkIndex::build(&fx.dest).unwrap();

        let plan = fx.planner.plan("acme/foo:7b", Ok(backing), &index);
        assert_eq!(plan.decision, LinkDecision::Repair);
    }

    #[test]
    fn test_regular_file_is_conflict() {
        let fx = fixture();
        let backing = blob(&fx, "sha256-abc");
        let link = fx.dest.join("acme/foo-7b-GGUF/foo-7b.gguf");
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        fs::write(&link, b"user data").unwrap();

        let plan = fx.planner.plan("acme/foo:7b", Ok(backing), &LinkIndex::new());
        assert_eq!(plan.reject, Some(RejectReason::Conflict));
        assert_eq!(fs::read(&link).unwrap(), b"user data");
    }

    #[test]
    fn test_deduplicate_second_identifier() {
        let fx = fixture();
        let backing = blob(&fx, "sha256-abc123");
        let mut index = LinkIndex::build(&fx.dest).unwrap();

        let first = fx.planner.plan("acme/foo:7b", Ok(backing.clone()), &index);
        fx.planner.apply(&first, &mut index).unwrap();

        let second = fx.planner.plan("acme/foo-7b", Ok(backing), &index);
        assert_eq!(second.decision, LinkDecision::Deduplicate);
        assert_eq!(second.canonical.as_deref(), Some(first.link_path()));
        assert!(!fx.planner.apply(&second, &mut index).unwrap());
        assert!(!fx.dest.join("unknown/acme-foo-7b-GGUF").exists());
    }

    #[test]
    fn test_deduplicate_removes_existing_directory() {
        let fx = fixture();
        let backing = blob(&fx, "sha256-abc123");
        let mut index = LinkIndex::new();
        let first = fx.planner.plan("acme/foo:7b", Ok(backing.clone()), &index);
        fx.planner.apply(&first, &mut index).unwrap();

        let stray_dir = fx.dest.join("unknown/acme-foo-7b-GGUF");
        fs::create_dir_all(&stray_dir).unwrap();
        fs::write(stray_dir.join("notes.txt"), b"x").unwrap();

        let second = fx.planner.plan("acme/foo-7b", Ok(backing), &index);
        assert_eq!(second.decision, LinkDecision::Deduplicate);
        assert!(fx.planner.apply(&second, &mut index).unwrap());
        assert!(!stray_dir.exists());
        assert!(first.link_path().exists());
    }

    #[test]
    fn test_simulate_records_planned_links() {
        let fx = fixture();
        let backing = blob(&fx, "sha256-abc123");
        let mut index = LinkIndex::new();

        let first = fx.planner.plan("acme/foo:7b", Ok(backing.clone()), &index);
        fx.planner.simulate(&first, &mut index);
        assert!(!first.link_path().exists());

        let second = fx.planner.plan("acme/foo-7b", Ok(backing), &index);
        assert_eq!(second.decision, LinkDecision::Deduplicate);
    }

    #[test]
    fn test_reject_symlinked_backing() {
        let fx = fixture();
        let real = blob(&fx, "sha256-real");
        let alias = fx.store.join("alias");
        symlink(&real, &alias).unwrap();
        let mut index = LinkIndex::new();

        let plan = fx.planner.plan("acme/foo:7b", Ok(alias), &index);
        assert_eq!(plan.decision, LinkDecision::Reject);
        assert_eq!(plan.reject, Some(RejectReason::BackingIsSymlink));
        assert!(!fx.planner.apply(&plan, &mut index).unwrap());
        assert!(!fx.dest.join("acme").exists());
    }

    #[test]
    fn test_backing_path_is_normalised() {
        let fx = fixture();
        let backing = blob(&fx, "sha256-abc");
        let dotted = fx.store.join("../blobs/./sha256-abc");
        let mut index = LinkIndex::new();

        let plan = fx.planner.plan("acme/foo:7b", Ok(dotted.clone()), &index);
        assert_eq!(plan.backing.as_deref(), Some(backing.as_path()));
        fx.planner.apply(&plan, &mut index).unwrap();

        let again = fx.planner.plan("acme/foo:7b", Ok(dotted), &index);
        assert_eq!(again.decision, LinkDecision::Skip);
    }

    #[test]
    fn test_forgotten_link_plans_as_absent() {
        let fx = fixture();
        let backing = blob(&fx, "sha256-abc");
        let link = fx.dest.join("acme/foo-7b-GGUF/foo-7b.gguf");
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        symlink(&backing, &link).unwrap();
        let mut index = LinkIndex::build(&fx.dest).unwrap();
        index.forget(&link);

        let plan = fx.planner.plan("acme/foo:7b", Ok(backing), &index);
        assert_eq!(plan.decision, LinkDecision::Create);
        assert!(fs::symlink_metadata(&link).is_ok());
    }
}

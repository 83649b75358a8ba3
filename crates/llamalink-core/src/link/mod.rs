//! Link reconciliation between the Ollama store and LM Studio's model tree.
//!
//! Leaves first:
//! - [`naming`]: identifier to destination path mapping (pure)
//! - [`validator`]: link validity policy
//! - [`index`]: per-run snapshot of destination links
//! - [`dedup`]: one canonical link per backing file
//! - [`planner`]: per-model decision and mutation
//! - [`cleanup`]: broken-link and empty-directory removal
//! - [`survey`]: read-only tree report

pub mod cleanup;
pub mod dedup;
pub mod index;
pub mod naming;
pub mod planner;
pub mod survey;
pub mod validator;

pub use cleanup::{CleanupReport, CleanupWalker};
pub use dedup::{DuplicateGroup, DuplicateResolver, PruneReport};
pub use index::LinkIndex;
pub use naming::{map_model_name, LinkLayout, LinkNames, NameMapper};
pub use planner::{LinkDecision, LinkPlan, LinkPlanner, RejectReason};
pub use survey::{survey, BrokenLink, TreeSurvey};
pub use validator::{normalize_lexically, read_target, LinkVerdict, SymlinkValidator};

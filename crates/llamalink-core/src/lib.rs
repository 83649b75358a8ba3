//! llamalink core - mirrors Ollama's model store into LM Studio's model tree.
//!
//! The store is never written to. Each model becomes one symlink at
//! `<lm-studio>/<author>/<name>-GGUF/<name>.gguf` pointing at its blob, and
//! the tree is kept free of broken links, duplicate links and empty
//! directories.
//!
//! # Example
//!
//! ```rust,no_run
//! use llamalink_core::{LinkConfig, OllamaCli, ReconciliationRun, RunOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> llamalink_core::Result<()> {
//!     let config = LinkConfig::resolve(None, None)?;
//!     let source = OllamaCli::new();
//!     let report = ReconciliationRun::new(config, &source, RunOptions::default())
//!         .run()
//!         .await?;
//!     println!("{} filesystem changes", report.mutations());
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod link;
pub mod paths;
pub mod presets;
pub mod reconcile;
pub mod settings;
pub mod source;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use config::LinkConfig;
pub use error::{LinkError, Result};
pub use link::{
    survey, CleanupReport, CleanupWalker, LinkDecision, LinkPlanner, NameMapper,
    SymlinkValidator, TreeSurvey,
};
pub use presets::PresetSync;
pub use reconcile::{CleanupPolicy, ModelOutcome, ReconciliationRun, RunOptions, RunReport};
pub use settings::LlamaLinkSettings;
pub use source::{ModelEntry, ModelSource, OllamaCli, SizeFilter, StaticModelSource};

//! End-to-end reconciliation run.
//!
//! Models are processed strictly one at a time in enumeration order. Only
//! enumeration failure (or an unusable destination root) aborts a run; every
//! other failure is recorded against its model and the run moves on.

use crate::cancel::CancellationToken;
use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::link::{
    CleanupReport, CleanupWalker, LinkDecision, LinkIndex, LinkPlanner, PruneReport,
};
use crate::source::{ModelEntry, ModelSource, SizeFilter};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// When the cleanup walker runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Once, after the last model.
    #[default]
    EndOfRun,
    Disabled,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Plan only; leave the filesystem untouched.
    pub dry_run: bool,
    pub cleanup: CleanupPolicy,
    pub size_filter: SizeFilter,
}

/// What happened to one model.
#[derive(Debug, Clone)]
pub struct ModelOutcome {
    pub model: String,
    pub decision: LinkDecision,
    pub link_path: PathBuf,
    pub backing: Option<PathBuf>,
    pub canonical: Option<PathBuf>,
    /// Why the model was rejected.
    pub reject: Option<String>,
    /// Error raised while applying the decision.
    pub error: Option<String>,
    /// Whether the filesystem was modified for this model.
    pub changed: bool,
}

impl ModelOutcome {
    pub fn is_failure(&self) -> bool {
        self.reject.is_some() || self.error.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<ModelOutcome>,
    /// Pre-existing duplicate links removed before processing.
    pub pruned: PruneReport,
    pub cleanup: Option<CleanupReport>,
    /// The run stopped early on request.
    pub cancelled: bool,
    pub dry_run: bool,
}

impl RunReport {
    pub fn count(&self, decision: LinkDecision) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.decision == decision)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ModelOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Total filesystem mutations performed by the run.
    pub fn mutations(&self) -> usize {
        self.outcomes.iter().filter(|o| o.changed).count()
            + self.pruned.removed.len()
            + self.cleanup.as_ref().map_or(0, CleanupReport::removed)
    }
}

/// One reconciliation pass of a model source against the destination tree.
pub struct ReconciliationRun<'a> {
    config: LinkConfig,
    source: &'a dyn ModelSource,
    options: RunOptions,
    cancel: CancellationToken,
}

impl<'a> ReconciliationRun<'a> {
    pub fn new(config: LinkConfig, source: &'a dyn ModelSource, options: RunOptions) -> Self {
        Self {
            config,
            source,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Share a cancellation token with the caller.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Enumerate models passing the size filter, in listing order.
    pub async fn list_models(&self) -> Result<Vec<ModelEntry>> {
        let models = self.source.list().await?;
        let total = models.len();
        let kept: Vec<ModelEntry> = models
            .into_iter()
            .filter(|m| self.options.size_filter.matches(m.size_bytes))
            .collect();
        debug!("{} of {} models pass the size filter", kept.len(), total);
        Ok(kept)
    }

    /// Enumerate and reconcile every model.
    pub async fn run(&self) -> Result<RunReport> {
        let models = self.list_models().await?;
        self.execute(&models).await
    }

    /// Reconcile `selected` in order.
    pub async fn execute(&self, selected: &[ModelEntry]) -> Result<RunReport> {
        let dry_run = self.options.dry_run;
        let planner = LinkPlanner::new(&self.config);
        let mut index = LinkIndex::build(&self.config.dest_root)?;
        let mut report = RunReport {
            dry_run,
            ..Default::default()
        };

        if dry_run {
            let doomed = planner.resolver().simulate_prune(&mut index);
            debug!("Report-only run would prune {} duplicate links", doomed.len());
        } else {
            report.pruned = planner.resolver().prune(&mut index);
        }

        for model in selected {
            if let Err(e) = self.cancel.check() {
                info!("{} before {}", e, model.name);
                report.cancelled = true;
                break;
            }

            let resolved = if model.name.is_empty() {
                Err(LinkError::ResolutionFailed {
                    model: model.name.clone(),
                })
            } else {
                self.source.resolve(&model.name).await
            };

            let plan = planner.plan(&model.name, resolved, &index);
            let mut outcome = ModelOutcome {
                model: plan.model.clone(),
                decision: plan.decision,
                link_path: plan.link_path().to_path_buf(),
                backing: plan.backing.clone(),
                canonical: plan.canonical.clone(),
                reject: plan.reject.as_ref().map(ToString::to_string),
                error: None,
                changed: false,
            };

            if let Some(reason) = &outcome.reject {
                warn!("Skipping model {}: {}", model.name, reason);
            }

            if dry_run {
                planner.simulate(&plan, &mut index);
            } else {
                match planner.apply(&plan, &mut index) {
                    Ok(changed) => outcome.changed = changed,
                    Err(e) => {
                        warn!("Failed to {} {}: {}", plan.decision, model.name, e);
                        outcome.error = Some(e.to_string());
                    }
                }
            }

            debug!("{}: {}", model.name, plan.decision);
            report.outcomes.push(outcome);
        }

        if !dry_run && self.options.cleanup == CleanupPolicy::EndOfRun {
            report.cleanup = Some(CleanupWalker::new(&self.config).cleanup());
        }

        info!(
            "Run finished: {} created, {} repaired, {} skipped, {} deduplicated, {} rejected",
            report.count(LinkDecision::Create),
            report.count(LinkDecision::Repair),
            report.count(LinkDecision::Skip),
            report.count(LinkDecision::Deduplicate),
            report.count(LinkDecision::Reject),
        );
        Ok(report)
    }
}

//! Tiered reconciliation of resolved leaves.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strata_core::ArtifactSpec;
use strata_registry::{GenerateContext, Leaf, LeafSet};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::{ArtifactError, ReconcileError, Result};
use crate::pool::{panic_message, run_bounded, TaskResult};
use crate::reconcile::{reconcile_artifact, Reconciled};
use crate::report::{ArtifactOutcome, ArtifactState, ReconciliationReport, SettleOrder};
use crate::storage::ProjectStore;
use crate::tier::partition;

/// Which artifacts a run materializes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityFilter {
    #[default]
    All,
    /// Only artifacts with priority above zero.
    Bootstrap,
}

impl PriorityFilter {
    pub fn admits(self, priority: i32) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Bootstrap => priority > 0,
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum concurrent artifacts within one tier.
    pub workers: usize,
    /// Whole-run deadline measured from the start of pre-flight.
    pub timeout: Option<Duration>,
    /// Compute outcomes without writing.
    pub dry_run: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            timeout: None,
            dry_run: false,
        }
    }
}

/// A leaf that passed pre-flight.
struct Planned<'a> {
    /// Index of the leaf set this leaf came from.
    set: usize,
    position: usize,
    leaf: &'a Leaf,
    spec: ArtifactSpec,
    path: PathBuf,
}

/// A pre-flight failure that does not abort the run: `(set, position, outcome)`.
type EarlyOutcome = (usize, usize, ArtifactOutcome);

/// Outcomes of one run, grouped per leaf set in discovery order.
struct Run {
    run_id: Uuid,
    duration_ms: u64,
    outcomes: Vec<Vec<ArtifactOutcome>>,
}

/// Materializes leaf sets under a project root.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    config: EngineConfig,
    ctx: GenerateContext,
    store: ProjectStore,
}

impl ReconciliationEngine {
    pub fn new(ctx: GenerateContext, config: EngineConfig) -> Self {
        let store = ProjectStore::new(&ctx.project_root);
        ReconciliationEngine { config, ctx, store }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &GenerateContext {
        &self.ctx
    }

    /// Reconcile every leaf admitted by `filter`.
    ///
    /// Pre-flight generates every spec and rejects invalid or colliding
    /// target paths before anything is written. Tiers then run highest
    /// priority first; each tier settles fully before the next starts.
    pub fn reconcile_all(
        &self,
        leaves: &LeafSet,
        filter: PriorityFilter,
    ) -> Result<ReconciliationReport> {
        let mut run = self.run(&[leaves], filter)?;
        let outcomes = run.outcomes.pop().unwrap_or_default();
        Ok(report(&run, leaves, outcomes, self.config.dry_run))
    }

    /// Reconcile several leaf sets as a single run, one report per set.
    ///
    /// Pre-flight spans every set, so an invalid target in any set aborts
    /// the run before the first write and no two sets may target the same
    /// path. Tiers mix leaves of all sets and share one deadline.
    pub fn reconcile_sets(
        &self,
        sets: &[&LeafSet],
        filter: PriorityFilter,
    ) -> Result<Vec<ReconciliationReport>> {
        let mut run = self.run(sets, filter)?;
        let grouped = std::mem::take(&mut run.outcomes);
        Ok(sets
            .iter()
            .zip(grouped)
            .map(|(set, outcomes)| report(&run, set, outcomes, self.config.dry_run))
            .collect())
    }

    fn run(&self, sets: &[&LeafSet], filter: PriorityFilter) -> Result<Run> {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let kinds: Vec<&str> = sets.iter().map(|s| s.kind.as_str()).collect();
        let span = info_span!("reconcile", run_id = %run_id, kinds = %kinds.join(","));
        let _enter = span.enter();

        let deadline = self.config.timeout.map(|t| start + t);
        let (planned, early) = self.preflight(sets)?;
        let planned: Vec<Planned<'_>> = planned
            .into_iter()
            .filter(|p| filter.admits(p.spec.priority))
            .collect();
        info!(
            leaves = sets.iter().map(|s| s.len()).sum::<usize>(),
            admitted = planned.len(),
            dry_run = self.config.dry_run,
            "pre-flight passed"
        );

        let mut grouped: Vec<Vec<(usize, ArtifactOutcome)>> = vec![Vec::new(); sets.len()];
        for (set, position, outcome) in early {
            grouped[set].push((position, outcome));
        }

        let clock = AtomicU64::new(0);
        for tier in partition(planned, |p| p.spec.priority) {
            let tier_span = info_span!(
                "tier",
                priority = tier.priority,
                artifacts = tier.items.len()
            );
            let _tier = tier_span.enter();

            let results = run_bounded(&tier.items, self.config.workers, deadline, |item| {
                let _artifact = tier_span.enter();
                let started = clock.fetch_add(1, Ordering::SeqCst);
                let result =
                    reconcile_artifact(&self.store, &item.path, &item.spec, self.config.dry_run);
                let finished = clock.fetch_add(1, Ordering::SeqCst);
                (result, SettleOrder { started, finished })
            });

            for (item, result) in tier.items.iter().zip(results) {
                let outcome = settle(item, result);
                log_outcome(&outcome);
                grouped[item.set].push((item.position, outcome));
            }
        }

        let outcomes = grouped
            .into_iter()
            .map(|mut outcomes| {
                outcomes.sort_by_key(|(position, _)| *position);
                outcomes.into_iter().map(|(_, o)| o).collect()
            })
            .collect();
        Ok(Run {
            run_id,
            duration_ms: start.elapsed().as_millis() as u64,
            outcomes,
        })
    }

    /// Generate every spec and check target paths across all sets.
    ///
    /// Generator failures become `Failed` outcomes and take no part in the
    /// collision check.
    fn preflight<'a>(
        &self,
        sets: &[&'a LeafSet],
    ) -> Result<(Vec<Planned<'a>>, Vec<EarlyOutcome>)> {
        let mut planned = Vec::new();
        let mut early = Vec::new();
        let mut claimed: HashMap<PathBuf, (usize, &'a str)> = HashMap::new();

        for (set, &leaves) in sets.iter().enumerate() {
            for (position, leaf) in leaves.iter().enumerate() {
                let generated =
                    panic::catch_unwind(AssertUnwindSafe(|| leaf.generate(&self.ctx)));
                let spec = match generated {
                    Ok(Ok(spec)) => spec,
                    Ok(Err(e)) => {
                        let outcome = failed_outcome(leaf, ArtifactError::Generate(e));
                        log_outcome(&outcome);
                        early.push((set, position, outcome));
                        continue;
                    }
                    Err(payload) => {
                        let err = ArtifactError::Panicked(panic_message(payload.as_ref()));
                        let outcome = failed_outcome(leaf, err);
                        log_outcome(&outcome);
                        early.push((set, position, outcome));
                        continue;
                    }
                };

                let path = spec
                    .normalized_path()
                    .map_err(|source| ReconcileError::InvalidTarget {
                        identity: leaf.identity.clone(),
                        source,
                    })?;
                if let Some((first_set, first)) =
                    claimed.insert(path.clone(), (set, leaf.implementation.as_str()))
                {
                    let across = first_set != set;
                    return Err(ReconcileError::PathCollision {
                        path,
                        first: claimant(first, &sets[first_set].kind, across),
                        second: claimant(&leaf.implementation, &leaves.kind, across),
                    });
                }
                debug!(
                    implementation = %leaf.implementation,
                    path = %path.display(),
                    priority = spec.priority,
                    "planned"
                );
                planned.push(Planned {
                    set,
                    position,
                    leaf,
                    spec,
                    path,
                });
            }
        }

        Ok((planned, early))
    }
}

/// Name a colliding implementation, qualified by kind when kinds differ.
fn claimant(implementation: &str, kind: &str, across_kinds: bool) -> String {
    if across_kinds {
        format!("{implementation} (kind {kind})")
    } else {
        implementation.to_string()
    }
}

fn report(
    run: &Run,
    leaves: &LeafSet,
    outcomes: Vec<ArtifactOutcome>,
    dry_run: bool,
) -> ReconciliationReport {
    let report = ReconciliationReport {
        run_id: run.run_id,
        kind: leaves.kind.clone(),
        dry_run,
        duration_ms: run.duration_ms,
        outcomes,
    };
    let counts = report.counts();
    info!(
        kind = %report.kind,
        created = counts.created,
        updated = counts.updated,
        unchanged = counts.unchanged,
        skipped = counts.skipped,
        failed = counts.failed,
        incomplete = counts.incomplete,
        "reconciliation finished"
    );
    report
}

fn blank_outcome(leaf: &Leaf, state: ArtifactState) -> ArtifactOutcome {
    ArtifactOutcome {
        identity: leaf.identity.clone(),
        implementation: leaf.implementation.clone(),
        path: None,
        priority: None,
        state,
        added: Vec::new(),
        divergences: Vec::new(),
        error: None,
        digest: None,
        order: None,
    }
}

fn failed_outcome(leaf: &Leaf, err: ArtifactError) -> ArtifactOutcome {
    ArtifactOutcome {
        error: Some(err.to_string()),
        ..blank_outcome(leaf, ArtifactState::Failed)
    }
}

fn settle(
    item: &Planned<'_>,
    result: TaskResult<(std::result::Result<Reconciled, ArtifactError>, SettleOrder)>,
) -> ArtifactOutcome {
    let mut outcome = match result {
        TaskResult::Done((Ok(done), order)) => ArtifactOutcome {
            added: done.added,
            divergences: done.divergences,
            digest: Some(done.digest),
            order: Some(order),
            ..blank_outcome(item.leaf, done.state)
        },
        TaskResult::Done((Err(err), order)) => ArtifactOutcome {
            order: Some(order),
            ..failed_outcome(item.leaf, err)
        },
        TaskResult::Panicked(message) => {
            failed_outcome(item.leaf, ArtifactError::Panicked(message))
        }
        TaskResult::NotStarted => blank_outcome(item.leaf, ArtifactState::Incomplete),
    };
    outcome.path = Some(item.path.clone());
    outcome.priority = Some(item.spec.priority);
    outcome
}

fn log_outcome(outcome: &ArtifactOutcome) {
    let path = outcome
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    match outcome.state {
        ArtifactState::Failed => warn!(
            identity = %outcome.identity,
            path = %path,
            error = outcome.error.as_deref().unwrap_or_default(),
            "artifact failed"
        ),
        ArtifactState::Skipped => warn!(identity = %outcome.identity, path = %path, "opted out"),
        ArtifactState::Incomplete => {
            warn!(identity = %outcome.identity, path = %path, "deadline passed before start")
        }
        state => debug!(
            identity = %outcome.identity,
            path = %path,
            state = %state,
            added = outcome.added.len(),
            "artifact settled"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_admits_positive_only() {
        assert!(PriorityFilter::Bootstrap.admits(1));
        assert!(!PriorityFilter::Bootstrap.admits(0));
        assert!(!PriorityFilter::Bootstrap.admits(-3));
        assert!(PriorityFilter::All.admits(-3));
    }

    #[test]
    fn default_config_has_workers() {
        let config = EngineConfig::default();
        assert!(config.workers >= 1);
        assert!(config.timeout.is_none());
        assert!(!config.dry_run);
    }
}

//! End-to-end runs: resolve leaves, then reconcile them.

use std::collections::HashSet;
use std::sync::Arc;

use strata_registry::{ArtifactKind, LeafSet};
use tracing::info_span;

use crate::context::Session;
use crate::engine::{PriorityFilter, ReconciliationEngine};
use crate::error::Result;
use crate::report::ReconciliationReport;

/// Discover, resolve, and reconcile one kind.
pub fn run_kind(
    session: &mut Session,
    engine: &ReconciliationEngine,
    kind: &ArtifactKind,
    filter: PriorityFilter,
) -> Result<ReconciliationReport> {
    let leaves = resolve(session, kind)?;
    engine.reconcile_all(&leaves, filter)
}

/// Reconcile several kinds as one run, one report per distinct kind.
///
/// Every kind is resolved before pre-flight and pre-flight covers all of
/// them, so any fatal error leaves the project untouched.
pub fn run_kinds(
    session: &mut Session,
    engine: &ReconciliationEngine,
    kinds: &[ArtifactKind],
    filter: PriorityFilter,
) -> Result<Vec<ReconciliationReport>> {
    let mut seen = HashSet::new();
    let resolved = kinds
        .iter()
        .filter(|kind| seen.insert(*kind))
        .map(|kind| resolve(session, kind))
        .collect::<Result<Vec<_>>>()?;

    let sets: Vec<&LeafSet> = resolved.iter().map(Arc::as_ref).collect();
    engine.reconcile_sets(&sets, filter)
}

fn resolve(session: &mut Session, kind: &ArtifactKind) -> Result<Arc<LeafSet>> {
    let span = info_span!("kind", name = %kind.name, owner = %kind.owner);
    let _enter = span.enter();
    session.leaves(kind)
}

//! Reconciliation engine for Strata.
//!
//! Takes the leaves resolved for one or more artifact kinds and brings the
//! project's files into conformance with them in a single run:
//!
//! 1. Pre-flight: generate every spec, validate and de-duplicate targets
//!    across all kinds.
//! 2. Partition into priority tiers, highest first.
//! 3. Run each tier on a bounded worker pool; a tier settles before the
//!    next starts.
//!
//! Existing files are never rewritten beyond adding what is missing, and a
//! second run with no external change leaves every artifact `Unchanged`.

pub mod context;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod reconcile;
pub mod report;
pub mod storage;
pub mod tier;

pub use context::Session;
pub use engine::{EngineConfig, PriorityFilter, ReconciliationEngine};
pub use error::{ArtifactError, ReconcileError, Result};
pub use pipeline::{run_kind, run_kinds};
pub use report::{ArtifactOutcome, ArtifactState, ReconciliationReport, SettleOrder, StateCounts};
pub use storage::ProjectStore;

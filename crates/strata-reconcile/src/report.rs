//! Reconciliation report.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use strata_core::{ContentHash, Divergence, TreeChange};
use uuid::Uuid;

/// Final state of one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactState {
    /// File was absent and has been written in full.
    Created,
    /// Missing entries were merged into an existing file.
    Updated,
    /// Existing file already contained the required subset.
    Unchanged,
    /// Existing file carries the opt-out marker.
    Skipped,
    /// Existing content, I/O, or the generator failed.
    Failed,
    /// Not settled before the run's deadline.
    Incomplete,
}

impl ArtifactState {
    pub const ALL: [ArtifactState; 6] = [
        ArtifactState::Created,
        ArtifactState::Updated,
        ArtifactState::Unchanged,
        ArtifactState::Skipped,
        ArtifactState::Failed,
        ArtifactState::Incomplete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactState::Created => "created",
            ArtifactState::Updated => "updated",
            ArtifactState::Unchanged => "unchanged",
            ArtifactState::Skipped => "skipped",
            ArtifactState::Failed => "failed",
            ArtifactState::Incomplete => "incomplete",
        }
    }

    /// Whether this state makes the run unsuccessful.
    pub fn is_error(self) -> bool {
        matches!(self, ArtifactState::Failed | ArtifactState::Incomplete)
    }

    /// Whether this state means the file was (or would be) written.
    pub fn is_change(self) -> bool {
        matches!(self, ArtifactState::Created | ArtifactState::Updated)
    }
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a task ran relative to the others in the same run.
///
/// Both values come from one counter shared by every worker, so
/// `a.finished < b.started` means `a` settled before `b` began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettleOrder {
    pub started: u64,
    pub finished: u64,
}

/// Outcome for one leaf.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactOutcome {
    pub identity: String,
    pub implementation: String,
    /// Target path; absent when the generator failed before producing one.
    pub path: Option<PathBuf>,
    pub priority: Option<i32>,
    pub state: ArtifactState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<TreeChange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub divergences: Vec<Divergence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// SHA-256 of the content on disk after this run (or that would be, in
    /// a dry run).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<ContentHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SettleOrder>,
}

/// Number of outcomes in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub incomplete: usize,
}

impl StateCounts {
    pub fn get(&self, state: ArtifactState) -> usize {
        match state {
            ArtifactState::Created => self.created,
            ArtifactState::Updated => self.updated,
            ArtifactState::Unchanged => self.unchanged,
            ArtifactState::Skipped => self.skipped,
            ArtifactState::Failed => self.failed,
            ArtifactState::Incomplete => self.incomplete,
        }
    }

    fn bump(&mut self, state: ArtifactState) {
        let slot = match state {
            ArtifactState::Created => &mut self.created,
            ArtifactState::Updated => &mut self.updated,
            ArtifactState::Unchanged => &mut self.unchanged,
            ArtifactState::Skipped => &mut self.skipped,
            ArtifactState::Failed => &mut self.failed,
            ArtifactState::Incomplete => &mut self.incomplete,
        };
        *slot += 1;
    }
}

/// Result of reconciling one kind's leaves.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub run_id: Uuid,
    pub kind: String,
    pub dry_run: bool,
    pub duration_ms: u64,
    pub outcomes: Vec<ArtifactOutcome>,
}

impl ReconciliationReport {
    pub fn counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for outcome in &self.outcomes {
            counts.bump(outcome.state);
        }
        counts
    }

    /// True when nothing failed and everything settled.
    pub fn is_success(&self) -> bool {
        !self.outcomes.iter().any(|o| o.state.is_error())
    }

    /// True when every artifact was already in conformance (or opted out).
    pub fn is_clean(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o.state, ArtifactState::Unchanged | ArtifactState::Skipped))
    }

    pub fn outcome(&self, identity: &str) -> Option<&ArtifactOutcome> {
        self.outcomes.iter().find(|o| o.identity == identity)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ReconciliationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== Reconciliation: {} ({}){} ===",
            self.kind,
            self.run_id,
            if self.dry_run { " [dry run]" } else { "" }
        )?;

        for outcome in &self.outcomes {
            let path = outcome
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            write!(f, "  {:<10} {path}  ({})", outcome.state, outcome.identity)?;
            if let Some(digest) = &outcome.digest {
                write!(f, " {}", digest.short())?;
            }
            writeln!(f)?;

            for change in &outcome.added {
                writeln!(f, "      + {} = {}", display_pointer(&change.pointer), change.value)?;
            }
            for divergence in &outcome.divergences {
                writeln!(
                    f,
                    "      ~ {} kept {} (declared {})",
                    display_pointer(&divergence.pointer),
                    divergence.existing,
                    divergence.required
                )?;
            }
            if let Some(error) = &outcome.error {
                writeln!(f, "      ! {error}")?;
            }
        }

        let counts = self.counts();
        let summary: Vec<String> = ArtifactState::ALL
            .iter()
            .filter(|s| counts.get(**s) > 0)
            .map(|s| format!("{} {}", counts.get(*s), s))
            .collect();
        writeln!(f)?;
        write!(
            f,
            "{} artifact(s) in {} ms",
            self.outcomes.len(),
            self.duration_ms
        )?;
        if !summary.is_empty() {
            write!(f, ": {}", summary.join(", "))?;
        }
        writeln!(f)
    }
}

fn display_pointer(pointer: &str) -> &str {
    if pointer.is_empty() {
        "/"
    } else {
        pointer
    }
}

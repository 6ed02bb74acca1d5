//! `strata check`: dry run that fails when anything would change.

use std::path::Path;

use anyhow::{bail, Result};
use strata_reconcile::ReconciliationReport;

use crate::commands::reconcile::{execute, print_reports, ReconcileOptions};
use crate::commands::{OutputFormat, Project};

/// Number of artifacts a real run would write.
pub fn pending_changes(reports: &[ReconciliationReport]) -> usize {
    reports
        .iter()
        .flat_map(|r| &r.outcomes)
        .filter(|o| o.state.is_change())
        .count()
}

pub fn run(cwd: &Path, opts: ReconcileOptions, format: OutputFormat) -> Result<()> {
    let mut project = Project::load(cwd)?;
    let opts = ReconcileOptions {
        dry_run: true,
        ..opts
    };
    let reports = execute(&mut project, &opts)?;
    print_reports(&reports, format)?;

    if let Some(failed) = reports.iter().find(|r| !r.is_success()) {
        let counts = failed.counts();
        bail!(
            "kind '{}': {} failed, {} incomplete",
            failed.kind,
            counts.failed,
            counts.incomplete
        );
    }
    let pending = pending_changes(&reports);
    if pending > 0 {
        bail!("{pending} artifact(s) out of date; run `strata reconcile`");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture;

    #[test]
    fn check_reports_pending_then_clean() {
        let dir = tempfile::tempdir().unwrap();
        fixture::write(dir.path());

        let dry = ReconcileOptions {
            dry_run: true,
            ..Default::default()
        };
        let mut project = Project::load(dir.path()).unwrap();
        let reports = execute(&mut project, &dry).unwrap();
        assert_eq!(pending_changes(&reports), 2);
        assert!(!dir.path().join("lint.json").exists());

        let mut project = Project::load(dir.path()).unwrap();
        execute(&mut project, &ReconcileOptions::default()).unwrap();

        let mut project = Project::load(dir.path()).unwrap();
        let reports = execute(&mut project, &dry).unwrap();
        assert_eq!(pending_changes(&reports), 0);
        assert!(run(dir.path(), ReconcileOptions::default(), OutputFormat::Json).is_ok());
    }
}

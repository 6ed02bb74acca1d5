//! `strata reconcile`: bring project files into conformance.

use std::path::Path;

use anyhow::{bail, Result};
use strata_reconcile::{run_kinds, PriorityFilter, ReconciliationReport};

use crate::commands::{OutputFormat, Project};

/// Options shared by `reconcile` and `check`.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Only this kind; all declared kinds when `None`.
    pub kind: Option<String>,
    pub bootstrap: bool,
    pub dry_run: bool,
    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Reconcile the selected kinds and return one report per kind.
pub fn execute(
    project: &mut Project,
    opts: &ReconcileOptions,
) -> Result<Vec<ReconciliationReport>> {
    let kinds = match &opts.kind {
        Some(name) => vec![project.manifest.artifact_kind(name)?],
        None => project.manifest.artifact_kinds()?,
    };
    if kinds.is_empty() {
        bail!("no [[kind]] entries in strata.toml; nothing to reconcile");
    }

    let filter = if opts.bootstrap {
        PriorityFilter::Bootstrap
    } else {
        PriorityFilter::All
    };
    let engine = project.engine(opts.jobs, opts.timeout_secs, opts.dry_run);
    Ok(run_kinds(&mut project.session, &engine, &kinds, filter)?)
}

pub fn run(cwd: &Path, opts: &ReconcileOptions, format: OutputFormat) -> Result<()> {
    let mut project = Project::load(cwd)?;
    let reports = execute(&mut project, opts)?;
    print_reports(&reports, format)?;

    let unsettled: usize = reports
        .iter()
        .map(|r| {
            let counts = r.counts();
            counts.failed + counts.incomplete
        })
        .sum();
    if unsettled > 0 {
        bail!("{unsettled} artifact(s) failed or did not finish");
    }
    Ok(())
}

pub(crate) fn print_reports(reports: &[ReconciliationReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            for report in reports {
                print!("{report}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(reports)?),
    }
    Ok(())
}

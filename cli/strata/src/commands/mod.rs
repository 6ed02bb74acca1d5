//! CLI command implementations.

pub mod check;
pub mod leaves;
pub mod order;
pub mod reconcile;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use strata_reconcile::{ReconciliationEngine, Session};
use strata_registry::GenerateContext;

use crate::manifest::StrataManifest;

/// Report output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// A loaded project: manifest, its directory, and a fresh session.
pub struct Project {
    pub manifest: StrataManifest,
    pub dir: PathBuf,
    pub session: Session,
}

impl Project {
    /// Find `strata.toml` from `cwd` upward and prepare a session.
    pub fn load(cwd: &Path) -> Result<Self> {
        let (manifest, dir) = StrataManifest::load_required(cwd)?;
        let packages = manifest.package_nodes(&dir)?;
        let source = manifest.declaration_source(&dir)?;
        let session = Session::new(packages, Arc::new(source));
        Ok(Project {
            manifest,
            dir,
            session,
        })
    }

    pub fn generate_context(&self) -> GenerateContext {
        GenerateContext {
            project_name: self.manifest.project.name.clone(),
            project_root: self.manifest.project_root(&self.dir),
        }
    }

    pub fn engine(
        &self,
        jobs: Option<usize>,
        timeout_secs: Option<u64>,
        dry_run: bool,
    ) -> ReconciliationEngine {
        let config = self.manifest.engine_config(jobs, timeout_secs, dry_run);
        ReconciliationEngine::new(self.generate_context(), config)
    }
}

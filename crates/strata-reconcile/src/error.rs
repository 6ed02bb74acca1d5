//! Reconciliation errors.

use std::path::PathBuf;

use strata_core::{FormatError, SpecError, TreeError};
use strata_graph::GraphError;
use strata_registry::{GenerateError, RegistryError};
use thiserror::Error;

/// Errors that abort a whole reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Two leaves would write the same file.
    #[error("path collision at {}: '{first}' and '{second}' both target it", path.display())]
    PathCollision {
        path: PathBuf,
        first: String,
        second: String,
    },

    /// A leaf targets a path outside the project root.
    #[error("invalid target for '{identity}': {source}")]
    InvalidTarget {
        identity: String,
        #[source]
        source: SpecError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Failure of one artifact. Recorded in the report as `Failed`; never
/// aborts the run.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("generator failed: {0}")]
    Generate(#[from] GenerateError),

    #[error("existing content is unreadable: {0}")]
    Format(#[from] FormatError),

    #[error("existing content cannot be merged: {0}")]
    Tree(#[from] TreeError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("panicked: {0}")]
    Panicked(String),
}

/// Result type alias for run-level operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

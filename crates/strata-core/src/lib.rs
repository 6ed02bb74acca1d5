//! Core types shared across the Strata workspace.
//!
//! Defines the declarative [`ArtifactSpec`] every artifact generator
//! produces, the content [`Format`]s artifacts are persisted in, and the
//! recursive subset/merge operations over semi-structured value trees that
//! make reconciliation non-destructive.
//!
//! Value trees are plain `serde_json::Value`s (maps, sequences, scalars)
//! regardless of the on-disk format; TOML content is converted on the way
//! in and out.

pub mod error;
pub mod format;
pub mod hash;
pub mod spec;
pub mod tree;

pub use error::{FormatError, SpecError, TreeError};
pub use format::{Format, TOML_DATETIME_KEY};
pub use hash::ContentHash;
pub use spec::{ArtifactSpec, SequencePolicy};
pub use tree::{contains_subset, merge_missing, Divergence, MergeOutcome, TreeChange};

/// The value-tree type all artifact content is expressed in.
pub type Value = serde_json::Value;

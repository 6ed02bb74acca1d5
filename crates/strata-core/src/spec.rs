//! Declarative artifact specifications.
//!
//! An [`ArtifactSpec`] is everything the engine needs to know about one
//! generated artifact: where it lives, what it must contain, how it is
//! persisted, and how it ranks against other artifacts.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, SpecError};
use crate::format::Format;
use crate::Value;

/// How sequences in the required content are reconciled against existing
/// sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SequencePolicy {
    /// Every required element must appear (by equality) in the existing
    /// sequence; missing elements are appended in declared order.
    #[default]
    AppendMissing,
    /// Any existing sequence satisfies the requirement and is left alone.
    Ignore,
}

/// The declarative description of one generated artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    /// Ordering tier; higher priorities are materialized first.
    #[serde(default)]
    pub priority: i32,
    /// Target path relative to the project root.
    pub path: PathBuf,
    /// Persisted content format.
    pub format: Format,
    /// The subset of content the artifact requires.
    pub content: Value,
    /// Text that, when present in the existing file, freezes it.
    #[serde(default)]
    pub opt_out_marker: Option<String>,
    /// Sequence reconciliation policy.
    #[serde(default)]
    pub sequences: SequencePolicy,
}

impl ArtifactSpec {
    /// Create a spec, inferring the format from the path's extension.
    pub fn new(path: impl Into<PathBuf>, content: Value) -> Result<Self, SpecError> {
        let path = path.into();
        let format = Format::from_path(&path).ok_or_else(|| SpecError::UnknownFormat(path.clone()))?;
        Ok(Self::with_format(path, format, content))
    }

    /// Create a spec with an explicit format.
    pub fn with_format(path: impl Into<PathBuf>, format: Format, content: Value) -> Self {
        ArtifactSpec {
            priority: 0,
            path: path.into(),
            format,
            content,
            opt_out_marker: None,
            sequences: SequencePolicy::default(),
        }
    }

    /// Set the priority tier.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the opt-out marker.
    pub fn opt_out_marker(mut self, marker: impl Into<String>) -> Self {
        self.opt_out_marker = Some(marker.into());
        self
    }

    /// Set the sequence policy.
    pub fn sequences(mut self, policy: SequencePolicy) -> Self {
        self.sequences = policy;
        self
    }

    /// Check that the target path is a non-empty path inside the project
    /// root, and return its normalized form.
    pub fn normalized_path(&self) -> Result<PathBuf, SpecError> {
        normalize_relative(&self.path)
    }

    /// Whether existing persisted text carries this spec's opt-out marker.
    pub fn is_opted_out(&self, existing: &str) -> bool {
        self.opt_out_marker
            .as_deref()
            .is_some_and(|marker| !marker.is_empty() && existing.contains(marker))
    }

    /// Render the full required content for a fresh file.
    pub fn render(&self) -> Result<String, FormatError> {
        self.format.render(&self.content)
    }
}

/// Normalize a project-relative path, rejecting absolute or escaping ones.
fn normalize_relative(path: &Path) -> Result<PathBuf, SpecError> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return Err(SpecError::EscapingPath(path.to_path_buf()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SpecError::AbsolutePath(path.to_path_buf()));
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(SpecError::EmptyPath);
    }
    Ok(out)
}

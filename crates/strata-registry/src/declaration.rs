//! Artifact declarations and their generators.
//!
//! A [`Declaration`] registers one implementation of an artifact kind at a
//! location. Generators are pure: given the project context and the spec
//! produced by the implementation they override (if any), they return a
//! complete [`ArtifactSpec`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strata_core::{ArtifactSpec, Format, SequencePolicy, SpecError, Value};

/// Read-only facts about the project being reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateContext {
    /// Project name.
    pub project_name: String,
    /// Absolute project root directory.
    pub project_root: PathBuf,
}

/// Errors a generator can report.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("missing field '{0}' and nothing to inherit it from")]
    MissingField(&'static str),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("{0}")]
    Failed(String),
}

/// Produces an artifact spec, optionally refining an inherited one.
pub trait ArtifactGenerator: Send + Sync + fmt::Debug {
    fn generate(
        &self,
        ctx: &GenerateContext,
        inherited: Option<&ArtifactSpec>,
    ) -> Result<ArtifactSpec, GenerateError>;
}

/// One registered implementation of an artifact kind.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// Name of the abstract kind this implements.
    pub kind: String,
    /// Name unique within its location.
    pub name: String,
    /// Explicit identity, shared by every hierarchy that declares it.
    pub identity: Option<String>,
    /// Full id (`location::name`) of the implementation this overrides.
    pub overrides: Option<String>,
    /// Spec producer.
    pub generator: Arc<dyn ArtifactGenerator>,
}

impl Declaration {
    /// Declare a new base implementation.
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        generator: impl ArtifactGenerator + 'static,
    ) -> Self {
        Declaration {
            kind: kind.into(),
            name: name.into(),
            identity: None,
            overrides: None,
            generator: Arc::new(generator),
        }
    }

    /// Share an explicit identity.
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Mark this declaration as overriding `target` (a full implementation id).
    pub fn overrides(mut self, target: impl Into<String>) -> Self {
        self.overrides = Some(target.into());
        self
    }
}

/// Generator backed by a closure.
pub struct FnGenerator<F>(pub F);

impl<F> ArtifactGenerator for FnGenerator<F>
where
    F: Fn(&GenerateContext, Option<&ArtifactSpec>) -> Result<ArtifactSpec, GenerateError>
        + Send
        + Sync,
{
    fn generate(
        &self,
        ctx: &GenerateContext,
        inherited: Option<&ArtifactSpec>,
    ) -> Result<ArtifactSpec, GenerateError> {
        (self.0)(ctx, inherited)
    }
}

impl<F> fmt::Debug for FnGenerator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnGenerator(..)")
    }
}

/// Generator that always yields the same spec, ignoring inheritance.
#[derive(Debug, Clone)]
pub struct FixedGenerator(pub ArtifactSpec);

impl ArtifactGenerator for FixedGenerator {
    fn generate(
        &self,
        _ctx: &GenerateContext,
        _inherited: Option<&ArtifactSpec>,
    ) -> Result<ArtifactSpec, GenerateError> {
        Ok(self.0.clone())
    }
}

/// Spec fields an implementation sets; unset fields are inherited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PartialSpec {
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub format: Option<Format>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub opt_out_marker: Option<String>,
    #[serde(default)]
    pub sequences: Option<SequencePolicy>,
}

impl ArtifactGenerator for PartialSpec {
    fn generate(
        &self,
        _ctx: &GenerateContext,
        inherited: Option<&ArtifactSpec>,
    ) -> Result<ArtifactSpec, GenerateError> {
        let path = match (&self.path, inherited) {
            (Some(path), _) => path.clone(),
            (None, Some(parent)) => parent.path.clone(),
            (None, None) => return Err(GenerateError::MissingField("path")),
        };
        // An explicit format wins; a new path re-infers; otherwise inherit.
        let format = match (self.format, &self.path, inherited) {
            (Some(format), _, _) => format,
            (None, None, Some(parent)) => parent.format,
            (None, _, _) => {
                Format::from_path(&path).ok_or_else(|| SpecError::UnknownFormat(path.clone()))?
            }
        };
        let content = match (&self.content, inherited) {
            (Some(content), _) => content.clone(),
            (None, Some(parent)) => parent.content.clone(),
            (None, None) => return Err(GenerateError::MissingField("content")),
        };

        Ok(ArtifactSpec {
            priority: self
                .priority
                .or(inherited.map(|p| p.priority))
                .unwrap_or_default(),
            path,
            format,
            content,
            opt_out_marker: self
                .opt_out_marker
                .clone()
                .or_else(|| inherited.and_then(|p| p.opt_out_marker.clone())),
            sequences: self
                .sequences
                .or(inherited.map(|p| p.sequences))
                .unwrap_or_default(),
        })
    }
}

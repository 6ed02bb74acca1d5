//! Registry error types.

use strata_graph::GraphError;

/// Failure to load one declaration location.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Errors that can occur while discovering and resolving implementations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A declared override location exists but failed to load.
    #[error("failed to load {location} (package '{package}'): {source}")]
    LoadFailed {
        package: String,
        location: String,
        #[source]
        source: LoadError,
    },

    /// An override names an implementation that was never discovered.
    #[error("'{implementation}' overrides unknown implementation '{target}'")]
    UnknownOverride {
        implementation: String,
        target: String,
    },

    /// Two declarations resolve to the same implementation id.
    #[error("duplicate implementation '{0}'")]
    DuplicateImplementation(String),

    /// A declaration is internally inconsistent.
    #[error("invalid declaration '{implementation}': {detail}")]
    InvalidDeclaration {
        implementation: String,
        detail: String,
    },

    /// No single deepest implementation exists for an identity.
    #[error(
        "ambiguous leaf for identity '{identity}': {} all at depth {depth}",
        candidates.join(", ")
    )]
    AmbiguousLeaf {
        identity: String,
        candidates: Vec<String>,
        depth: usize,
    },

    /// Malformed module path.
    #[error("invalid module path '{0}'")]
    InvalidPath(String),

    /// Dependency graph error.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl RegistryError {
    /// Whether this error belongs to the discovery category (a declared
    /// location or override could not be honored).
    pub fn is_discovery(&self) -> bool {
        matches!(
            self,
            RegistryError::LoadFailed { .. }
                | RegistryError::UnknownOverride { .. }
                | RegistryError::DuplicateImplementation(_)
                | RegistryError::InvalidDeclaration { .. }
        )
    }
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

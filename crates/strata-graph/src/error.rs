//! Dependency graph error types.

/// Errors raised while building or querying a [`DependencyGraph`].
///
/// [`DependencyGraph`]: crate::DependencyGraph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Two packages share one name.
    #[error("duplicate package: {0}")]
    DuplicatePackage(String),

    /// Package metadata is malformed.
    #[error("invalid package '{name}': {detail}")]
    InvalidPackage { name: String, detail: String },

    /// Package version is not valid semver.
    #[error("invalid version '{version}' for package '{name}': {source}")]
    InvalidVersion {
        name: String,
        version: String,
        #[source]
        source: semver::Error,
    },

    /// The dependency relation contains a cycle.
    #[error("dependency cycle detected: {}", cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },

    /// A query named a package that is not in the graph.
    #[error("package not found: {0}")]
    UnknownPackage(String),

    /// TOML parsing error in a package index.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_display_lists_path() {
        let err = GraphError::CycleDetected {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle detected: a -> b -> a");
    }

    #[test]
    fn unknown_package_display() {
        let err = GraphError::UnknownPackage("ghost".into());
        assert!(err.to_string().contains("ghost"));
    }
}

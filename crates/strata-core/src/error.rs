//! Error types for specs, formats, and value trees.

use std::path::PathBuf;

/// A required subtree cannot be reconciled with the existing one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Existing content has a different shape than the required content.
    #[error("incompatible value at '{pointer}': expected {expected}, found {found}")]
    Incompatible {
        /// JSON pointer to the offending location ("" is the document root).
        pointer: String,
        /// Kind of value the required content declares.
        expected: &'static str,
        /// Kind of value found in the existing content.
        found: &'static str,
    },
}

/// Errors converting between on-disk text and value trees.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("{format} parse error: {detail}")]
    Parse { format: &'static str, detail: String },

    #[error("{format} render error: {detail}")]
    Render { format: &'static str, detail: String },
}

/// Invalid artifact specification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("target path must not be empty")]
    EmptyPath,

    #[error("target path {0} must be relative to the project root")]
    AbsolutePath(PathBuf),

    #[error("target path {0} escapes the project root")]
    EscapingPath(PathBuf),

    #[error("cannot infer content format for {0}; declare one explicitly")]
    UnknownFormat(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incompatible_display_names_pointer() {
        let err = TreeError::Incompatible {
            pointer: "/tool/ruff".into(),
            expected: "map",
            found: "string",
        };
        let msg = err.to_string();
        assert!(msg.contains("/tool/ruff"));
        assert!(msg.contains("expected map"));
    }

    #[test]
    fn spec_error_display() {
        let err = SpecError::EscapingPath(PathBuf::from("../outside.json"));
        assert!(err.to_string().contains("escapes"));
    }
}

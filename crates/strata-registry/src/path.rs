//! Namespaced module paths (`root::segment::segment`).

use std::fmt;

use crate::error::{RegistryError, Result};

const SEPARATOR: &str = "::";

/// A `::`-separated path naming a declaration location inside a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath {
    segments: Vec<String>,
}

impl ModulePath {
    /// Parse a path, rejecting empty paths and empty segments.
    pub fn parse(input: &str) -> Result<Self> {
        let segments: Vec<String> = input.split(SEPARATOR).map(str::to_string).collect();
        if segments.iter().any(|s| s.trim().is_empty() || s.contains(':')) {
            return Err(RegistryError::InvalidPath(input.to_string()));
        }
        Ok(ModulePath { segments })
    }

    /// Build a path from a package root namespace, skipping empty segments.
    ///
    /// Returns `None` when nothing is left.
    pub fn from_root(root: &str) -> Option<Self> {
        let segments: Vec<String> = root
            .split(SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        (!segments.is_empty()).then_some(ModulePath { segments })
    }

    /// All segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Replace the leading segment with all segments of `root`.
    pub fn rebase(&self, root: &ModulePath) -> ModulePath {
        let mut segments = root.segments.clone();
        segments.extend(self.segments[1..].iter().cloned());
        ModulePath { segments }
    }

    /// Whether `prefix` is a leading run of this path's segments.
    pub fn starts_with(&self, prefix: &ModulePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(SEPARATOR))
    }
}

impl std::str::FromStr for ModulePath {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        ModulePath::parse(s)
    }
}

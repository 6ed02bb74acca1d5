//! Package metadata and package index parsing.
//!
//! A package index is a TOML document listing the installed packages the
//! graph is built over:
//!
//! ```toml
//! [[package]]
//! name = "lint-base"
//! version = "1.2.0"
//! root = "lint_base"
//!
//! [[package]]
//! name = "lint-strict"
//! version = "0.3.1"
//! dependencies = ["lint-base"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// An installed package: immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    name: String,
    version: semver::Version,
    dependencies: Vec<String>,
    root: String,
}

impl PackageNode {
    /// Create a package whose root namespace is derived from its name.
    pub fn new(name: impl Into<String>, version: semver::Version) -> Self {
        let name = name.into();
        let root = default_root(&name);
        PackageNode {
            name,
            version,
            dependencies: Vec::new(),
            root,
        }
    }

    /// Set the declared dependency names.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Set the root namespace.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package version.
    pub fn version(&self) -> &semver::Version {
        &self.version
    }

    /// Declared dependency names, as written in the metadata.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Root namespace the package's declarations live under.
    pub fn root(&self) -> &str {
        &self.root
    }
}

/// Derive a namespace from a distribution name (`lint-base` -> `lint_base`).
pub fn default_root(name: &str) -> String {
    name.replace(['-', '.'], "_")
}

/// One `[[package]]` entry of a package index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageEntry {
    /// Package name.
    pub name: String,
    /// Semantic version.
    pub version: String,
    /// Names of packages this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Root namespace; derived from the name when omitted.
    #[serde(default)]
    pub root: Option<String>,
}

impl PackageEntry {
    /// Validate the entry and convert it into a [`PackageNode`].
    pub fn to_node(&self) -> Result<PackageNode> {
        let version =
            semver::Version::parse(&self.version).map_err(|source| GraphError::InvalidVersion {
                name: self.name.clone(),
                version: self.version.clone(),
                source,
            })?;
        let mut node =
            PackageNode::new(self.name.clone(), version).with_dependencies(self.dependencies.clone());
        if let Some(root) = &self.root {
            node = node.with_root(root.clone());
        }
        Ok(node)
    }
}

/// A parsed package index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageIndex {
    #[serde(default, rename = "package")]
    pub packages: Vec<PackageEntry>,
}

impl PackageIndex {
    /// Parse a package index from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Load a package index from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}

//! Declaration sources: where implementations are registered.
//!
//! Two backends are provided:
//! - [`StaticSource`] holds declarations registered in code.
//! - [`FsSource`] reads TOML declaration files from package directories.
//!
//! `FsSource` layout, for a package mounted at `acme::lint` on `<dir>`:
//! ```text
//! acme::lint::artifacts::config  ->  <dir>/artifacts/config.toml
//! acme::lint                     ->  <dir>/mod.toml
//! ```
//!
//! Declaration file format:
//! ```toml
//! [[artifact]]
//! kind = "project-config"
//! name = "lint"
//! overrides = "lint_base::artifacts::config::lint"
//! priority = 10
//! path = "lint.toml"
//! content = { strict = true }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::declaration::{Declaration, PartialSpec};
use crate::error::LoadError;
use crate::path::ModulePath;

/// A registry of declaration locations.
pub trait DeclarationSource: Send + Sync {
    /// Whether anything is declared at `location`.
    fn contains(&self, location: &ModulePath) -> bool;

    /// Load every declaration at `location`.
    fn load(&self, location: &ModulePath) -> Result<Vec<Declaration>, LoadError>;
}

/// Declarations registered programmatically.
#[derive(Debug, Default)]
pub struct StaticSource {
    locations: HashMap<ModulePath, Vec<Declaration>>,
}

impl StaticSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration at a location.
    pub fn register(&mut self, location: ModulePath, declaration: Declaration) -> &mut Self {
        self.locations.entry(location).or_default().push(declaration);
        self
    }

    /// Number of registered locations.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl DeclarationSource for StaticSource {
    fn contains(&self, location: &ModulePath) -> bool {
        self.locations.contains_key(location)
    }

    fn load(&self, location: &ModulePath) -> Result<Vec<Declaration>, LoadError> {
        Ok(self.locations.get(location).cloned().unwrap_or_default())
    }
}

/// One `[[artifact]]` entry of a declaration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeclarationEntry {
    kind: String,
    name: String,
    #[serde(default)]
    identity: Option<String>,
    #[serde(default)]
    overrides: Option<String>,
    #[serde(flatten)]
    spec: PartialSpec,
}

#[derive(Debug, Deserialize)]
struct DeclarationFile {
    #[serde(default, rename = "artifact")]
    artifacts: Vec<DeclarationEntry>,
}

/// Declarations read from TOML files under mounted package directories.
#[derive(Debug, Clone, Default)]
pub struct FsSource {
    mounts: Vec<(ModulePath, PathBuf)>,
}

impl FsSource {
    /// Create a source with no mounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a package's root namespace on a directory.
    pub fn mount(&mut self, root: ModulePath, dir: impl Into<PathBuf>) -> &mut Self {
        self.mounts.push((root, dir.into()));
        self
    }

    /// The file a location maps to, using the longest matching mount.
    pub fn file_for(&self, location: &ModulePath) -> Option<PathBuf> {
        let (root, dir) = self
            .mounts
            .iter()
            .filter(|(root, _)| location.starts_with(root))
            .max_by_key(|(root, _)| root.segments().len())?;

        let rest = &location.segments()[root.segments().len()..];
        let file = match rest.split_last() {
            None => dir.join("mod.toml"),
            Some((last, parents)) => {
                let mut path = dir.clone();
                path.extend(parents);
                path.join(format!("{last}.toml"))
            }
        };
        Some(file)
    }
}

impl DeclarationSource for FsSource {
    fn contains(&self, location: &ModulePath) -> bool {
        self.file_for(location).is_some_and(|f| f.is_file())
    }

    fn load(&self, location: &ModulePath) -> Result<Vec<Declaration>, LoadError> {
        let file = self
            .file_for(location)
            .ok_or_else(|| LoadError::Invalid(format!("no mount covers {location}")))?;
        parse_declaration_file(&file)
    }
}

fn parse_declaration_file(file: &Path) -> Result<Vec<Declaration>, LoadError> {
    let text = std::fs::read_to_string(file)?;
    let parsed: DeclarationFile = toml::from_str(&text)?;

    let mut seen = std::collections::HashSet::new();
    parsed
        .artifacts
        .into_iter()
        .map(|entry| {
            if !seen.insert((entry.kind.clone(), entry.name.clone())) {
                return Err(LoadError::Invalid(format!(
                    "{}: '{}' declared twice",
                    file.display(),
                    entry.name
                )));
            }
            Ok(Declaration {
                kind: entry.kind,
                name: entry.name,
                identity: entry.identity,
                overrides: entry.overrides,
                generator: std::sync::Arc::new(entry.spec),
            })
        })
        .collect()
}

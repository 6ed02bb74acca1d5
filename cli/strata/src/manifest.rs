//! `strata.toml` manifest parsing and project configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use strata_graph::{PackageEntry, PackageIndex, PackageNode};
use strata_reconcile::EngineConfig;
use strata_registry::{ArtifactKind, FsSource, KindEntry, ModulePath};

pub const MANIFEST_FILE: &str = "strata.toml";

/// The top-level manifest structure for a Strata project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrataManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    /// Installed packages.
    #[serde(default, rename = "package")]
    pub packages: Vec<PackageConfig>,
    /// Artifact kinds this project reconciles.
    #[serde(default, rename = "kind")]
    pub kinds: Vec<KindEntry>,
    /// Engine defaults; command-line flags take precedence.
    #[serde(default)]
    pub engine: EngineSection,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Project name, passed to generators.
    pub name: String,
    /// Directory artifacts are written under, relative to the manifest.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Where package declaration directories live when a package does not
    /// name its own.
    #[serde(default = "default_packages_dir")]
    pub packages_dir: PathBuf,
    /// Standalone package index (`[[package]]` entries only), read before
    /// the manifest's own `[[package]]` entries.
    #[serde(default)]
    pub index: Option<PathBuf>,
}

fn default_packages_dir() -> PathBuf {
    PathBuf::from("packages")
}

/// One `[[package]]` entry: the package index entry plus where its
/// declaration files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    #[serde(flatten)]
    pub entry: PackageEntry,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Engine configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineSection {
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl StrataManifest {
    /// Search upward from `start_dir` for a `strata.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest = Self::parse(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Like [`find_and_load`](Self::find_and_load), but a missing manifest
    /// is an error.
    pub fn load_required(start_dir: &Path) -> Result<(Self, PathBuf)> {
        match Self::find_and_load(start_dir)? {
            Some(found) => Ok(found),
            None => bail!(
                "no {MANIFEST_FILE} found in {} or any parent directory",
                start_dir.display()
            ),
        }
    }

    /// Parse a manifest from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        let manifest: StrataManifest = toml::from_str(s)?;
        if manifest.project.name.trim().is_empty() {
            bail!("[project] name must not be empty");
        }
        Ok(manifest)
    }

    /// Absolute directory artifacts are written under.
    pub fn project_root(&self, manifest_dir: &Path) -> PathBuf {
        match &self.project.root {
            Some(root) => manifest_dir.join(root),
            None => manifest_dir.to_path_buf(),
        }
    }

    /// Every package entry: the standalone index first, then the
    /// manifest's own `[[package]]` entries.
    pub fn package_configs(&self, manifest_dir: &Path) -> Result<Vec<PackageConfig>> {
        let mut configs = Vec::new();
        if let Some(index) = &self.project.index {
            let path = manifest_dir.join(index);
            let index = PackageIndex::load(&path)
                .with_context(|| format!("loading package index {}", path.display()))?;
            configs.extend(
                index
                    .packages
                    .into_iter()
                    .map(|entry| PackageConfig { entry, dir: None }),
            );
        }
        configs.extend(self.packages.iter().cloned());
        Ok(configs)
    }

    /// Validated package nodes.
    pub fn package_nodes(&self, manifest_dir: &Path) -> Result<Vec<PackageNode>> {
        nodes_of(&self.package_configs(manifest_dir)?)
    }

    /// A declaration source with every package mounted on its directory.
    pub fn declaration_source(&self, manifest_dir: &Path) -> Result<FsSource> {
        let configs = self.package_configs(manifest_dir)?;
        let mut source = FsSource::new();
        for (config, node) in configs.iter().zip(nodes_of(&configs)?) {
            let Some(root) = ModulePath::from_root(node.root()) else {
                continue;
            };
            let dir = match &config.dir {
                Some(dir) => manifest_dir.join(dir),
                None => manifest_dir
                    .join(&self.project.packages_dir)
                    .join(node.name()),
            };
            source.mount(root, dir);
        }
        Ok(source)
    }

    /// Every declared kind.
    pub fn artifact_kinds(&self) -> Result<Vec<ArtifactKind>> {
        self.kinds
            .iter()
            .map(|k| {
                k.to_kind()
                    .with_context(|| format!("invalid [[kind]] '{}'", k.name))
            })
            .collect()
    }

    /// The kind named `name`.
    pub fn artifact_kind(&self, name: &str) -> Result<ArtifactKind> {
        match self.kinds.iter().find(|k| k.name == name) {
            Some(entry) => Ok(entry.to_kind()?),
            None => bail!(
                "unknown artifact kind '{name}' (declared: {})",
                self.kinds
                    .iter()
                    .map(|k| k.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Engine settings: flag > manifest > built-in default.
    pub fn engine_config(
        &self,
        jobs: Option<usize>,
        timeout_secs: Option<u64>,
        dry_run: bool,
    ) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            workers: jobs.or(self.engine.workers).unwrap_or(defaults.workers).max(1),
            timeout: timeout_secs
                .or(self.engine.timeout_secs)
                .map(Duration::from_secs),
            dry_run,
        }
    }
}

fn nodes_of(configs: &[PackageConfig]) -> Result<Vec<PackageNode>> {
    configs
        .iter()
        .map(|p| {
            p.entry
                .to_node()
                .with_context(|| format!("invalid [[package]] '{}'", p.entry.name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[project]
name = "demo"

[[package]]
name = "lint-base"
version = "1.0.0"

[[package]]
name = "acme-lint"
version = "0.3.1"
dependencies = ["lint-base"]
root = "acme::lint"
dir = "vendor/acme"

[[kind]]
name = "config"
owner = "lint-base"
anchor = "lint_base::artifacts"

[engine]
workers = 2
timeout-secs = 30
"#;

    #[test]
    fn parse_full_manifest() {
        let manifest = StrataManifest::parse(SAMPLE).unwrap();
        assert_eq!(manifest.project.name, "demo");
        assert_eq!(manifest.packages.len(), 2);
        assert_eq!(manifest.packages[1].dir, Some(PathBuf::from("vendor/acme")));
        assert_eq!(manifest.packages[1].entry.dependencies, vec!["lint-base"]);

        let nodes = manifest.package_nodes(Path::new("/proj")).unwrap();
        assert_eq!(nodes[0].root(), "lint_base");
        assert_eq!(nodes[1].root(), "acme::lint");

        let kind = manifest.artifact_kind("config").unwrap();
        assert_eq!(kind.owner, "lint-base");
        assert!(manifest.artifact_kind("missing").is_err());
    }

    #[test]
    fn engine_flags_override_manifest() {
        let manifest = StrataManifest::parse(SAMPLE).unwrap();
        let config = manifest.engine_config(None, None, false);
        assert_eq!(config.workers, 2);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));

        let config = manifest.engine_config(Some(8), Some(1), true);
        assert_eq!(config.workers, 8);
        assert_eq!(config.timeout, Some(Duration::from_secs(1)));
        assert!(config.dry_run);
    }

    #[test]
    fn declaration_dirs() {
        let manifest = StrataManifest::parse(SAMPLE).unwrap();
        let source = manifest.declaration_source(Path::new("/proj")).unwrap();
        assert_eq!(
            source.file_for(&ModulePath::parse("lint_base::artifacts").unwrap()),
            Some(PathBuf::from("/proj/packages/lint-base/artifacts.toml"))
        );
        assert_eq!(
            source.file_for(&ModulePath::parse("acme::lint::artifacts").unwrap()),
            Some(PathBuf::from("/proj/vendor/acme/artifacts.toml"))
        );
    }

    #[test]
    fn invalid_version_is_reported() {
        let manifest = StrataManifest::parse(
            "[project]\nname = \"x\"\n\n[[package]]\nname = \"p\"\nversion = \"one\"\n",
        )
        .unwrap();
        let err = manifest.package_nodes(Path::new("/proj")).unwrap_err();
        assert!(format!("{err:#}").contains("'p'"));
    }

    #[test]
    fn find_searches_upward() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), SAMPLE).unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, found) = StrataManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(manifest.project.name, "demo");
        assert_eq!(found, dir.path());
        assert_eq!(manifest.project_root(&found), dir.path());
    }

    #[test]
    fn missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StrataManifest::find_and_load(dir.path()).unwrap().is_none());
        assert!(StrataManifest::load_required(dir.path()).is_err());
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(StrataManifest::parse("[project]\nname = \" \"\n").is_err());
    }

    #[test]
    fn standalone_index_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("packages.toml"),
            "[[package]]\nname = \"lint-base\"\nversion = \"1.0.0\"\n",
        )
        .unwrap();
        let manifest = StrataManifest::parse(
            r#"
[project]
name = "demo"
index = "packages.toml"

[[package]]
name = "acme-lint"
version = "0.3.1"
dependencies = ["lint-base"]
dir = "vendor/acme"
"#,
        )
        .unwrap();

        let nodes = manifest.package_nodes(dir.path()).unwrap();
        let names: Vec<&str> = nodes.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["lint-base", "acme-lint"]);

        let source = manifest.declaration_source(dir.path()).unwrap();
        assert_eq!(
            source.file_for(&ModulePath::parse("lint_base::artifacts").unwrap()),
            Some(dir.path().join("packages/lint-base/artifacts.toml"))
        );
        assert_eq!(
            source.file_for(&ModulePath::parse("acme_lint::artifacts").unwrap()),
            Some(dir.path().join("vendor/acme/artifacts.toml"))
        );
    }

    #[test]
    fn missing_index_is_reported() {
        let manifest =
            StrataManifest::parse("[project]\nname = \"x\"\nindex = \"nope.toml\"\n").unwrap();
        let err = manifest.package_nodes(Path::new("/nonexistent")).unwrap_err();
        assert!(format!("{err:#}").contains("nope.toml"));
    }
}

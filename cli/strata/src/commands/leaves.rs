//! `strata leaves`: the winning implementation per identity for a kind.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::commands::{OutputFormat, Project};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafEntry {
    pub identity: String,
    pub implementation: String,
    pub package: String,
    pub depth: usize,
    /// Override chain, root first.
    pub chain: Vec<String>,
}

pub fn collect(project: &mut Project, kind: &str) -> Result<Vec<LeafEntry>> {
    let kind = project.manifest.artifact_kind(kind)?;
    let leaves = project.session.leaves(&kind)?;
    Ok(leaves
        .iter()
        .map(|leaf| LeafEntry {
            identity: leaf.identity.clone(),
            implementation: leaf.implementation.clone(),
            package: leaf.package.clone(),
            depth: leaf.depth,
            chain: leaf
                .chain()
                .iter()
                .map(|link| link.implementation.clone())
                .collect(),
        })
        .collect())
}

pub fn run(cwd: &Path, kind: &str, format: OutputFormat) -> Result<()> {
    let mut project = Project::load(cwd)?;
    let leaves = collect(&mut project, kind)?;
    match format {
        OutputFormat::Human => {
            for leaf in &leaves {
                println!("{}", leaf.identity);
                println!("  leaf:  {} ({})", leaf.implementation, leaf.package);
                if leaf.depth > 0 {
                    println!("  chain: {}", leaf.chain.join(" -> "));
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&leaves)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture;

    #[test]
    fn plugin_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        fixture::write(dir.path());
        let mut project = Project::load(dir.path()).unwrap();

        let leaves = collect(&mut project, "config").unwrap();
        assert_eq!(leaves.len(), 2);

        let lint = leaves
            .iter()
            .find(|l| l.identity == "base::artifacts::lint")
            .unwrap();
        assert_eq!(lint.implementation, "plugin::artifacts::lint");
        assert_eq!(lint.depth, 1);
        assert_eq!(
            lint.chain,
            vec!["base::artifacts::lint", "plugin::artifacts::lint"]
        );
    }
}

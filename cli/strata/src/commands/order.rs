//! `strata order`: packages that build on one package, in processing order.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::commands::{OutputFormat, Project};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderEntry {
    pub name: String,
    pub version: String,
    pub root: String,
}

pub fn collect(project: &mut Project, package: &str) -> Result<Vec<OrderEntry>> {
    let graph = project.session.graph()?;
    let order = graph
        .all_depending_on(package, true)?
        .into_iter()
        .map(|node| OrderEntry {
            name: node.name().to_string(),
            version: node.version().to_string(),
            root: node.root().to_string(),
        })
        .collect();
    Ok(order)
}

pub fn run(cwd: &Path, package: &str, format: OutputFormat) -> Result<()> {
    let mut project = Project::load(cwd)?;
    let order = collect(&mut project, package)?;
    match format {
        OutputFormat::Human => {
            for (i, entry) in order.iter().enumerate() {
                println!("{:>3}. {} {} ({})", i + 1, entry.name, entry.version, entry.root);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&order)?),
    }
    Ok(())
}

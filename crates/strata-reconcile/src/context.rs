//! Per-invocation session state.

use std::collections::HashMap;
use std::sync::Arc;

use strata_graph::{DependencyGraph, PackageNode};
use strata_registry::{ArtifactKind, ArtifactRegistry, DeclarationSource, LeafSet};
use tracing::debug;

use crate::error::Result;

/// Holds the dependency graph and resolved leaf sets for one invocation.
///
/// Both are computed on first use and kept until [`Session::invalidate`].
pub struct Session {
    packages: Vec<PackageNode>,
    source: Arc<dyn DeclarationSource>,
    graph: Option<Arc<DependencyGraph>>,
    leaves: HashMap<ArtifactKind, Arc<LeafSet>>,
}

impl Session {
    pub fn new(packages: Vec<PackageNode>, source: Arc<dyn DeclarationSource>) -> Self {
        Session {
            packages,
            source,
            graph: None,
            leaves: HashMap::new(),
        }
    }

    pub fn packages(&self) -> &[PackageNode] {
        &self.packages
    }

    pub fn source(&self) -> &dyn DeclarationSource {
        self.source.as_ref()
    }

    /// The dependency graph, built on first call.
    pub fn graph(&mut self) -> Result<Arc<DependencyGraph>> {
        if let Some(graph) = &self.graph {
            return Ok(Arc::clone(graph));
        }
        let graph = Arc::new(DependencyGraph::build(self.packages.iter().cloned())?);
        debug!(packages = graph.len(), "built dependency graph");
        self.graph = Some(Arc::clone(&graph));
        Ok(graph)
    }

    /// Resolved leaves of `kind`, cached per kind.
    pub fn leaves(&mut self, kind: &ArtifactKind) -> Result<Arc<LeafSet>> {
        if let Some(leaves) = self.leaves.get(kind) {
            return Ok(Arc::clone(leaves));
        }
        let graph = self.graph()?;
        let registry = ArtifactRegistry::new(&graph, self.source.as_ref());
        let leaves = Arc::new(registry.collect(kind)?);
        self.leaves.insert(kind.clone(), Arc::clone(&leaves));
        Ok(leaves)
    }

    /// Drop the cached graph and leaf sets.
    pub fn invalidate(&mut self) {
        self.graph = None;
        self.leaves.clear();
    }

    /// Replace the package set and invalidate everything derived from it.
    pub fn set_packages(&mut self, packages: Vec<PackageNode>) {
        self.packages = packages;
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;
    use serde_json::json;
    use strata_core::ArtifactSpec;
    use strata_registry::{Declaration, FixedGenerator, ModulePath, StaticSource};

    fn session() -> Session {
        let mut source = StaticSource::new();
        let spec = ArtifactSpec::new("a.json", json!({})).unwrap();
        source.register(
            ModulePath::parse("base::artifacts").unwrap(),
            Declaration::new("config", "a", FixedGenerator(spec)),
        );
        Session::new(
            vec![PackageNode::new("base", Version::new(1, 0, 0))],
            Arc::new(source),
        )
    }

    fn kind() -> ArtifactKind {
        ArtifactKind::new(
            "config",
            "base",
            ModulePath::parse("base::artifacts").unwrap(),
        )
    }

    #[test]
    fn graph_and_leaves_are_cached() {
        let mut session = session();
        let g1 = session.graph().unwrap();
        let g2 = session.graph().unwrap();
        assert!(Arc::ptr_eq(&g1, &g2));

        let l1 = session.leaves(&kind()).unwrap();
        let l2 = session.leaves(&kind()).unwrap();
        assert!(Arc::ptr_eq(&l1, &l2));
        assert_eq!(l1.len(), 1);
    }

    #[test]
    fn invalidate_rebuilds() {
        let mut session = session();
        let g1 = session.graph().unwrap();
        let l1 = session.leaves(&kind()).unwrap();
        session.invalidate();
        assert!(!Arc::ptr_eq(&g1, &session.graph().unwrap()));
        assert!(!Arc::ptr_eq(&l1, &session.leaves(&kind()).unwrap()));
    }

    #[test]
    fn set_packages_surfaces_graph_errors() {
        let mut session = session();
        session.graph().unwrap();
        session.set_packages(vec![
            PackageNode::new("a", Version::new(1, 0, 0)).with_dependencies(["b"]),
            PackageNode::new("b", Version::new(1, 0, 0)).with_dependencies(["a"]),
        ]);
        assert!(session.graph().is_err());
    }
}

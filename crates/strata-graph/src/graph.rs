//! The package dependency graph.
//!
//! Edges point from a package to the packages it depends on. The graph is
//! validated and topologically ordered once, at construction; all queries
//! afterwards are read-only.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::{GraphError, Result};
use crate::package::PackageNode;

/// An acyclic dependency graph over installed packages.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<PackageNode>,
    index: HashMap<String, usize>,
    /// Per node: indices of the packages it depends on (within the graph).
    dependencies: Vec<Vec<usize>>,
    /// Per node: indices of the packages depending on it, sorted by name.
    dependents: Vec<Vec<usize>>,
    /// Dependencies-first order, ties broken by package name.
    order: Vec<usize>,
}

impl DependencyGraph {
    /// Build a graph from package metadata.
    ///
    /// Dependencies on packages outside the given set are treated as
    /// external and ignored. Fails on duplicate names, malformed entries,
    /// or a dependency cycle.
    pub fn build(packages: impl IntoIterator<Item = PackageNode>) -> Result<Self> {
        let nodes: Vec<PackageNode> = packages.into_iter().collect();

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            validate(node)?;
            if index.insert(node.name().to_string(), i).is_some() {
                return Err(GraphError::DuplicatePackage(node.name().to_string()));
            }
        }

        let mut dependencies = vec![Vec::new(); nodes.len()];
        let mut dependents = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            for dep in node.dependencies() {
                match index.get(dep.as_str()) {
                    Some(&d) if !dependencies[i].contains(&d) => {
                        dependencies[i].push(d);
                        dependents[d].push(i);
                    }
                    Some(_) => {}
                    None => {
                        tracing::debug!(
                            package = node.name(),
                            dependency = dep.as_str(),
                            "ignoring dependency outside the package set"
                        );
                    }
                }
            }
        }
        for list in &mut dependents {
            list.sort_by(|a, b| nodes[*a].name().cmp(nodes[*b].name()));
        }

        let mut graph = DependencyGraph {
            nodes,
            index,
            dependencies,
            dependents,
            order: Vec::new(),
        };
        graph.order = graph.topological_sort()?;

        tracing::debug!(packages = graph.nodes.len(), "dependency graph built");
        Ok(graph)
    }

    /// Kahn's algorithm; the ready set is keyed by name for determinism.
    fn topological_sort(&self) -> Result<Vec<usize>> {
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut ready: BTreeMap<&str, usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(i, _)| (self.nodes[i].name(), i))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some((_, i)) = ready.pop_first() {
            order.push(i);
            for &dependent in &self.dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(self.nodes[dependent].name(), dependent);
                }
            }
        }

        if order.len() < self.nodes.len() {
            return Err(GraphError::CycleDetected {
                cycle: self.find_cycle(&in_degree),
            });
        }
        Ok(order)
    }

    /// Trace one cycle through the nodes Kahn's algorithm could not place.
    ///
    /// Every such node still has an unplaced dependency, so following the
    /// alphabetically first one from any start must revisit a node.
    fn find_cycle(&self, in_degree: &[usize]) -> Vec<String> {
        let stuck = |i: usize| in_degree[i] > 0;
        let Some(start) = (0..self.nodes.len())
            .filter(|&i| stuck(i))
            .min_by(|a, b| self.nodes[*a].name().cmp(self.nodes[*b].name()))
        else {
            return Vec::new();
        };

        let mut path = vec![start];
        let mut current = start;
        loop {
            let Some(next) = self.dependencies[current]
                .iter()
                .copied()
                .filter(|&d| stuck(d))
                .min_by(|a, b| self.nodes[*a].name().cmp(self.nodes[*b].name()))
            else {
                break;
            };
            if let Some(pos) = path.iter().position(|&p| p == next) {
                let mut cycle: Vec<String> = path[pos..]
                    .iter()
                    .map(|&i| self.nodes[i].name().to_string())
                    .collect();
                cycle.push(self.nodes[next].name().to_string());
                return cycle;
            }
            path.push(next);
            current = next;
        }
        path.iter().map(|&i| self.nodes[i].name().to_string()).collect()
    }

    /// Packages that transitively depend on `root`, root first, in a
    /// deterministic topological order.
    ///
    /// Every package appears after all of its dependencies within the
    /// result, so more-derived packages are always visited later.
    pub fn all_depending_on(&self, root: &str, include_self: bool) -> Result<Vec<&PackageNode>> {
        let root_idx = self.require(root)?;

        let mut reachable = HashSet::new();
        let mut queue = VecDeque::from([root_idx]);
        while let Some(i) = queue.pop_front() {
            if reachable.insert(i) {
                queue.extend(self.dependents[i].iter().copied());
            }
        }
        if !include_self {
            reachable.remove(&root_idx);
        }

        Ok(self
            .order
            .iter()
            .filter(|i| reachable.contains(i))
            .map(|&i| &self.nodes[i])
            .collect())
    }

    /// All packages, dependencies first.
    pub fn topological_order(&self) -> impl Iterator<Item = &PackageNode> {
        self.order.iter().map(|&i| &self.nodes[i])
    }

    /// Look up a package by name.
    pub fn get(&self, name: &str) -> Option<&PackageNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Whether a package is part of the graph.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Direct in-graph dependencies of a package.
    pub fn dependencies_of(&self, name: &str) -> Result<Vec<&PackageNode>> {
        let i = self.require(name)?;
        Ok(self.dependencies[i].iter().map(|&d| &self.nodes[d]).collect())
    }

    /// Direct dependents of a package, sorted by name.
    pub fn dependents_of(&self, name: &str) -> Result<Vec<&PackageNode>> {
        let i = self.require(name)?;
        Ok(self.dependents[i].iter().map(|&d| &self.nodes[d]).collect())
    }

    /// Number of packages.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownPackage(name.to_string()))
    }
}

fn validate(node: &PackageNode) -> Result<()> {
    if node.name().trim().is_empty() {
        return Err(GraphError::InvalidPackage {
            name: node.name().to_string(),
            detail: "name must not be empty".to_string(),
        });
    }
    if node.root().trim().is_empty() {
        return Err(GraphError::InvalidPackage {
            name: node.name().to_string(),
            detail: "root namespace must not be empty".to_string(),
        });
    }
    if node.dependencies().iter().any(|d| d == node.name()) {
        return Err(GraphError::InvalidPackage {
            name: node.name().to_string(),
            detail: "package depends on itself".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str, deps: &[&str]) -> PackageNode {
        PackageNode::new(name, semver::Version::new(1, 0, 0)).with_dependencies(deps.iter().copied())
    }

    fn names(nodes: &[&PackageNode]) -> Vec<String> {
        nodes.iter().map(|n| n.name().to_string()).collect()
    }

    #[test]
    fn linear_chain_root_first() {
        let graph = DependencyGraph::build(vec![
            pkg("c", &["b"]),
            pkg("a", &[]),
            pkg("b", &["a"]),
        ])
        .unwrap();

        let order = graph.all_depending_on("a", true).unwrap();
        assert_eq!(names(&order), vec!["a", "b", "c"]);

        let order = graph.all_depending_on("a", false).unwrap();
        assert_eq!(names(&order), vec!["b", "c"]);
    }

    #[test]
    fn restricted_to_dependents_of_root() {
        let graph = DependencyGraph::build(vec![
            pkg("base", &[]),
            pkg("unrelated", &[]),
            pkg("plugin", &["base"]),
            pkg("other", &["unrelated"]),
        ])
        .unwrap();

        let order = graph.all_depending_on("base", true).unwrap();
        assert_eq!(names(&order), vec!["base", "plugin"]);
    }

    #[test]
    fn ties_broken_by_name() {
        // Declaration order must not influence the result.
        let first = DependencyGraph::build(vec![
            pkg("base", &[]),
            pkg("zeta", &["base"]),
            pkg("alpha", &["base"]),
            pkg("mid", &["base"]),
        ])
        .unwrap();
        let second = DependencyGraph::build(vec![
            pkg("mid", &["base"]),
            pkg("alpha", &["base"]),
            pkg("zeta", &["base"]),
            pkg("base", &[]),
        ])
        .unwrap();

        let a = names(&first.all_depending_on("base", true).unwrap());
        let b = names(&second.all_depending_on("base", true).unwrap());
        assert_eq!(a, vec!["base", "alpha", "mid", "zeta"]);
        assert_eq!(a, b);
    }

    #[test]
    fn diamond_orders_join_last() {
        let graph = DependencyGraph::build(vec![
            pkg("base", &[]),
            pkg("left", &["base"]),
            pkg("right", &["base"]),
            pkg("app", &["left", "right"]),
        ])
        .unwrap();

        let order = names(&graph.all_depending_on("base", true).unwrap());
        assert_eq!(order, vec!["base", "left", "right", "app"]);

        let from_left = names(&graph.all_depending_on("left", true).unwrap());
        assert_eq!(from_left, vec!["left", "app"]);
    }

    #[test]
    fn dependency_order_beats_name_order() {
        // "aaa" sorts first but depends on "zzz".
        let graph =
            DependencyGraph::build(vec![pkg("root", &[]), pkg("zzz", &["root"]), pkg("aaa", &["zzz"])])
                .unwrap();
        let order = names(&graph.all_depending_on("root", true).unwrap());
        assert_eq!(order, vec!["root", "zzz", "aaa"]);
    }

    #[test]
    fn cycle_is_fatal() {
        let err = DependencyGraph::build(vec![
            pkg("a", &["c"]),
            pkg("b", &["a"]),
            pkg("c", &["b"]),
            pkg("free", &[]),
        ])
        .unwrap_err();
        match err {
            GraphError::CycleDetected { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 4);
                assert!(!cycle.contains(&"free".to_string()));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn two_node_cycle() {
        let err = DependencyGraph::build(vec![pkg("x", &["y"]), pkg("y", &["x"])]).unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected { .. }));
    }

    #[test]
    fn duplicate_package_rejected() {
        let err = DependencyGraph::build(vec![pkg("a", &[]), pkg("a", &[])]).unwrap_err();
        assert!(matches!(err, GraphError::DuplicatePackage(name) if name == "a"));
    }

    #[test]
    fn self_dependency_rejected() {
        let err = DependencyGraph::build(vec![pkg("a", &["a"])]).unwrap_err();
        assert!(matches!(err, GraphError::InvalidPackage { .. }));
    }

    #[test]
    fn empty_name_rejected() {
        let err = DependencyGraph::build(vec![pkg("", &[])]).unwrap_err();
        assert!(matches!(err, GraphError::InvalidPackage { .. }));
    }

    #[test]
    fn external_dependencies_ignored() {
        let graph = DependencyGraph::build(vec![pkg("a", &["serde", "toml"])]).unwrap();
        assert!(graph.dependencies_of("a").unwrap().is_empty());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn duplicate_dependency_declarations_collapse() {
        let graph = DependencyGraph::build(vec![pkg("a", &[]), pkg("b", &["a", "a"])]).unwrap();
        assert_eq!(graph.dependencies_of("b").unwrap().len(), 1);
        assert_eq!(graph.dependents_of("a").unwrap().len(), 1);
    }

    #[test]
    fn unknown_root_is_error() {
        let graph = DependencyGraph::build(vec![pkg("a", &[])]).unwrap();
        assert!(matches!(
            graph.all_depending_on("ghost", true),
            Err(GraphError::UnknownPackage(_))
        ));
    }

    #[test]
    fn topological_order_covers_everything() {
        let graph = DependencyGraph::build(vec![pkg("b", &["a"]), pkg("a", &[]), pkg("c", &[])])
            .unwrap();
        let all: Vec<_> = graph.topological_order().map(|n| n.name()).collect();
        assert_eq!(all, vec!["a", "b", "c"]);
        assert!(graph.contains("c"));
        assert!(graph.get("missing").is_none());
        assert!(!graph.is_empty());
    }
}

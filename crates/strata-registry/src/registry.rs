//! Candidate discovery and leaf resolution.
//!
//! Discovery walks every package that builds on a kind's owner, in
//! dependency order, and loads the declarations found at each package's
//! equivalent location. Candidates live in an arena; override edges are
//! arena indices. Resolution groups candidates by identity and keeps, per
//! group, the deepest candidate nobody overrides.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use strata_core::ArtifactSpec;
use strata_graph::DependencyGraph;
use tracing::{debug, info};

use crate::declaration::{ArtifactGenerator, Declaration, GenerateContext, GenerateError};
use crate::error::{RegistryError, Result};
use crate::kind::ArtifactKind;
use crate::locator::ModuleLocator;
use crate::source::DeclarationSource;

/// Where a candidate sits in its override hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Root of a hierarchy.
    Base,
    /// Overrides the candidate at this arena index.
    Override(usize),
}

/// One discovered implementation of a kind.
#[derive(Debug, Clone)]
pub struct ArtifactCandidate {
    /// Full implementation id: `location::name`.
    pub implementation: String,
    /// Owning package.
    pub package: String,
    /// Identity this candidate competes under.
    pub identity: String,
    /// Distance from the hierarchy root (root = 0).
    pub depth: usize,
    pub origin: Origin,
    generator: Arc<dyn ArtifactGenerator>,
}

/// All candidates of one kind, in discovery order.
#[derive(Debug, Clone)]
pub struct CandidateArena {
    candidates: Vec<ArtifactCandidate>,
}

impl CandidateArena {
    pub fn candidates(&self) -> &[ArtifactCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Indices from the hierarchy root down to `index`.
    fn chain(&self, index: usize) -> Vec<usize> {
        let mut chain = vec![index];
        let mut current = index;
        while let Origin::Override(parent) = self.candidates[current].origin {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Reduce to one leaf per identity.
    pub fn resolve(&self, kind: &str) -> Result<LeafSet> {
        let overridden: BTreeSet<usize> = self
            .candidates
            .iter()
            .filter_map(|c| match c.origin {
                Origin::Override(parent) => Some(parent),
                Origin::Base => None,
            })
            .collect();

        // Identities in first-seen order, each with its un-overridden members.
        let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
        let mut group_of: HashMap<&str, usize> = HashMap::new();
        for (idx, candidate) in self.candidates.iter().enumerate() {
            let slot = *group_of
                .entry(candidate.identity.as_str())
                .or_insert_with(|| {
                    groups.push((candidate.identity.as_str(), Vec::new()));
                    groups.len() - 1
                });
            if !overridden.contains(&idx) {
                groups[slot].1.push(idx);
            }
        }

        let mut winners = Vec::with_capacity(groups.len());
        for (identity, members) in groups {
            let Some(deepest) = members.iter().map(|&i| self.candidates[i].depth).max() else {
                // Every hierarchy needs an un-overridden member; cycles were
                // rejected during discovery.
                continue;
            };
            let top: Vec<usize> = members
                .into_iter()
                .filter(|&i| self.candidates[i].depth == deepest)
                .collect();
            if let [winner] = top.as_slice() {
                winners.push(*winner);
            } else {
                let mut candidates: Vec<String> = top
                    .iter()
                    .map(|&i| self.candidates[i].implementation.clone())
                    .collect();
                candidates.sort();
                return Err(RegistryError::AmbiguousLeaf {
                    identity: identity.to_string(),
                    candidates,
                    depth: deepest,
                });
            }
        }
        winners.sort_unstable();

        let leaves = winners
            .into_iter()
            .map(|idx| {
                let candidate = &self.candidates[idx];
                let chain = self
                    .chain(idx)
                    .into_iter()
                    .map(|i| ChainLink {
                        implementation: self.candidates[i].implementation.clone(),
                        generator: Arc::clone(&self.candidates[i].generator),
                    })
                    .collect();
                Leaf {
                    identity: candidate.identity.clone(),
                    implementation: candidate.implementation.clone(),
                    package: candidate.package.clone(),
                    depth: candidate.depth,
                    chain,
                }
            })
            .collect();

        Ok(LeafSet {
            kind: kind.to_string(),
            leaves,
        })
    }
}

/// One implementation along a leaf's override chain.
#[derive(Debug, Clone)]
pub struct ChainLink {
    pub implementation: String,
    generator: Arc<dyn ArtifactGenerator>,
}

/// The winning implementation for one identity.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub identity: String,
    pub implementation: String,
    pub package: String,
    pub depth: usize,
    chain: Vec<ChainLink>,
}

impl Leaf {
    /// Override chain, root first, ending with this leaf.
    pub fn chain(&self) -> &[ChainLink] {
        &self.chain
    }

    /// Produce the artifact spec by running every generator from the root
    /// down, each refining its parent's output.
    pub fn generate(
        &self,
        ctx: &GenerateContext,
    ) -> std::result::Result<ArtifactSpec, GenerateError> {
        let mut spec: Option<ArtifactSpec> = None;
        for link in &self.chain {
            spec = Some(link.generator.generate(ctx, spec.as_ref())?);
        }
        spec.ok_or_else(|| {
            GenerateError::Failed(format!("{} has no generators", self.implementation))
        })
    }
}

/// One leaf per identity for a kind, in discovery order.
#[derive(Debug, Clone)]
pub struct LeafSet {
    pub kind: String,
    pub leaves: Vec<Leaf>,
}

impl LeafSet {
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Leaf> {
        self.leaves.iter()
    }
}

impl<'a> IntoIterator for &'a LeafSet {
    type Item = &'a Leaf;
    type IntoIter = std::slice::Iter<'a, Leaf>;

    fn into_iter(self) -> Self::IntoIter {
        self.leaves.iter()
    }
}

/// Discovers implementations of artifact kinds across a dependency graph.
pub struct ArtifactRegistry<'a> {
    graph: &'a DependencyGraph,
    source: &'a dyn DeclarationSource,
}

impl<'a> ArtifactRegistry<'a> {
    pub fn new(graph: &'a DependencyGraph, source: &'a dyn DeclarationSource) -> Self {
        ArtifactRegistry { graph, source }
    }

    /// Discover and resolve the leaves of `kind`.
    pub fn collect(&self, kind: &ArtifactKind) -> Result<LeafSet> {
        let arena = self.discover(kind)?;
        let leaves = arena.resolve(&kind.name)?;
        info!(
            kind = %kind.name,
            candidates = arena.len(),
            leaves = leaves.len(),
            "resolved leaves"
        );
        Ok(leaves)
    }

    /// Load every candidate of `kind` and link override edges.
    pub fn discover(&self, kind: &ArtifactKind) -> Result<CandidateArena> {
        let locator = ModuleLocator::new(self.source);
        let packages = self.graph.all_depending_on(&kind.owner, true)?;

        let mut loaded: Vec<(String, String, Declaration)> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();

        for package in packages {
            let Some(location) = locator.equivalent(&kind.anchor, package) else {
                continue;
            };
            let declarations =
                self.source
                    .load(&location)
                    .map_err(|source| RegistryError::LoadFailed {
                        package: package.name().to_string(),
                        location: location.to_string(),
                        source,
                    })?;

            for declaration in declarations.into_iter().filter(|d| d.kind == kind.name) {
                let id = format!("{location}::{}", declaration.name);
                if by_id.insert(id.clone(), loaded.len()).is_some() {
                    return Err(RegistryError::DuplicateImplementation(id));
                }
                debug!(implementation = %id, package = package.name(), "candidate");
                loaded.push((id, package.name().to_string(), declaration));
            }
        }

        let mut origins = Vec::with_capacity(loaded.len());
        for (id, _, declaration) in &loaded {
            let origin = match &declaration.overrides {
                None => Origin::Base,
                Some(target) => {
                    let parent = *by_id.get(target).ok_or_else(|| {
                        RegistryError::UnknownOverride {
                            implementation: id.clone(),
                            target: target.clone(),
                        }
                    })?;
                    Origin::Override(parent)
                }
            };
            origins.push(origin);
        }

        let mut candidates = Vec::with_capacity(loaded.len());
        for (idx, (implementation, package, declaration)) in loaded.iter().enumerate() {
            let (depth, identity) = lineage(idx, &loaded, &origins)?;
            candidates.push(ArtifactCandidate {
                implementation: implementation.clone(),
                package: package.clone(),
                identity,
                depth,
                origin: origins[idx],
                generator: Arc::clone(&declaration.generator),
            });
        }

        Ok(CandidateArena { candidates })
    }
}

/// Walk from `idx` to its hierarchy root, returning the depth and the
/// identity the candidate competes under.
///
/// The nearest explicit identity on the way up wins; without one the root
/// implementation id is used. An override may repeat its ancestor's
/// identity but not change it.
fn lineage(
    idx: usize,
    loaded: &[(String, String, Declaration)],
    origins: &[Origin],
) -> Result<(usize, String)> {
    let invalid = |detail: String| RegistryError::InvalidDeclaration {
        implementation: loaded[idx].0.clone(),
        detail,
    };

    let mut depth = 0;
    let mut current = idx;
    let mut identity: Option<&str> = None;
    loop {
        if let Some(declared) = loaded[current].2.identity.as_deref() {
            match identity {
                None => identity = Some(declared),
                Some(found) if found != declared => {
                    return Err(invalid(format!(
                        "identity '{found}' conflicts with '{declared}' declared by {}",
                        loaded[current].0
                    )));
                }
                Some(_) => {}
            }
        }
        match origins[current] {
            Origin::Base => break,
            Origin::Override(parent) => {
                depth += 1;
                if depth > origins.len() {
                    return Err(invalid("override chain forms a cycle".to_string()));
                }
                current = parent;
            }
        }
    }

    let identity = identity.unwrap_or(&loaded[current].0).to_string();
    Ok((depth, identity))
}

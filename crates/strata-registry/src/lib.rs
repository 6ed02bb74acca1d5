//! Artifact discovery for Strata.
//!
//! Packages declare implementations of abstract artifact kinds at
//! structurally equivalent locations in their own namespace. This crate
//! finds those declarations across a [`DependencyGraph`](strata_graph::DependencyGraph),
//! links override edges, and reduces the candidates to one winning leaf
//! per identity.
//!
//! # Usage
//!
//! ```ignore
//! let registry = ArtifactRegistry::new(&graph, &source);
//! let leaves = registry.collect(&kind)?;
//! for leaf in &leaves {
//!     let spec = leaf.generate(&ctx)?;
//! }
//! ```

pub mod declaration;
pub mod error;
pub mod kind;
pub mod locator;
pub mod path;
pub mod registry;
pub mod source;

pub use declaration::{
    ArtifactGenerator, Declaration, FixedGenerator, FnGenerator, GenerateContext, GenerateError,
    PartialSpec,
};
pub use error::{LoadError, RegistryError, Result};
pub use kind::{ArtifactKind, KindEntry};
pub use locator::ModuleLocator;
pub use path::ModulePath;
pub use registry::{
    ArtifactCandidate, ArtifactRegistry, CandidateArena, ChainLink, Leaf, LeafSet, Origin,
};
pub use source::{DeclarationSource, FsSource, StaticSource};

//! Package dependency graph for Strata.
//!
//! Builds an acyclic graph over installed packages and answers the one
//! query every discovery step depends on: "which packages build on this
//! one, in an order where every package comes after its dependencies?"
//! Orderings are deterministic across runs regardless of input order.

pub mod error;
pub mod graph;
pub mod package;

pub use error::{GraphError, Result};
pub use graph::DependencyGraph;
pub use package::{default_root, PackageEntry, PackageIndex, PackageNode};

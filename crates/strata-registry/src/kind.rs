//! Abstract artifact kinds.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::path::ModulePath;

/// An abstract artifact kind declared by one package.
///
/// `anchor` is the location inside `owner` where base implementations live;
/// dependent packages declare overrides at the structurally equivalent
/// location in their own namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKind {
    pub name: String,
    pub owner: String,
    pub anchor: ModulePath,
}

impl ArtifactKind {
    pub fn new(name: impl Into<String>, owner: impl Into<String>, anchor: ModulePath) -> Self {
        ArtifactKind {
            name: name.into(),
            owner: owner.into(),
            anchor,
        }
    }
}

/// `[[kind]]` entry of a project manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindEntry {
    pub name: String,
    pub owner: String,
    pub anchor: String,
}

impl KindEntry {
    /// Validate the anchor path and build the kind.
    pub fn to_kind(&self) -> Result<ArtifactKind> {
        Ok(ArtifactKind::new(
            &self.name,
            &self.owner,
            ModulePath::parse(&self.anchor)?,
        ))
    }
}

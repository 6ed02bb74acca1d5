//! Structural path equivalence between packages.

use strata_graph::PackageNode;

use crate::path::ModulePath;
use crate::source::DeclarationSource;

/// Maps an anchor location in one package to the matching location in
/// another.
#[derive(Clone, Copy)]
pub struct ModuleLocator<'a> {
    source: &'a dyn DeclarationSource,
}

impl<'a> ModuleLocator<'a> {
    pub fn new(source: &'a dyn DeclarationSource) -> Self {
        ModuleLocator { source }
    }

    /// The path `anchor` would have inside `target`, if `target` declares
    /// anything there.
    ///
    /// The leading segment of `anchor` is replaced by the target's root
    /// namespace, which may span several segments. A package with an
    /// empty root namespace has no equivalent location.
    pub fn equivalent(&self, anchor: &ModulePath, target: &PackageNode) -> Option<ModulePath> {
        let root = ModulePath::from_root(target.root())?;
        let candidate = anchor.rebase(&root);
        self.source.contains(&candidate).then_some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{Declaration, FixedGenerator};
    use crate::source::StaticSource;
    use semver::Version;
    use serde_json::json;
    use strata_core::ArtifactSpec;

    fn decl() -> Declaration {
        let spec = ArtifactSpec::new("a.json", json!({})).unwrap();
        Declaration::new("config", "a", FixedGenerator(spec))
    }

    #[test]
    fn finds_location_in_dependent_package() {
        let mut source = StaticSource::new();
        source.register(ModulePath::parse("plugin::artifacts::config").unwrap(), decl());
        let locator = ModuleLocator::new(&source);

        let anchor = ModulePath::parse("base::artifacts::config").unwrap();
        let plugin = PackageNode::new("plugin", Version::new(1, 0, 0));
        assert_eq!(
            locator.equivalent(&anchor, &plugin).map(|p| p.to_string()),
            Some("plugin::artifacts::config".to_string())
        );
    }

    #[test]
    fn multi_segment_root() {
        let mut source = StaticSource::new();
        source.register(ModulePath::parse("acme::tools::artifacts").unwrap(), decl());
        let locator = ModuleLocator::new(&source);

        let anchor = ModulePath::parse("base::artifacts").unwrap();
        let pkg = PackageNode::new("acme-tools", Version::new(0, 1, 0)).with_root("acme::tools");
        assert!(locator.equivalent(&anchor, &pkg).is_some());
    }

    #[test]
    fn absent_location_is_none() {
        let source = StaticSource::new();
        let locator = ModuleLocator::new(&source);
        let anchor = ModulePath::parse("base::artifacts").unwrap();
        let pkg = PackageNode::new("plugin", Version::new(1, 0, 0));
        assert!(locator.equivalent(&anchor, &pkg).is_none());

        let rootless = PackageNode::new("odd", Version::new(1, 0, 0)).with_root("");
        assert!(locator.equivalent(&anchor, &rootless).is_none());
    }
}

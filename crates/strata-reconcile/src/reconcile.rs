//! Per-artifact reconciliation.
//!
//! ```text
//! absent                        -> write full content     -> Created
//! present, opt-out marker       -> untouched              -> Skipped
//! present, subset contained     -> untouched              -> Unchanged
//! present, entries missing      -> merge missing entries  -> Updated
//! present, unparsable/mismatch  -> untouched              -> Failed
//! ```

use std::path::Path;

use strata_core::{merge_missing, ArtifactSpec, ContentHash, Divergence, TreeChange};

use crate::error::ArtifactError;
use crate::report::ArtifactState;
use crate::storage::ProjectStore;

/// What happened to one artifact's file.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub state: ArtifactState,
    pub added: Vec<TreeChange>,
    pub divergences: Vec<Divergence>,
    pub digest: ContentHash,
}

/// Bring the file at `path` into conformance with `spec`.
///
/// `path` must already be normalized. With `dry_run` the outcome is
/// computed but nothing is written.
pub fn reconcile_artifact(
    store: &ProjectStore,
    path: &Path,
    spec: &ArtifactSpec,
    dry_run: bool,
) -> Result<Reconciled, ArtifactError> {
    let Some(existing) = store.read(path)? else {
        let text = spec.render()?;
        if !dry_run {
            store.write(path, &text)?;
        }
        return Ok(Reconciled {
            state: ArtifactState::Created,
            added: Vec::new(),
            divergences: Vec::new(),
            digest: ContentHash::compute(text.as_bytes()),
        });
    };

    if spec.is_opted_out(&existing) {
        return Ok(Reconciled {
            state: ArtifactState::Skipped,
            added: Vec::new(),
            divergences: Vec::new(),
            digest: ContentHash::compute(existing.as_bytes()),
        });
    }

    let tree = spec.format.parse(&existing)?;
    let outcome = merge_missing(&tree, &spec.content, spec.sequences)?;

    if outcome.is_unchanged() {
        return Ok(Reconciled {
            state: ArtifactState::Unchanged,
            added: Vec::new(),
            divergences: outcome.divergences,
            digest: ContentHash::compute(existing.as_bytes()),
        });
    }

    let text = spec.format.render(&outcome.merged)?;
    if !dry_run {
        store.write(path, &text)?;
    }
    Ok(Reconciled {
        state: ArtifactState::Updated,
        added: outcome.added,
        divergences: outcome.divergences,
        digest: ContentHash::compute(text.as_bytes()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::SequencePolicy;

    fn setup() -> (tempfile::TempDir, ProjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());
        (dir, store)
    }

    fn read_json(store: &ProjectStore, path: &str) -> serde_json::Value {
        let text = store.read(Path::new(path)).unwrap().unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn absent_file_is_created() {
        let (_dir, store) = setup();
        let spec = ArtifactSpec::new("a.json", json!({"a": 1})).unwrap();
        let r = reconcile_artifact(&store, Path::new("a.json"), &spec, false).unwrap();
        assert_eq!(r.state, ArtifactState::Created);
        assert_eq!(read_json(&store, "a.json"), json!({"a": 1}));
    }

    #[test]
    fn extra_entries_are_preserved_and_unchanged() {
        let (_dir, store) = setup();
        store
            .write(Path::new("a.json"), r#"{"a": 1, "extra": "keep"}"#)
            .unwrap();
        let spec = ArtifactSpec::new("a.json", json!({"a": 1})).unwrap();
        let r = reconcile_artifact(&store, Path::new("a.json"), &spec, false).unwrap();
        assert_eq!(r.state, ArtifactState::Unchanged);
        assert_eq!(
            store.read(Path::new("a.json")).unwrap().as_deref(),
            Some(r#"{"a": 1, "extra": "keep"}"#)
        );
    }

    #[test]
    fn missing_entries_are_merged() {
        let (_dir, store) = setup();
        store.write(Path::new("a.json"), r#"{"extra": "keep"}"#).unwrap();
        let spec = ArtifactSpec::new("a.json", json!({"a": 1})).unwrap();
        let r = reconcile_artifact(&store, Path::new("a.json"), &spec, false).unwrap();
        assert_eq!(r.state, ArtifactState::Updated);
        assert_eq!(r.added.len(), 1);
        assert_eq!(r.added[0].pointer, "/a");
        assert_eq!(read_json(&store, "a.json"), json!({"a": 1, "extra": "keep"}));

        let again = reconcile_artifact(&store, Path::new("a.json"), &spec, false).unwrap();
        assert_eq!(again.state, ArtifactState::Unchanged);
        assert_eq!(again.digest, r.digest);
    }

    #[test]
    fn customized_scalar_is_kept() {
        let (_dir, store) = setup();
        store.write(Path::new("a.json"), r#"{"line": 120}"#).unwrap();
        let spec = ArtifactSpec::new("a.json", json!({"line": 88})).unwrap();
        let r = reconcile_artifact(&store, Path::new("a.json"), &spec, false).unwrap();
        assert_eq!(r.state, ArtifactState::Unchanged);
        assert_eq!(r.divergences.len(), 1);
        assert_eq!(read_json(&store, "a.json"), json!({"line": 120}));
    }

    #[test]
    fn opt_out_marker_is_respected() {
        let (_dir, store) = setup();
        let original = "# strata: off\nnot even toml = = =\n";
        store.write(Path::new("a.toml"), original).unwrap();
        let spec = ArtifactSpec::new("a.toml", json!({"a": 1}))
            .unwrap()
            .opt_out_marker("strata: off");
        let r = reconcile_artifact(&store, Path::new("a.toml"), &spec, false).unwrap();
        assert_eq!(r.state, ArtifactState::Skipped);
        assert_eq!(store.read(Path::new("a.toml")).unwrap().as_deref(), Some(original));
    }

    #[test]
    fn unparsable_existing_fails_untouched() {
        let (_dir, store) = setup();
        store.write(Path::new("a.json"), "{ broken").unwrap();
        let spec = ArtifactSpec::new("a.json", json!({"a": 1})).unwrap();
        let err = reconcile_artifact(&store, Path::new("a.json"), &spec, false).unwrap_err();
        assert!(matches!(err, ArtifactError::Format(_)));
        assert_eq!(store.read(Path::new("a.json")).unwrap().as_deref(), Some("{ broken"));
    }

    #[test]
    fn incompatible_shape_fails_untouched() {
        let (_dir, store) = setup();
        store.write(Path::new("a.json"), r#"{"a": [1, 2]}"#).unwrap();
        let spec = ArtifactSpec::new("a.json", json!({"a": {"b": 1}})).unwrap();
        let err = reconcile_artifact(&store, Path::new("a.json"), &spec, false).unwrap_err();
        assert!(matches!(err, ArtifactError::Tree(_)));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let (_dir, store) = setup();
        let spec = ArtifactSpec::new("a.json", json!({"a": 1})).unwrap();
        let r = reconcile_artifact(&store, Path::new("a.json"), &spec, true).unwrap();
        assert_eq!(r.state, ArtifactState::Created);
        assert!(store.read(Path::new("a.json")).unwrap().is_none());
    }

    #[test]
    fn toml_sequences_append_missing() {
        let (_dir, store) = setup();
        store
            .write(Path::new("a.toml"), "[lint]\nselect = [\"E\", \"X\"]\n")
            .unwrap();
        let spec = ArtifactSpec::new("a.toml", json!({"lint": {"select": ["E", "F"]}}))
            .unwrap()
            .sequences(SequencePolicy::AppendMissing);
        let r = reconcile_artifact(&store, Path::new("a.toml"), &spec, false).unwrap();
        assert_eq!(r.state, ArtifactState::Updated);

        let text = store.read(Path::new("a.toml")).unwrap().unwrap();
        let value: toml::Value = toml::from_str(&text).unwrap();
        let select: Vec<&str> = value["lint"]["select"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(select, vec!["E", "X", "F"]);
    }

    #[test]
    fn toml_update_keeps_user_datetimes() {
        let (_dir, store) = setup();
        let path = Path::new("release.toml");
        store
            .write(path, "released = 1979-05-27T07:32:00Z\n\n[meta]\nday = 1979-05-27\n")
            .unwrap();
        let spec = ArtifactSpec::new("release.toml", json!({"name": "demo"})).unwrap();

        let r = reconcile_artifact(&store, path, &spec, false).unwrap();
        assert_eq!(r.state, ArtifactState::Updated);

        let text = store.read(path).unwrap().unwrap();
        let doc: toml::Table = toml::from_str(&text).unwrap();
        assert_eq!(doc["name"].as_str(), Some("demo"));
        let released = doc["released"].as_datetime().unwrap();
        assert_eq!(released.to_string(), "1979-05-27T07:32:00Z");
        assert!(doc["meta"]["day"].is_datetime());

        let again = reconcile_artifact(&store, path, &spec, false).unwrap();
        assert_eq!(again.state, ArtifactState::Unchanged);
    }
}

//! Project-relative file storage with atomic writes.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::ArtifactError;

/// Files under a project root.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProjectStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a project-relative path.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Read a file, or `None` if it does not exist.
    pub fn read(&self, relative: &Path) -> Result<Option<String>, ArtifactError> {
        let path = self.resolve(relative);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ArtifactError::Io { path, source }),
        }
    }

    /// Replace a file's contents atomically, creating parent directories.
    ///
    /// The new contents are written to a temporary file in the target
    /// directory and renamed over the target, so readers never observe a
    /// partial write.
    pub fn write(&self, relative: &Path, contents: &str) -> Result<(), ArtifactError> {
        let path = self.resolve(relative);
        let io_err = |source: io::Error| ArtifactError::Io {
            path: path.clone(),
            source,
        };

        let parent = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent).map_err(io_err)?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
        tmp.write_all(contents.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());
        assert!(store.read(Path::new("nope.json")).unwrap().is_none());
    }

    #[test]
    fn write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());
        let rel = Path::new("config/nested/a.json");

        store.write(rel, "{}\n").unwrap();
        assert_eq!(store.read(rel).unwrap().as_deref(), Some("{}\n"));

        store.write(rel, "{\"a\": 1}\n").unwrap();
        assert_eq!(store.read(rel).unwrap().as_deref(), Some("{\"a\": 1}\n"));

        // No temp files left behind.
        let entries = std::fs::read_dir(dir.path().join("config/nested"))
            .unwrap()
            .count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn read_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let store = ProjectStore::new(dir.path());
        assert!(matches!(
            store.read(Path::new("sub")),
            Err(ArtifactError::Io { .. })
        ));
    }
}

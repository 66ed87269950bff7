//! Filesystem document store
//!
//! Documents live under a root directory, one file per path. Writes go to a
//! temporary sibling first and are renamed into place, so readers never see a
//! half-written file. Revisions are not tracked: preconditions are accepted
//! and ignored, and the last writer wins.

use super::{DocumentPath, DocumentStore, Precondition, Revision};
use crate::error::{KbError, Result};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Filesystem-based document store
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a store rooted at `root`. The directory is created lazily on the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &DocumentPath) -> PathBuf {
        path.as_str()
            .split('/')
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    fn map_io(path: &DocumentPath, err: io::Error) -> KbError {
        if err.kind() == io::ErrorKind::NotFound {
            KbError::not_found(path.as_str())
        } else {
            KbError::Io(io::Error::new(
                err.kind(),
                format!("Failed to access '{}': {}", path, err),
            ))
        }
    }

    fn temp_path(target: &Path) -> PathBuf {
        let file_name = target
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let unique = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        target.with_file_name(format!(
            ".{}.{}.{}.tmp",
            file_name,
            std::process::id(),
            unique
        ))
    }
}

#[async_trait]
impl DocumentStore for LocalBackend {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn read(&self, path: &DocumentPath) -> Result<Vec<u8>> {
        tracing::debug!("local read {}", path);
        tokio::fs::read(self.resolve(path))
            .await
            .map_err(|e| Self::map_io(path, e))
    }

    async fn revision(&self, _path: &DocumentPath) -> Result<Option<Revision>> {
        Ok(None)
    }

    async fn write(
        &self,
        path: &DocumentPath,
        content: &[u8],
        precondition: &Precondition,
        message: &str,
    ) -> Result<Option<Revision>> {
        tracing::debug!(
            "local write {} ({} bytes, precondition {} ignored): {}",
            path,
            content.len(),
            precondition.describe(),
            message
        );

        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::map_io(path, e))?;
        }

        let temp = Self::temp_path(&target);
        let written = match tokio::fs::write(&temp, content).await {
            Ok(()) => tokio::fs::rename(&temp, &target).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // A partial temp file may exist whichever step failed
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(Self::map_io(path, e));
        }

        Ok(None)
    }

    async fn exists(&self, path: &DocumentPath) -> Result<bool> {
        match tokio::fs::metadata(self.resolve(path)).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_io(path, e)),
        }
    }

    fn supports_listing(&self) -> bool {
        true
    }

    async fn list(&self, dir: &str) -> Result<Vec<DocumentPath>> {
        let (base, prefix) = if dir.is_empty() {
            (self.root.clone(), None)
        } else {
            let dir = DocumentPath::new(dir)?;
            (self.resolve(&dir), Some(dir))
        };

        let mut entries = match tokio::fs::read_dir(&base).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(KbError::Io(e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            // Skip in-flight temp files and other dotfiles
            if name.starts_with('.') {
                continue;
            }
            let child = match &prefix {
                Some(prefix) => prefix.join(&name)?,
                None => DocumentPath::new(name)?,
            };
            paths.push(child);
        }

        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBackend::new(temp_dir.path().join("kb"));
        (store, temp_dir)
    }

    fn path(p: &str) -> DocumentPath {
        DocumentPath::new(p).unwrap()
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (store, _temp_dir) = create_test_store();
        let err = store.read(&path("missing.json")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.exists(&path("missing.json")).await.unwrap());
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let (store, temp_dir) = create_test_store();
        let p = path("journal/2025/06-june/2025-06-01.md");

        let revision = store
            .write(&p, b"entry", &Precondition::Absent, "add entry")
            .await
            .unwrap();

        assert_eq!(revision, None);
        assert!(temp_dir
            .path()
            .join("kb/journal/2025/06-june/2025-06-01.md")
            .is_file());
        assert_eq!(store.read(&p).await.unwrap(), b"entry");
        assert!(store.exists(&p).await.unwrap());
    }

    #[tokio::test]
    async fn test_sequential_writers_last_write_wins() {
        let (store, _temp_dir) = create_test_store();
        let p = path("profile/skills.json");

        // Both writers think they are creating the document.
        store
            .write(&p, b"first", &Precondition::Absent, "writer a")
            .await
            .unwrap();
        store
            .write(&p, b"second", &Precondition::Absent, "writer b")
            .await
            .unwrap();

        assert_eq!(store.read(&p).await.unwrap(), b"second");
        assert_eq!(store.revision(&p).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_directory() {
        let (store, _temp_dir) = create_test_store();
        for p in ["projects/active.json", "projects/planned.json", "goals/goals.json"] {
            store
                .write(&path(p), b"{}", &Precondition::Any, "seed")
                .await
                .unwrap();
        }

        assert!(store.supports_listing());
        let projects = store.list("projects").await.unwrap();
        assert_eq!(
            projects,
            vec![path("projects/active.json"), path("projects/planned.json")]
        );

        let root = store.list("").await.unwrap();
        assert_eq!(root, vec![path("goals"), path("projects")]);

        assert!(store.list("nothing-here").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let (store, temp_dir) = create_test_store();
        let p = path("ideas/ideas.json");
        store.write(&p, b"[]", &Precondition::Any, "seed").await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path().join("kb/ideas"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    fn temp_files_in(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[tokio::test]
    async fn test_failed_write_removes_temp_file() {
        let (store, temp_dir) = create_test_store();
        let ideas = temp_dir.path().join("kb/ideas");
        // A directory where the document should go makes the rename fail.
        std::fs::create_dir_all(ideas.join("ideas.json")).unwrap();

        let result = store
            .write(&path("ideas/ideas.json"), b"[]", &Precondition::Any, "seed")
            .await;
        assert!(matches!(result, Err(KbError::Io(_))));
        assert!(temp_files_in(&ideas).is_empty());
    }

    #[tokio::test]
    async fn test_exists_propagates_io_errors() {
        let (store, _temp_dir) = create_test_store();
        store
            .write(&path("goals.json"), b"[]", &Precondition::Any, "seed")
            .await
            .unwrap();

        // A regular file used as a directory is an error, not a missing document.
        let result = store.exists(&path("goals.json/inner.json")).await;
        assert!(matches!(result, Err(KbError::Io(_))));
        assert!(!store.exists(&path("goals/none.json")).await.unwrap());
    }
}

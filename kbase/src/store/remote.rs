//! Revision-tracked remote document store
//!
//! [`RemoteVersionedBackend`] adapts a [`ContentApi`] (a content service that
//! hands out a revision with every read and checks one on every write) to the
//! [`DocumentStore`] trait.
//!
//! # Known race
//!
//! [`RemoteVersionedBackend::put`] resolves the current revision and then
//! submits the write as two separate calls with no retry in between. Two
//! writers that both resolve revision `R` will both submit against `R`; the
//! content API lets exactly one of them through and the other fails with
//! `Conflict`. Which one wins is not deterministic. Callers that need their
//! update to survive use [`crate::store::update_document`] instead.

use super::memory::InMemoryContentApi;
use super::{DocumentPath, DocumentStore, Precondition, Revision, Versioned};
use crate::error::{KbError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// A file as returned by a content API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Decoded file content
    pub content: Vec<u8>,
    /// Content-derived revision token
    pub revision: Revision,
}

/// Transport seam for a revision-tracked content service
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Fetch a file, `None` if it does not exist
    async fn fetch(&self, path: &str) -> Result<Option<RemoteFile>>;

    /// Store a file. `expected` is `None` for a create and the revision the
    /// caller last saw for an update; a mismatch fails with `Conflict`.
    /// `message` is recorded in the service's change history.
    async fn store(
        &self,
        path: &str,
        content: &[u8],
        expected: Option<&Revision>,
        message: &str,
    ) -> Result<Revision>;
}

/// Document store backed by a revision-tracked content API
#[derive(Clone)]
pub struct RemoteVersionedBackend {
    api: Arc<dyn ContentApi>,
}

impl RemoteVersionedBackend {
    /// Create a backend over the given content API
    pub fn new(api: Arc<dyn ContentApi>) -> Self {
        Self { api }
    }

    /// Backend over a fresh [`InMemoryContentApi`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryContentApi::new()))
    }

    /// Overwrite a document using the unprotected two-step sequence: resolve
    /// the current revision, then write against it. See the module docs for
    /// the race this leaves open.
    pub async fn put(
        &self,
        path: &DocumentPath,
        content: &[u8],
        message: &str,
    ) -> Result<Option<Revision>> {
        self.write(path, content, &Precondition::Any, message).await
    }
}

#[async_trait]
impl DocumentStore for RemoteVersionedBackend {
    fn backend_name(&self) -> &'static str {
        "remote"
    }

    async fn read(&self, path: &DocumentPath) -> Result<Vec<u8>> {
        tracing::debug!("remote read {}", path);
        self.api
            .fetch(path.as_str())
            .await?
            .map(|file| file.content)
            .ok_or_else(|| KbError::not_found(path.as_str()))
    }

    async fn revision(&self, path: &DocumentPath) -> Result<Option<Revision>> {
        Ok(self.api.fetch(path.as_str()).await?.map(|file| file.revision))
    }

    async fn read_versioned(&self, path: &DocumentPath) -> Result<Versioned> {
        tracing::debug!("remote versioned read {}", path);
        let file = self
            .api
            .fetch(path.as_str())
            .await?
            .ok_or_else(|| KbError::not_found(path.as_str()))?;
        Ok(Versioned {
            content: file.content,
            revision: Some(file.revision),
        })
    }

    async fn write(
        &self,
        path: &DocumentPath,
        content: &[u8],
        precondition: &Precondition,
        message: &str,
    ) -> Result<Option<Revision>> {
        let expected = match precondition {
            Precondition::Absent => None,
            Precondition::Matches(revision) => Some(revision.clone()),
            // Two-step: whatever is there right now becomes the expectation.
            Precondition::Any => self.revision(path).await?,
        };

        tracing::debug!(
            "remote write {} ({} bytes, expecting {}): {}",
            path,
            content.len(),
            expected.as_ref().map_or("<absent>", |r| r.as_str()),
            message
        );

        match self
            .api
            .store(path.as_str(), content, expected.as_ref(), message)
            .await
        {
            Ok(revision) => Ok(Some(revision)),
            Err(e) => {
                if e.is_conflict() {
                    tracing::warn!("remote write to {} lost a race: {}", path, e);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> DocumentPath {
        DocumentPath::new(p).unwrap()
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let store = RemoteVersionedBackend::in_memory();
        assert!(store.read(&path("x.json")).await.unwrap_err().is_not_found());
        assert_eq!(store.revision(&path("x.json")).await.unwrap(), None);
        assert!(!store.exists(&path("x.json")).await.unwrap());
    }

    #[tokio::test]
    async fn test_two_writers_same_revision_exactly_one_wins() {
        let api = Arc::new(InMemoryContentApi::new());
        let writer_a = RemoteVersionedBackend::new(api.clone());
        let writer_b = RemoteVersionedBackend::new(api.clone());
        let p = path("goals/goals.json");
        writer_a.put(&p, b"[]", "seed").await.unwrap();

        let seen_a = writer_a.revision(&p).await.unwrap().unwrap();
        let seen_b = writer_b.revision(&p).await.unwrap().unwrap();
        assert_eq!(seen_a, seen_b);

        let (expect_a, expect_b) = (Precondition::Matches(seen_a), Precondition::Matches(seen_b));
        let (result_a, result_b) = futures::join!(
            writer_a.write(&p, b"[\"a\"]", &expect_a, "a"),
            writer_b.write(&p, b"[\"b\"]", &expect_b, "b"),
        );

        let successes = [result_a.is_ok(), result_b.is_ok()]
            .iter()
            .filter(|ok| **ok)
            .count();
        assert_eq!(successes, 1);

        let loser = if result_a.is_ok() { result_b } else { result_a };
        assert!(loser.unwrap_err().is_conflict());

        let stored = writer_a.read(&p).await.unwrap();
        assert!(stored == b"[\"a\"]" || stored == b"[\"b\"]");
    }

    #[tokio::test]
    async fn test_create_precondition_rejects_existing_document() {
        let store = RemoteVersionedBackend::in_memory();
        let p = path("journal/2025/06-june/2025-06-01.md");
        store
            .write(&p, b"one", &Precondition::Absent, "create")
            .await
            .unwrap();

        let err = store
            .write(&p, b"two", &Precondition::Absent, "create again")
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.read(&p).await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn test_read_versioned_matches_revision() {
        let store = RemoteVersionedBackend::in_memory();
        let p = path("profile/skills.json");
        let written = store.put(&p, b"{}", "seed").await.unwrap();

        let versioned = store.read_versioned(&p).await.unwrap();
        assert_eq!(versioned.content, b"{}");
        assert_eq!(versioned.revision, written);
    }

    #[tokio::test]
    async fn test_listing_is_unsupported() {
        let store = RemoteVersionedBackend::in_memory();
        assert!(!store.supports_listing());
        match store.list("projects").await {
            Err(KbError::Unsupported { backend, .. }) => assert_eq!(backend, "remote"),
            other => panic!("Expected Unsupported, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_put_records_change_description() {
        let api = Arc::new(InMemoryContentApi::new());
        let store = RemoteVersionedBackend::new(api.clone());
        store
            .put(&path("ideas/ideas.json"), b"[]", "Add idea: garden robot")
            .await
            .unwrap();

        let commits = api.commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].path, "ideas/ideas.json");
        assert_eq!(commits[0].message, "Add idea: garden robot");
    }
}

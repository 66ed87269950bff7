//! Path-addressed document storage
//!
//! A [`DocumentStore`] reads and writes whole documents by relative path. Two
//! backends exist:
//!
//! - [`LocalBackend`]: a directory tree on disk. Writes are atomic per file but
//!   revisions are not tracked, so concurrent writers are last-write-wins.
//! - [`RemoteVersionedBackend`]: a revision-tracked content API. Every write
//!   carries a [`Precondition`] that the API checks with compare-and-swap.
//!
//! [`update_document`] is the read-modify-write primitive the rest of the
//! crate builds on.

use crate::error::{KbError, Result};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

pub mod http;
pub mod local;
pub mod memory;
pub mod remote;

pub use http::HttpContentApi;
pub use local::LocalBackend;
pub use memory::{Commit, InMemoryContentApi};
pub use remote::{ContentApi, RemoteFile, RemoteVersionedBackend};

/// Validated relative path of a document inside a store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Validate and wrap a relative path
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let reject = |reason: &str| KbError::InvalidPath {
            path: path.clone(),
            reason: reason.to_string(),
        };

        if path.is_empty() {
            return Err(reject("path is empty"));
        }
        if path.starts_with('/') {
            return Err(reject("path must be relative"));
        }
        if path.contains('\\') {
            return Err(reject("use '/' as the separator"));
        }
        for segment in path.split('/') {
            match segment {
                "" => return Err(reject("empty path segment")),
                "." | ".." => return Err(reject("path escapes the document root")),
                _ => {}
            }
        }

        Ok(Self(path))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append one or more `/`-separated segments
    pub fn join(&self, child: &str) -> Result<Self> {
        Self::new(format!("{}/{}", self.0, child))
    }

    /// Final path segment
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Everything before the final segment, if any
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| Self(parent.to_string()))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for DocumentPath {
    type Err = KbError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Opaque backend revision token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    /// Wrap a backend-issued token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a writer expects the backend to hold before its write lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The document must not exist yet
    Absent,
    /// The document must currently be at this revision
    Matches(Revision),
    /// Overwrite whatever is there
    Any,
}

impl Precondition {
    /// Precondition that guards an update of content read at `revision`
    pub fn from_revision(revision: Option<Revision>) -> Self {
        match revision {
            Some(revision) => Self::Matches(revision),
            None => Self::Any,
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Absent => "<absent>".to_string(),
            Self::Matches(revision) => revision.to_string(),
            Self::Any => "<any>".to_string(),
        }
    }
}

/// Document content together with the revision it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    /// Raw document bytes
    pub content: Vec<u8>,
    /// Revision at read time, `None` on backends without revisions
    pub revision: Option<Revision>,
}

/// Trait for path-addressed document storage
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name used in logs and errors
    fn backend_name(&self) -> &'static str;

    /// Read a document, failing with `NotFound` if it is absent
    async fn read(&self, path: &DocumentPath) -> Result<Vec<u8>>;

    /// Resolve the document's current revision, `None` if absent or untracked
    async fn revision(&self, path: &DocumentPath) -> Result<Option<Revision>>;

    /// Write a document guarded by `precondition`, returning the new revision
    async fn write(
        &self,
        path: &DocumentPath,
        content: &[u8],
        precondition: &Precondition,
        message: &str,
    ) -> Result<Option<Revision>>;

    /// Read content and revision together.
    ///
    /// The default issues two independent calls, so another writer may slip
    /// in between them; the later compare-and-swap still catches that.
    async fn read_versioned(&self, path: &DocumentPath) -> Result<Versioned> {
        let content = self.read(path).await?;
        let revision = self.revision(path).await?;
        Ok(Versioned { content, revision })
    }

    /// Check whether a document exists
    async fn exists(&self, path: &DocumentPath) -> Result<bool> {
        match self.read(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read a document as UTF-8 text
    async fn read_to_string(&self, path: &DocumentPath) -> Result<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes)
            .map_err(|e| KbError::malformed(path.as_str(), format!("not valid UTF-8: {e}")))
    }

    /// Whether [`DocumentStore::list`] is available
    fn supports_listing(&self) -> bool {
        false
    }

    /// List the direct children of a directory; `""` is the store root
    async fn list(&self, _dir: &str) -> Result<Vec<DocumentPath>> {
        Err(KbError::Unsupported {
            operation: "list".to_string(),
            backend: self.backend_name().to_string(),
        })
    }
}

/// How [`update_document`] reacts to a `Conflict`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first conflicting write. `0` surfaces the
    /// first conflict to the caller.
    pub max_conflict_retries: u32,
    /// Delay before the first retry, doubled on each further retry
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Never retry
    pub fn none() -> Self {
        Self {
            max_conflict_retries: 0,
            initial_backoff: Duration::from_millis(0),
        }
    }

    /// Retry up to `retries` times with a 50ms initial backoff
    pub fn retries(retries: u32) -> Self {
        Self {
            max_conflict_retries: retries,
            initial_backoff: Duration::from_millis(50),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Read a document, let `mutate` compute its replacement, and write it back
/// guarded by the revision seen at read time.
///
/// `mutate` receives `None` when the document does not exist, in which case
/// the write requires the document to still be absent. On `Conflict` the whole
/// read-mutate-write cycle is repeated according to `policy`, so `mutate` may
/// run more than once and must not have side effects.
pub async fn update_document<S, F, T>(
    store: &S,
    path: &DocumentPath,
    message: &str,
    policy: &RetryPolicy,
    mut mutate: F,
) -> Result<T>
where
    S: DocumentStore + ?Sized,
    F: FnMut(Option<&[u8]>) -> Result<(Vec<u8>, T)> + Send,
    T: Send,
{
    let mut attempt = 0;
    let mut backoff = policy.initial_backoff;

    loop {
        let current = match store.read_versioned(path).await {
            Ok(versioned) => Some(versioned),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let precondition = match &current {
            Some(versioned) => Precondition::from_revision(versioned.revision.clone()),
            None => Precondition::Absent,
        };

        let (content, output) = mutate(current.as_ref().map(|v| v.content.as_slice()))?;

        match store.write(path, &content, &precondition, message).await {
            Ok(revision) => {
                tracing::debug!(
                    "Updated {} on {} backend (revision {:?})",
                    path,
                    store.backend_name(),
                    revision
                );
                return Ok(output);
            }
            Err(e) if e.is_conflict() && attempt < policy.max_conflict_retries => {
                attempt += 1;
                tracing::warn!(
                    "Conflict writing {}, retry {}/{} in {:?}",
                    path,
                    attempt,
                    policy.max_conflict_retries,
                    backoff
                );
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
                backoff *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn path(p: &str) -> DocumentPath {
        DocumentPath::new(p).unwrap()
    }

    #[test]
    fn test_document_path_validation() {
        assert!(DocumentPath::new("profile/skills.json").is_ok());
        assert!(DocumentPath::new("").is_err());
        assert!(DocumentPath::new("/etc/passwd").is_err());
        assert!(DocumentPath::new("journal/../secrets").is_err());
        assert!(DocumentPath::new("journal//2025").is_err());
        assert!(DocumentPath::new("journal\\2025").is_err());
        assert!(DocumentPath::new("./x").is_err());
    }

    #[test]
    fn test_document_path_parts() {
        let p = path("journal/2025/06-june/2025-06-01.md");
        assert_eq!(p.file_name(), "2025-06-01.md");
        assert_eq!(p.parent().unwrap().as_str(), "journal/2025/06-june");
        assert_eq!(path("a").parent(), None);
        assert_eq!(path("a").join("b/c").unwrap().as_str(), "a/b/c");
        assert!(path("a").join("../b").is_err());
    }

    #[tokio::test]
    async fn test_update_document_creates_when_absent() {
        let store = RemoteVersionedBackend::in_memory();
        let p = path("notes/new.txt");

        let seen_absent = update_document(&store, &p, "create", &RetryPolicy::none(), |current| {
            Ok((b"hello".to_vec(), current.is_none()))
        })
        .await
        .unwrap();

        assert!(seen_absent);
        assert_eq!(store.read(&p).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_update_document_surfaces_conflict_without_retries() {
        let api = Arc::new(InMemoryContentApi::new());
        let store = RemoteVersionedBackend::new(api.clone());
        let p = path("counter.txt");
        store.put(&p, b"0", "seed").await.unwrap();

        // Another writer lands between our read and our write.
        let interloper = RemoteVersionedBackend::new(api.clone());
        let result = update_document(&store, &p, "bump", &RetryPolicy::none(), |current| {
            let current = current.unwrap().to_vec();
            let interloper = interloper.clone();
            let p = p.clone();
            futures::executor::block_on(async move { interloper.put(&p, b"9", "race").await })?;
            Ok((current, ()))
        })
        .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(store.read(&p).await.unwrap(), b"9");
    }

    #[tokio::test]
    async fn test_update_document_retries_on_fresh_content() {
        let api = Arc::new(InMemoryContentApi::new());
        let store = RemoteVersionedBackend::new(api.clone());
        let p = path("counter.txt");
        store.put(&p, b"1", "seed").await.unwrap();

        let interloper = RemoteVersionedBackend::new(api.clone());
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy {
            max_conflict_retries: 2,
            initial_backoff: Duration::from_millis(0),
        };

        update_document(&store, &p, "increment", &policy, |current| {
            let n: u32 = std::str::from_utf8(current.unwrap())
                .unwrap()
                .parse()
                .unwrap();
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                let interloper = interloper.clone();
                let p = p.clone();
                futures::executor::block_on(async move { interloper.put(&p, b"5", "race").await })?;
            }
            Ok(((n + 1).to_string().into_bytes(), ()))
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.read(&p).await.unwrap(), b"6");
    }
}

//! In-process content API
//!
//! `InMemoryContentApi` behaves like the remote content service: revisions
//! are derived from content (sha256), writes are compare-and-swap, and every
//! successful write appends a [`Commit`] to an audit trail. Tests can make
//! writes to chosen paths fail to exercise partial-failure handling.

use super::remote::{ContentApi, RemoteFile};
use super::Revision;
use crate::error::{KbError, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// One entry in the change history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Path that was written
    pub path: String,
    /// Human-readable change description
    pub message: String,
    /// Revision produced by the write
    pub revision: Revision,
}

#[derive(Debug, Default)]
struct State {
    files: HashMap<String, RemoteFile>,
    commits: Vec<Commit>,
    failing_paths: HashSet<String>,
}

/// In-memory content API with compare-and-swap writes
#[derive(Debug, Default)]
pub struct InMemoryContentApi {
    state: Mutex<State>,
}

impl InMemoryContentApi {
    /// Create an empty content API
    pub fn new() -> Self {
        Self::default()
    }

    /// Content-derived revision token
    pub fn revision_for(content: &[u8]) -> Revision {
        let digest = Sha256::digest(content);
        Revision::new(
            digest
                .iter()
                .map(|byte| format!("{byte:02x}"))
                .collect::<String>(),
        )
    }

    /// Make every subsequent write to `path` fail with a server error
    pub fn fail_writes_to(&self, path: impl Into<String>) {
        self.lock().failing_paths.insert(path.into());
    }

    /// Stop failing writes to `path`
    pub fn clear_failures(&self) {
        self.lock().failing_paths.clear();
    }

    /// Snapshot of the change history, oldest first
    pub fn commits(&self) -> Vec<Commit> {
        self.lock().commits.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked mid-write;
        // the map itself is still consistent.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ContentApi for InMemoryContentApi {
    async fn fetch(&self, path: &str) -> Result<Option<RemoteFile>> {
        Ok(self.lock().files.get(path).cloned())
    }

    async fn store(
        &self,
        path: &str,
        content: &[u8],
        expected: Option<&Revision>,
        message: &str,
    ) -> Result<Revision> {
        let mut state = self.lock();

        if state.failing_paths.contains(path) {
            return Err(KbError::Remote {
                status: 500,
                message: format!("injected failure writing {path}"),
            });
        }

        let actual = state.files.get(path).map(|file| file.revision.clone());
        if actual.as_ref() != expected {
            return Err(KbError::Conflict {
                path: path.to_string(),
                expected: expected.map_or("<absent>".to_string(), |r| r.to_string()),
                actual: actual.map_or("<absent>".to_string(), |r| r.to_string()),
            });
        }

        let revision = Self::revision_for(content);
        state.files.insert(
            path.to_string(),
            RemoteFile {
                content: content.to_vec(),
                revision: revision.clone(),
            },
        );
        state.commits.push(Commit {
            path: path.to_string(),
            message: message.to_string(),
            revision: revision.clone(),
        });

        Ok(revision)
    }
}

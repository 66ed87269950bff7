//! Partial updates over typed collection documents
//!
//! [`PartialUpdateEngine`] is the only writer of collection documents. Every
//! mutation is a read-mutate-write cycle through [`update_document`], so on
//! backends with revisions a concurrent writer is detected instead of being
//! silently overwritten.
//!
//! Moves between collections are two independent document writes. If the
//! destination write fails after the source write landed, the record exists in
//! neither collection and the engine reports [`KbError::PartialMove`] carrying
//! the record so it can be restored.

use crate::codec::{decode_json, encode_json};
use crate::error::{KbError, Result};
use crate::records::{generate_id, KeyedRecord, ListedRecord, Record, RecordPatch};
use crate::store::{update_document, DocumentPath, DocumentStore, RetryPolicy};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A map-keyed collection as stored
pub type RecordMap<R> = BTreeMap<String, R>;

/// Reads, patches, adds, removes and moves records in collection documents
#[derive(Clone)]
pub struct PartialUpdateEngine {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
}

impl PartialUpdateEngine {
    /// Create an engine that never retries on conflict
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_policy(store, RetryPolicy::default())
    }

    /// Create an engine with an explicit conflict retry policy
    pub fn with_policy(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Conflict retry policy in effect
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Load a map-keyed collection; a missing document is an empty map
    pub async fn load_map<R: KeyedRecord>(&self, path: &DocumentPath) -> Result<RecordMap<R>> {
        match self.store.read(path).await {
            Ok(bytes) => decode_json(path, &bytes),
            Err(e) if e.is_not_found() => Ok(RecordMap::new()),
            Err(e) => Err(e),
        }
    }

    /// Load a list-keyed collection; a missing document is an empty list
    pub async fn load_list<R: ListedRecord>(&self, path: &DocumentPath) -> Result<Vec<R>> {
        match self.store.read(path).await {
            Ok(bytes) => decode_json(path, &bytes),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Fetch one record from a map-keyed collection
    pub async fn get_keyed<R: KeyedRecord>(&self, path: &DocumentPath, key: &str) -> Result<R> {
        self.load_map::<R>(path)
            .await?
            .remove(key)
            .ok_or_else(|| KbError::validation_gap(R::KIND.name(), key, path.as_str()))
    }

    /// Insert a record under `key`, failing `Duplicate` if the key is taken
    pub async fn add_keyed<R: KeyedRecord>(
        &self,
        path: &DocumentPath,
        key: &str,
        record: R,
    ) -> Result<()> {
        let kind = R::KIND;
        let message = format!("Add {kind} {key}");
        update_document(self.store.as_ref(), path, &message, &self.policy, |current| {
            let mut map: RecordMap<R> = decode_map(path, current)?;
            if map.contains_key(key) {
                return Err(KbError::duplicate(kind.name(), key));
            }
            map.insert(key.to_string(), record.clone());
            Ok((encode_json(&map)?, ()))
        })
        .await?;

        tracing::info!("Added {} '{}' to {}", kind, key, path);
        Ok(())
    }

    /// Append a record with a freshly generated id and return it
    pub async fn add_listed<R: ListedRecord>(&self, path: &DocumentPath, mut record: R) -> Result<R> {
        let kind = R::KIND;
        let id = generate_id(kind, record.id_seed());
        record.set_id(id.clone());

        let message = format!("Add {kind} {id}");
        let added = update_document(self.store.as_ref(), path, &message, &self.policy, |current| {
            let mut list: Vec<R> = decode_list(path, current)?;
            if list.iter().any(|existing| existing.id() == id) {
                return Err(KbError::duplicate(kind.name(), id.as_str()));
            }
            list.push(record.clone());
            Ok((encode_json(&list)?, record.clone()))
        })
        .await?;

        tracing::info!("Added {} '{}' to {}", kind, id, path);
        Ok(added)
    }

    /// Apply a sparse patch to the record under `key` and return the result
    pub async fn patch_keyed<R: KeyedRecord>(
        &self,
        path: &DocumentPath,
        key: &str,
        patch: &R::Patch,
    ) -> Result<R> {
        let kind = R::KIND;
        let message = format!("Update {kind} {key}");
        let updated = update_document(self.store.as_ref(), path, &message, &self.policy, |current| {
            let mut map: RecordMap<R> = decode_map(path, current)?;
            let record = map
                .get_mut(key)
                .ok_or_else(|| KbError::validation_gap(kind.name(), key, path.as_str()))?;
            patch.apply(record)?;
            let updated = record.clone();
            Ok((encode_json(&map)?, updated))
        })
        .await?;

        tracing::info!("Updated {} '{}' in {}", kind, key, path);
        Ok(updated)
    }

    /// Apply a sparse patch to the entry with `id` and return the result
    pub async fn patch_listed<R: ListedRecord>(
        &self,
        path: &DocumentPath,
        id: &str,
        patch: &R::Patch,
    ) -> Result<R> {
        let kind = R::KIND;
        let message = format!("Update {kind} {id}");
        let updated = update_document(self.store.as_ref(), path, &message, &self.policy, |current| {
            let mut list: Vec<R> = decode_list(path, current)?;
            let record = list
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or_else(|| KbError::validation_gap(kind.name(), id, path.as_str()))?;
            patch.apply(record)?;
            let updated = record.clone();
            Ok((encode_json(&list)?, updated))
        })
        .await?;

        tracing::info!("Updated {} '{}' in {}", kind, id, path);
        Ok(updated)
    }

    /// Remove the record under `key` and return it
    pub async fn remove_keyed<R: KeyedRecord>(&self, path: &DocumentPath, key: &str) -> Result<R> {
        let kind = R::KIND;
        let message = format!("Remove {kind} {key}");
        let removed = update_document(self.store.as_ref(), path, &message, &self.policy, |current| {
            let mut map: RecordMap<R> = decode_map(path, current)?;
            let removed = map
                .remove(key)
                .ok_or_else(|| KbError::validation_gap(kind.name(), key, path.as_str()))?;
            Ok((encode_json(&map)?, removed))
        })
        .await?;

        tracing::info!("Removed {} '{}' from {}", kind, key, path);
        Ok(removed)
    }

    /// Remove the entry with `id` and return it
    pub async fn remove_listed<R: ListedRecord>(&self, path: &DocumentPath, id: &str) -> Result<R> {
        let kind = R::KIND;
        let message = format!("Remove {kind} {id}");
        let removed = update_document(self.store.as_ref(), path, &message, &self.policy, |current| {
            let mut list: Vec<R> = decode_list(path, current)?;
            let index = list
                .iter()
                .position(|r| r.id() == id)
                .ok_or_else(|| KbError::validation_gap(kind.name(), id, path.as_str()))?;
            let removed = list.remove(index);
            Ok((encode_json(&list)?, removed))
        })
        .await?;

        tracing::info!("Removed {} '{}' from {}", kind, id, path);
        Ok(removed)
    }

    /// Move the record under `key` from one map-keyed collection to another,
    /// applying `adjust` on the way (e.g. to update a status field).
    ///
    /// The destination is checked for `key` first (`Duplicate`). The source
    /// write then removes the record and the destination write inserts it.
    /// When `from == to` only `adjust` is applied, in place.
    pub async fn move_keyed<R, F>(
        &self,
        from: &DocumentPath,
        to: &DocumentPath,
        key: &str,
        adjust: F,
    ) -> Result<R>
    where
        R: KeyedRecord,
        F: Fn(&mut R) + Send + Sync,
    {
        let kind = R::KIND;

        if from == to {
            let message = format!("Update {kind} {key}");
            return update_document(self.store.as_ref(), from, &message, &self.policy, |current| {
                let mut map: RecordMap<R> = decode_map(from, current)?;
                let record = map
                    .get_mut(key)
                    .ok_or_else(|| KbError::validation_gap(kind.name(), key, from.as_str()))?;
                adjust(record);
                let updated = record.clone();
                Ok((encode_json(&map)?, updated))
            })
            .await;
        }

        if self.load_map::<R>(to).await?.contains_key(key) {
            return Err(KbError::duplicate(kind.name(), key));
        }

        let mut record: R = self.remove_keyed(from, key).await?;
        adjust(&mut record);

        let message = format!("Move {kind} {key} from {from}");
        let inserted = update_document(self.store.as_ref(), to, &message, &self.policy, |current| {
            let mut map: RecordMap<R> = decode_map(to, current)?;
            if map.contains_key(key) {
                return Err(KbError::duplicate(kind.name(), key));
            }
            map.insert(key.to_string(), record.clone());
            Ok((encode_json(&map)?, ()))
        })
        .await;

        match inserted {
            Ok(()) => {
                tracing::info!("Moved {} '{}' from {} to {}", kind, key, from, to);
                Ok(record)
            }
            Err(e) => {
                let serialized = serde_json::to_string(&record)
                    .unwrap_or_else(|ser| format!("<unserializable record: {ser}>"));
                tracing::error!(
                    "Move of {} '{}' from {} to {} failed after source write: {}",
                    kind,
                    key,
                    from,
                    to,
                    e
                );
                Err(KbError::PartialMove {
                    id: key.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                    reason: e.to_string(),
                    record: serialized,
                })
            }
        }
    }
}

fn decode_map<R: Record>(path: &DocumentPath, current: Option<&[u8]>) -> Result<RecordMap<R>> {
    match current {
        Some(bytes) => decode_json(path, bytes),
        None => Ok(RecordMap::new()),
    }
}

fn decode_list<R: Record>(path: &DocumentPath, current: Option<&[u8]>) -> Result<Vec<R>> {
    match current {
        Some(bytes) => decode_json(path, bytes),
        None => Ok(Vec::new()),
    }
}

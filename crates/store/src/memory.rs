//! In-memory stores.
//!
//! Behave like the durable backends and add switches for injecting
//! failures, so upload and feed behavior can be exercised without disk.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cheezy_common::error::{CheezyError, CheezyResult};
use cheezy_experience_model::{MediaBlob, Snapshot};
use cheezy_platform_core::{BlobStore, RecordStore, Subscription};

use crate::hub::SnapshotHub;

/// Write-once blob store kept in memory.
#[derive(Debug)]
pub struct MemoryBlobStore {
    base_url: String,
    blobs: Mutex<HashMap<String, MediaBlob>>,
    fail_puts: AtomicBool,
    fail_resolve: AtomicBool,
    puts: AtomicUsize,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            base_url: "mem://blobs".to_string(),
            blobs: Mutex::new(HashMap::new()),
            fail_puts: AtomicBool::new(false),
            fail_resolve: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
        }
    }

    /// Make every `put` fail.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every `resolve_url` fail.
    pub fn fail_resolve(&self, fail: bool) {
        self.fail_resolve.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .blobs
            .lock()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    pub fn get(&self, path: &str) -> Option<MediaBlob> {
        self.blobs.lock().ok().and_then(|b| b.get(path).cloned())
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, blob: &MediaBlob) -> CheezyResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(CheezyError::storage("object storage unavailable"));
        }
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| CheezyError::storage("blob map lock poisoned"))?;
        if blobs.contains_key(path) {
            return Err(CheezyError::storage(format!("Blob already exists at {path}")));
        }
        blobs.insert(path.to_string(), blob.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn resolve_url(&self, path: &str) -> CheezyResult<String> {
        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(CheezyError::storage("address lookup failed"));
        }
        let known = self
            .blobs
            .lock()
            .map(|b| b.contains_key(path))
            .unwrap_or(false);
        if !known {
            return Err(CheezyError::storage(format!("No blob stored at {path}")));
        }
        Ok(format!("{}/{path}", self.base_url))
    }
}

/// Record store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    hub: Arc<SnapshotHub>,
    fail_appends: AtomicBool,
    appends: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `append` fail.
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Successful appends so far.
    pub fn append_count(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    /// Write an entry verbatim, bypassing id assignment. Lets tests seed
    /// records written by other clients, malformed ones included.
    pub fn insert_raw(
        &self,
        collection: &str,
        id: impl Into<String>,
        fields: serde_json::Value,
    ) -> CheezyResult<()> {
        self.hub.insert(collection, id.into(), fields)
    }

    pub fn snapshot(&self, collection: &str) -> CheezyResult<Arc<Snapshot>> {
        self.hub.snapshot(collection)
    }

    pub fn active_subscribers(&self) -> usize {
        self.hub.active_subscribers()
    }

    pub fn released_subscribers(&self) -> usize {
        self.hub.released_subscribers()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn append(&self, collection: &str, fields: serde_json::Value) -> CheezyResult<String> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(CheezyError::storage("record store unavailable"));
        }
        let id = self.hub.next_id(collection)?;
        self.hub.insert(collection, id.clone(), fields)?;
        self.appends.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn subscribe(&self, collection: &str) -> CheezyResult<Subscription> {
        self.hub.subscribe(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cheezy_experience_model::MediaType;
    use serde_json::json;

    fn blob() -> MediaBlob {
        MediaBlob::new("a.mp4", "video/mp4", MediaType::Video, vec![1, 2, 3])
    }

    #[tokio::test]
    async fn test_blob_put_resolve_and_failures() {
        let store = MemoryBlobStore::new();
        store.put("experiences/a.mp4", &blob()).await.unwrap();
        assert_eq!(
            store.resolve_url("experiences/a.mp4").await.unwrap(),
            "mem://blobs/experiences/a.mp4"
        );
        assert!(store.put("experiences/a.mp4", &blob()).await.is_err());

        store.fail_puts(true);
        assert!(store.put("experiences/b.mp4", &blob()).await.is_err());
        store.fail_resolve(true);
        assert!(store.resolve_url("experiences/a.mp4").await.is_err());

        assert_eq!(store.put_count(), 1);
        assert_eq!(store.paths(), vec!["experiences/a.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_records_append_and_fail() {
        let store = MemoryRecordStore::new();
        let id = store.append("experiences", json!({ "url": "a" })).await.unwrap();
        assert_eq!(cheezy_experience_model::append_sequence(&id), Some(1));

        store.fail_appends(true);
        assert!(store.append("experiences", json!({ "url": "b" })).await.is_err());
        assert_eq!(store.append_count(), 1);
        assert_eq!(store.snapshot("experiences").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_accounting() {
        let store = MemoryRecordStore::new();
        let mut first = store.subscribe("experiences").unwrap();
        let second = store.subscribe("experiences").unwrap();
        assert_eq!(store.active_subscribers(), 2);

        first.unsubscribe();
        first.unsubscribe();
        drop(second);
        assert_eq!(store.active_subscribers(), 0);
        assert_eq!(store.released_subscribers(), 2);
    }
}

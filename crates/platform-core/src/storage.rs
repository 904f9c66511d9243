//! Blob storage and shared record store capabilities.

use std::sync::Arc;

use cheezy_common::error::CheezyResult;
use cheezy_experience_model::{MediaBlob, Snapshot};
use tokio::sync::watch;

/// Write-once object storage.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `blob` at `path`. Choosing a unique path is the caller's job.
    async fn put(&self, path: &str, blob: &MediaBlob) -> CheezyResult<()>;

    /// Public address of a stored blob.
    async fn resolve_url(&self, path: &str) -> CheezyResult<String>;
}

/// Append-only collection store with live snapshots.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Append a record and return the id the store assigned to it.
    async fn append(&self, collection: &str, fields: serde_json::Value) -> CheezyResult<String>;

    /// Watch a collection. The first snapshot is the current contents.
    fn subscribe(&self, collection: &str) -> CheezyResult<Subscription>;
}

type Release = Box<dyn FnOnce() + Send>;

/// A standing subscription to one collection.
///
/// Dropping the subscription, or calling [`Subscription::unsubscribe`],
/// releases it with the store. Release happens exactly once.
pub struct Subscription {
    collection: String,
    rx: watch::Receiver<Arc<Snapshot>>,
    initial_pending: bool,
    release: Option<Release>,
}

impl Subscription {
    /// `release` runs once when the subscription is torn down.
    pub fn new(
        collection: impl Into<String>,
        rx: watch::Receiver<Arc<Snapshot>>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            collection: collection.into(),
            rx,
            initial_pending: true,
            release: Some(Box::new(release)),
        }
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once unsubscribed or when the store goes away.
    /// Snapshots published faster than they are read collapse into the
    /// latest one, which always carries the full collection.
    pub async fn next(&mut self) -> Option<Arc<Snapshot>> {
        if self.release.is_none() {
            return None;
        }
        if self.initial_pending {
            self.initial_pending = false;
            return Some(self.rx.borrow_and_update().clone());
        }
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// Tear the subscription down. Later calls do nothing.
    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            tracing::debug!(collection = %self.collection, "Subscription released");
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .field("active", &self.is_active())
            .finish()
    }
}

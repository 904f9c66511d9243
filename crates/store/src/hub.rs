//! Snapshot fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use cheezy_common::error::{CheezyError, CheezyResult};
use cheezy_experience_model::{append_sequence, record_id, Snapshot};
use cheezy_platform_core::Subscription;
use tokio::sync::watch;

/// Current contents of every collection plus their subscribers.
///
/// Each collection lives in a watch channel: the channel value is the
/// snapshot, and every change notifies all receivers with the full
/// collection.
#[derive(Debug, Default)]
pub struct SnapshotHub {
    channels: Mutex<HashMap<String, watch::Sender<Arc<Snapshot>>>>,
    active: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CheezyResult<MutexGuard<'_, HashMap<String, watch::Sender<Arc<Snapshot>>>>> {
        self.channels
            .lock()
            .map_err(|_| CheezyError::storage("snapshot hub lock poisoned"))
    }

    /// Whether the collection has been loaded or written to.
    pub fn contains(&self, collection: &str) -> bool {
        self.lock().map(|c| c.contains_key(collection)).unwrap_or(false)
    }

    /// Current contents of a collection (empty if unknown).
    pub fn snapshot(&self, collection: &str) -> CheezyResult<Arc<Snapshot>> {
        Ok(self
            .lock()?
            .get(collection)
            .map(|tx| tx.borrow().clone())
            .unwrap_or_default())
    }

    /// Next id for a collection: one past the largest append sequence
    /// present, plus a fresh nonce.
    ///
    /// Writers that cannot see each other's latest appends may pick the same
    /// sequence; the nonce keeps their ids apart.
    pub fn next_id(&self, collection: &str) -> CheezyResult<String> {
        let snapshot = self.snapshot(collection)?;
        let next = snapshot
            .keys()
            .filter_map(|id| append_sequence(id))
            .max()
            .unwrap_or(0)
            + 1;
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        Ok(record_id(next, &nonce))
    }

    /// Add one record and notify subscribers.
    pub fn insert(&self, collection: &str, id: String, fields: serde_json::Value) -> CheezyResult<()> {
        let mut channels = self.lock()?;
        let tx = channels
            .entry(collection.to_string())
            .or_insert_with(|| watch::channel(Arc::new(Snapshot::new())).0);
        tx.send_modify(|snapshot| {
            Arc::make_mut(snapshot).insert(id, fields);
        });
        Ok(())
    }

    /// Replace a collection's contents. Subscribers are notified only when
    /// the contents actually changed. Returns whether they did.
    pub fn replace(&self, collection: &str, snapshot: Snapshot) -> CheezyResult<bool> {
        let mut channels = self.lock()?;
        match channels.get(collection) {
            Some(tx) => Ok(tx.send_if_modified(|current| {
                if **current == snapshot {
                    false
                } else {
                    *current = Arc::new(snapshot);
                    true
                }
            })),
            None => {
                let (tx, _) = watch::channel(Arc::new(snapshot));
                channels.insert(collection.to_string(), tx);
                Ok(true)
            }
        }
    }

    /// Start watching a collection.
    pub fn subscribe(&self, collection: &str) -> CheezyResult<Subscription> {
        let rx = {
            let mut channels = self.lock()?;
            channels
                .entry(collection.to_string())
                .or_insert_with(|| watch::channel(Arc::new(Snapshot::new())).0)
                .subscribe()
        };

        self.active.fetch_add(1, Ordering::SeqCst);
        let active = self.active.clone();
        let released = self.released.clone();
        tracing::debug!(collection, "Subscriber added");
        Ok(Subscription::new(collection, rx, move || {
            active.fetch_sub(1, Ordering::SeqCst);
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }

    /// Subscriptions currently open.
    pub fn active_subscribers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Subscriptions torn down so far.
    pub fn released_subscribers(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

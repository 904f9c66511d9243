//! Cheezy Feed Sync
//!
//! Keeps a local, sorted view of the shared experience collection. While
//! active, every snapshot the store delivers replaces the whole view at
//! once; readers get the latest [`FeedView`] through a watch channel and
//! never see a half-applied update.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cheezy_common::error::{CheezyError, CheezyResult};
use cheezy_experience_model::{FeedView, Snapshot};
use cheezy_platform_core::{RecordStore, Subscription};
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct Shared {
    collection: String,
    view: watch::Sender<Arc<FeedView>>,
    applied: AtomicU64,
}

impl Shared {
    fn apply(&self, snapshot: &Snapshot) {
        let view = FeedView::from_snapshot(snapshot);
        for error in malformed_records(&view) {
            tracing::warn!(collection = %self.collection, error = %error, "Skipping malformed record");
        }
        tracing::debug!(
            collection = %self.collection,
            items = view.len(),
            skipped = view.rejected().len(),
            "Feed view replaced"
        );
        self.view.send_replace(Arc::new(view));
        self.applied.fetch_add(1, Ordering::SeqCst);
    }
}

/// Subscriber that owns the feed contents.
pub struct FeedSync {
    records: Arc<dyn RecordStore>,
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl FeedSync {
    pub fn new(records: Arc<dyn RecordStore>, collection: impl Into<String>) -> Self {
        let (view, _) = watch::channel(Arc::new(FeedView::empty()));
        Self {
            records,
            shared: Arc::new(Shared {
                collection: collection.into(),
                view,
                applied: AtomicU64::new(0),
            }),
            task: None,
        }
    }

    pub fn collection(&self) -> &str {
        &self.shared.collection
    }

    /// Subscribe to the collection and start following it.
    ///
    /// Must be called from within a tokio runtime. Calling it while already
    /// active does nothing.
    pub fn activate(&mut self) -> CheezyResult<()> {
        if self.is_active() {
            return Ok(());
        }
        let subscription = self.records.subscribe(&self.shared.collection)?;
        tracing::info!(collection = %self.shared.collection, "Feed sync activated");
        self.task = Some(tokio::spawn(follow(subscription, self.shared.clone())));
        Ok(())
    }

    /// Stop following the collection.
    ///
    /// The subscription is released before this returns, and the view no
    /// longer changes afterwards. Calling it again does nothing.
    pub async fn deactivate(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.abort();
        let _ = task.await;
        tracing::info!(collection = %self.shared.collection, "Feed sync deactivated");
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Replace the view from a snapshot directly.
    pub fn apply_snapshot(&self, snapshot: &Snapshot) {
        self.shared.apply(snapshot);
    }

    /// Latest view.
    pub fn view(&self) -> Arc<FeedView> {
        self.shared.view.borrow().clone()
    }

    /// Receiver that is notified on every view replacement.
    pub fn watch(&self) -> watch::Receiver<Arc<FeedView>> {
        self.shared.view.subscribe()
    }

    /// Records the latest view left out, as [`CheezyError::MalformedRecord`].
    pub fn skipped(&self) -> Vec<CheezyError> {
        malformed_records(&self.view())
    }

    /// Snapshots applied since creation.
    pub fn updates_applied(&self) -> u64 {
        self.shared.applied.load(Ordering::SeqCst)
    }
}

impl Drop for FeedSync {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn malformed_records(view: &FeedView) -> Vec<CheezyError> {
    view.rejected()
        .iter()
        .map(|r| CheezyError::malformed(&r.id, r.reason.to_string()))
        .collect()
}

async fn follow(mut subscription: Subscription, shared: Arc<Shared>) {
    while let Some(snapshot) = subscription.next().await {
        shared.apply(&snapshot);
    }
    tracing::debug!(collection = %shared.collection, "Feed subscription closed");
}

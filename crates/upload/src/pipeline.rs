//! The two-phase upload write.

use std::sync::Arc;

use cheezy_common::clock::{Clock, SystemClock};
use cheezy_common::config::StorageConfig;
use cheezy_common::error::{CheezyError, CheezyResult, UploadPhase};
use cheezy_common::notice::{Notice, Notifier, TracingNotifier};
use cheezy_experience_model::{MediaBlob, NewExperience, TimestampMs};
use cheezy_platform_core::{BlobStore, RecordStore};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::path::storage_path;

pub const UPLOAD_SUCCEEDED: &str = "Experience uploaded successfully";
pub const UPLOAD_FAILED: &str = "Upload failed";

/// What a successful upload produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    /// Id the record store assigned.
    pub id: String,
    /// Where the blob was stored.
    pub path: String,
    /// Resolved address recorded as `url`.
    pub url: String,
    pub created_at: TimestampMs,
}

/// Writes blobs and their metadata.
///
/// Cheap to clone; clones share the stores. Calls hold no state between
/// them, so independent uploads may run concurrently.
#[derive(Clone)]
pub struct UploadPipeline {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    collection: String,
    blob_prefix: String,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl UploadPipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
        storage: &StorageConfig,
    ) -> Self {
        Self {
            blobs,
            records,
            collection: storage.collection.clone(),
            blob_prefix: storage.blob_prefix.clone(),
            clock: Arc::new(SystemClock),
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Store `blob`, then record it with the optional author fields.
    ///
    /// Any failure produces exactly one failure notice and an
    /// [`CheezyError::UploadFailure`] naming the phase. Nothing is retried.
    pub async fn upload(
        &self,
        blob: &MediaBlob,
        name: Option<String>,
        caption: Option<String>,
    ) -> CheezyResult<UploadReceipt> {
        match self.write(blob, name, caption).await {
            Ok(receipt) => {
                tracing::info!(
                    id = %receipt.id,
                    path = %receipt.path,
                    media = blob.media_type.as_str(),
                    bytes = blob.len(),
                    "Upload complete"
                );
                self.notifier.notify(Notice::success(UPLOAD_SUCCEEDED));
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!(file = %blob.file_name, error = %e, "Upload failed");
                self.notifier.notify(Notice::failure(UPLOAD_FAILED));
                Err(e)
            }
        }
    }

    async fn write(
        &self,
        blob: &MediaBlob,
        name: Option<String>,
        caption: Option<String>,
    ) -> CheezyResult<UploadReceipt> {
        if blob.is_empty() {
            return Err(CheezyError::upload(UploadPhase::Storage, "media is empty"));
        }

        let created_at = self.clock.now_ms();
        let path = storage_path(&self.blob_prefix, created_at, &blob.file_name);

        // Phase 1: blob and its address.
        self.blobs
            .put(&path, blob)
            .await
            .map_err(|e| CheezyError::upload(UploadPhase::Storage, e.to_string()))?;
        let url = self
            .blobs
            .resolve_url(&path)
            .await
            .map_err(|e| CheezyError::upload(UploadPhase::Storage, e.to_string()))?;

        // Phase 2: metadata. A failure here leaves the blob orphaned.
        let record = NewExperience::new(blob.media_type, url.clone(), name, caption, created_at);
        let fields = record
            .to_fields()
            .map_err(|e| CheezyError::upload(UploadPhase::Metadata, e.to_string()))?;
        let id = self
            .records
            .append(&self.collection, fields)
            .await
            .map_err(|e| {
                tracing::warn!(path = %path, "Blob stored without a record");
                CheezyError::upload(UploadPhase::Metadata, e.to_string())
            })?;

        Ok(UploadReceipt {
            id,
            path,
            url,
            created_at,
        })
    }

    /// Upload every blob from `finished` until the channel closes, each
    /// with the same author fields.
    ///
    /// Blobs are uploaded one after another in arrival order. Failures are
    /// reported through the notifier and do not stop the loop.
    pub async fn consume(
        &self,
        mut finished: mpsc::UnboundedReceiver<MediaBlob>,
        name: Option<String>,
        caption: Option<String>,
    ) -> Vec<CheezyResult<UploadReceipt>> {
        let mut results = Vec::new();
        while let Some(blob) = finished.recv().await {
            results.push(self.upload(&blob, name.clone(), caption.clone()).await);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cheezy_common::clock::ManualClock;
    use cheezy_common::notice::CollectingNotifier;
    use cheezy_experience_model::{Experience, MediaType};
    use cheezy_store::{MemoryBlobStore, MemoryRecordStore};

    struct Harness {
        blobs: Arc<MemoryBlobStore>,
        records: Arc<MemoryRecordStore>,
        notices: Arc<CollectingNotifier>,
        pipeline: UploadPipeline,
    }

    fn harness() -> Harness {
        let blobs = Arc::new(MemoryBlobStore::new());
        let records = Arc::new(MemoryRecordStore::new());
        let notices = Arc::new(CollectingNotifier::new());
        let pipeline = UploadPipeline::new(blobs.clone(), records.clone(), &StorageConfig::default())
            .with_clock(Arc::new(ManualClock::new(1_000)))
            .with_notifier(notices.clone());
        Harness {
            blobs,
            records,
            notices,
            pipeline,
        }
    }

    fn photo() -> MediaBlob {
        MediaBlob::new("photo_1.png", "image/png", MediaType::Image, vec![0x89, b'P'])
    }

    #[tokio::test]
    async fn test_successful_upload_writes_blob_then_record() {
        let h = harness();
        let receipt = h
            .pipeline
            .upload(&photo(), Some("Ana".into()), Some("hi".into()))
            .await
            .unwrap();

        assert_eq!(receipt.created_at, 1_000);
        assert!(receipt.path.starts_with("experiences/1000_"));
        assert!(receipt.path.ends_with("_photo_1.png"));
        assert_eq!(receipt.url, format!("mem://blobs/{}", receipt.path));

        let snapshot = h.records.snapshot("experiences").unwrap();
        let stored = Experience::from_record(&receipt.id, &snapshot[&receipt.id]).unwrap();
        assert_eq!(stored.media_type, MediaType::Image);
        assert_eq!(stored.url, receipt.url);
        assert_eq!(stored.name.as_deref(), Some("Ana"));
        assert_eq!(stored.caption.as_deref(), Some("hi"));

        assert_eq!(h.notices.notices(), vec![Notice::success(UPLOAD_SUCCEEDED)]);
    }

    #[tokio::test]
    async fn test_storage_failure_skips_metadata() {
        let h = harness();
        h.blobs.fail_puts(true);

        let err = h.pipeline.upload(&photo(), None, None).await.unwrap_err();
        assert!(matches!(
            err,
            CheezyError::UploadFailure {
                phase: UploadPhase::Storage,
                ..
            }
        ));
        assert_eq!(h.records.append_count(), 0);
        assert_eq!(h.notices.failures(), vec![Notice::failure(UPLOAD_FAILED)]);
        assert_eq!(h.notices.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_address_skips_metadata() {
        let h = harness();
        h.blobs.fail_resolve(true);

        let err = h.pipeline.upload(&photo(), None, None).await.unwrap_err();
        assert!(err.is_upload_failure());
        assert_eq!(h.blobs.put_count(), 1);
        assert_eq!(h.records.append_count(), 0);
    }

    #[tokio::test]
    async fn test_metadata_failure_orphans_blob() {
        let h = harness();
        h.records.fail_appends(true);

        let err = h.pipeline.upload(&photo(), None, None).await.unwrap_err();
        assert!(matches!(
            err,
            CheezyError::UploadFailure {
                phase: UploadPhase::Metadata,
                ..
            }
        ));
        assert_eq!(h.blobs.put_count(), 1);
        assert!(h.records.snapshot("experiences").unwrap().is_empty());
        assert_eq!(h.notices.notices(), vec![Notice::failure(UPLOAD_FAILED)]);
    }

    #[tokio::test]
    async fn test_empty_media_is_rejected_before_storage() {
        let h = harness();
        let empty = MediaBlob::new("x.png", "image/png", MediaType::Image, Vec::new());
        assert!(h.pipeline.upload(&empty, None, None).await.is_err());
        assert_eq!(h.blobs.put_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_uploads_are_independent() {
        let h = harness();
        let a = h.pipeline.clone();
        let b = h.pipeline.clone();
        let blob = photo();

        let (ra, rb) = tokio::join!(a.upload(&blob, None, None), b.upload(&blob, None, None));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());
        assert_ne!(ra.id, rb.id);
        assert_ne!(ra.path, rb.path);
        assert_eq!(h.records.append_count(), 2);
    }

    #[tokio::test]
    async fn test_consume_uploads_until_channel_closes() {
        let h = harness();
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(photo()).unwrap();
        tx.send(photo()).unwrap();
        drop(tx);

        let results = h.pipeline.consume(rx, Some("Ana".into()), None).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Result::is_ok));
    }
}

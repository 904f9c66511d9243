//! Capture → upload → shared store → feed, end to end.

use std::sync::Arc;
use std::time::Duration;

use cheezy_capture_engine::backend::SyntheticDevices;
use cheezy_capture_engine::{
    CaptureConfig, CaptureController, CaptureKind, CaptureSession, CaptureState,
};
use cheezy_common::clock::ManualClock;
use cheezy_common::config::StorageConfig;
use cheezy_common::notice::{CollectingNotifier, Notice};
use cheezy_experience_model::{MediaBlob, MediaType};
use cheezy_feed_sync::FeedSync;
use cheezy_store::{FileBlobStore, JsonlRecordStore, MemoryBlobStore, MemoryRecordStore};
use cheezy_upload::pipeline::{UPLOAD_FAILED, UPLOAD_SUCCEEDED};
use cheezy_upload::UploadPipeline;

async fn wait_for_len(feed: &FeedSync, len: usize) {
    let mut updates = feed.watch();
    while feed.view().len() < len {
        updates.changed().await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn forced_stop_uploads_once_and_reaches_feed() {
    let devices = SyntheticDevices::new(64, 48);
    let blobs = Arc::new(MemoryBlobStore::new());
    let records = Arc::new(MemoryRecordStore::new());
    let notices = Arc::new(CollectingNotifier::new());
    let storage = StorageConfig::default();

    let pipeline = UploadPipeline::new(blobs.clone(), records.clone(), &storage)
        .with_clock(Arc::new(ManualClock::new(1_718_000_000_000)))
        .with_notifier(notices.clone());

    let mut feed = FeedSync::new(records.clone(), storage.collection.clone());
    feed.activate().unwrap();

    let mut config = CaptureConfig::default();
    config.settings.warmup_ms = 0;
    let controller = CaptureController::new(Arc::new(devices.clone()), config);
    let (mut handle, finished, session) = CaptureSession::spawn(controller);
    let uploader = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            pipeline
                .consume(finished, Some("Ana".into()), Some("forty seconds".into()))
                .await
        })
    };

    handle.open(CaptureKind::Video).await.unwrap();
    handle.wait_for(CaptureState::Previewing).await.unwrap();
    let started = tokio::time::Instant::now();
    handle.start_recording().await.unwrap();
    handle.wait_for(CaptureState::Recording).await.unwrap();

    // Never stopped by hand: the cap ends it.
    handle.wait_for(CaptureState::Idle).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(40));
    wait_for_len(&feed, 1).await;

    tokio::time::sleep(Duration::from_secs(120)).await;
    drop(handle);
    session.await.unwrap();

    let results = uploader.await.unwrap();
    assert_eq!(results.len(), 1);
    let receipt = results.into_iter().next().unwrap().unwrap();
    assert_eq!(blobs.put_count(), 1);
    assert_eq!(records.append_count(), 1);

    let view = feed.view();
    assert_eq!(view.len(), 1);
    let experience = &view.items()[0];
    assert_eq!(experience.id, receipt.id);
    assert_eq!(experience.media_type, MediaType::Video);
    assert_eq!(experience.url, receipt.url);
    assert_eq!(experience.name.as_deref(), Some("Ana"));
    assert_eq!(experience.caption.as_deref(), Some("forty seconds"));
    assert_eq!(experience.created_at, 1_718_000_000_000);

    let stored = blobs.get(&receipt.path).unwrap();
    assert!(stored.file_name.starts_with("video_"));
    assert!(stored.file_name.ends_with(".mp4"));

    assert_eq!(devices.tracks_released(), 1);
    assert_eq!(notices.notices(), vec![Notice::success(UPLOAD_SUCCEEDED)]);

    feed.deactivate().await;
    assert_eq!(records.active_subscribers(), 0);
}

#[tokio::test]
async fn file_backed_uploads_appear_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig {
        data_dir: dir.path().to_path_buf(),
        ..StorageConfig::default()
    };
    let blobs = Arc::new(FileBlobStore::new(&storage).unwrap());
    let records = Arc::new(JsonlRecordStore::new(&storage).unwrap());
    let clock = Arc::new(ManualClock::new(0));
    let pipeline =
        UploadPipeline::new(blobs, records.clone(), &storage).with_clock(clock.clone());

    let mut feed = FeedSync::new(records.clone(), storage.collection.clone());
    feed.activate().unwrap();

    for (stamp, name) in [(100, "a.png"), (300, "b.png"), (200, "c.mp4")] {
        clock.set(stamp);
        let blob = MediaBlob::from_file(name, None, vec![1, 2, 3]);
        pipeline.upload(&blob, None, None).await.unwrap();
    }
    wait_for_len(&feed, 3).await;

    let view = feed.view();
    let stamps: Vec<i64> = view.iter().map(|e| e.created_at).collect();
    assert_eq!(stamps, vec![300, 200, 100]);
    assert_eq!(view.items()[1].media_type, MediaType::Video);
    for experience in view.iter() {
        assert!(experience.url.starts_with("file://"));
    }

    // A fresh process sees the same collection.
    let reopened = JsonlRecordStore::new(&storage).unwrap();
    let snapshot = reopened.snapshot(&storage.collection).unwrap();
    assert_eq!(snapshot.len(), 3);

    feed.deactivate().await;
}

#[tokio::test]
async fn failed_upload_leaves_feed_untouched() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let records = Arc::new(MemoryRecordStore::new());
    let notices = Arc::new(CollectingNotifier::new());
    let storage = StorageConfig::default();
    let pipeline = UploadPipeline::new(blobs.clone(), records.clone(), &storage)
        .with_notifier(notices.clone());

    let mut feed = FeedSync::new(records.clone(), storage.collection.clone());
    feed.activate().unwrap();

    records.fail_appends(true);
    let blob = MediaBlob::from_file("a.png", Some("image/png"), vec![7]);
    assert!(pipeline.upload(&blob, None, None).await.is_err());

    tokio::task::yield_now().await;
    assert!(feed.view().is_empty());
    assert_eq!(blobs.put_count(), 1);
    assert_eq!(notices.notices(), vec![Notice::failure(UPLOAD_FAILED)]);

    feed.deactivate().await;
}

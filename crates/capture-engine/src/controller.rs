//! Camera/recorder lifecycle.
//!
//! [`CaptureController`] owns the live stream and the active recorder. It
//! produces finished [`MediaBlob`]s and guarantees that the camera and
//! microphone are released exactly once per opened stream, whichever way
//! the capture ends: manual stop, forced stop at the recording cap, a
//! recorder failure, `close()`, or dropping the controller.

use std::sync::Arc;
use std::time::Duration;

use cheezy_common::clock::{Clock, RecordingClock, SystemClock};
use cheezy_common::config::{CaptureSettings, DevicePolicy};
use cheezy_common::error::{CheezyError, CheezyResult};
use cheezy_common::notice::{Notice, Notifier, TracingNotifier};
use cheezy_common::timer::ScheduledTask;
use cheezy_experience_model::{MediaBlob, MediaType};
use cheezy_platform_core::{MediaDevices, MediaPicker, MediaRecorder, MediaStream};
use tokio::sync::mpsc;

use crate::state::{CaptureEvent, CaptureKind, CaptureState};
use crate::still::encode_png;

/// Message shown when the camera cannot be opened.
pub const CAMERA_UNAVAILABLE: &str = "Camera access denied or unavailable";

/// Identifies one recording so a late forced-stop cannot hit the next one.
pub type RecordingId = u64;

/// Result of [`CaptureController::open`].
#[derive(Debug)]
pub enum OpenOutcome {
    /// The in-app camera is live.
    Previewing,
    /// Capture went to the native picker; `None` if the user cancelled.
    Delegated(Option<MediaBlob>),
}

/// Settings the controller is built with.
#[derive(Debug, Clone, Default)]
pub struct CaptureConfig {
    pub settings: CaptureSettings,
    pub policy: DevicePolicy,
}

/// Holds a stream and stops its tracks exactly once.
struct StreamGuard {
    stream: Option<Box<dyn MediaStream>>,
}

impl StreamGuard {
    fn new(stream: Box<dyn MediaStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    fn stream_mut(&mut self) -> CheezyResult<&mut Box<dyn MediaStream>> {
        self.stream
            .as_mut()
            .ok_or_else(|| CheezyError::capture("stream already released"))
    }

    fn release(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop_tracks();
                tracing::debug!(stream = %stream.id(), "Device tracks released");
                true
            }
            None => false,
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.release();
    }
}

struct ActiveRecording {
    id: RecordingId,
    recorder: Box<dyn MediaRecorder>,
    chunks: mpsc::UnboundedReceiver<Vec<u8>>,
    deadline: ScheduledTask,
    clock: RecordingClock,
}

/// Owns the camera/microphone handle and the active recorder.
pub struct CaptureController {
    devices: Arc<dyn MediaDevices>,
    picker: Option<Arc<dyn MediaPicker>>,
    config: CaptureConfig,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    state: CaptureState,
    stream: Option<StreamGuard>,
    recording: Option<ActiveRecording>,
    next_recording_id: RecordingId,
    timeouts_tx: mpsc::UnboundedSender<RecordingId>,
    timeouts_rx: mpsc::UnboundedReceiver<RecordingId>,
}

impl CaptureController {
    pub fn new(devices: Arc<dyn MediaDevices>, config: CaptureConfig) -> Self {
        let (timeouts_tx, timeouts_rx) = mpsc::unbounded_channel();
        Self {
            devices,
            picker: None,
            config,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(TracingNotifier),
            state: CaptureState::Idle,
            stream: None,
            recording: None,
            next_recording_id: 1,
            timeouts_tx,
            timeouts_rx,
        }
    }

    pub fn with_picker(mut self, picker: Arc<dyn MediaPicker>) -> Self {
        self.picker = Some(picker);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Current state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Whether a live stream is currently held.
    pub fn holds_hardware(&self) -> bool {
        self.stream.as_ref().is_some_and(|g| g.stream.is_some())
    }

    /// Id of the recording in progress, if any.
    pub fn active_recording(&self) -> Option<RecordingId> {
        self.recording.as_ref().map(|r| r.id)
    }

    fn transition(&mut self, event: CaptureEvent) -> CheezyResult<()> {
        let next = self.state.on(event)?;
        if next != self.state {
            tracing::debug!(from = ?self.state, to = ?next, ?event, "Capture state change");
        }
        self.state = next;
        Ok(())
    }

    fn fail(&self, message: &str) {
        self.notifier.notify(Notice::failure(message));
    }

    /// Open the camera (and microphone for video).
    ///
    /// When the device policy delegates capture to the native picker, the
    /// camera is left alone and the picked file is returned instead.
    pub async fn open(&mut self, kind: CaptureKind) -> CheezyResult<OpenOutcome> {
        if !self.state.accepts(CaptureEvent::Open) {
            return Err(CheezyError::invalid_transition(self.state, CaptureEvent::Open));
        }

        if self.config.policy.uses_native_picker() {
            return self.delegate_to_picker(kind).await;
        }

        self.transition(CaptureEvent::Open)?;
        tracing::info!(?kind, backend = %self.devices.name(), "Requesting media access");

        match self.devices.request_stream(kind.constraints()).await {
            Ok(stream) => {
                tracing::info!(stream = %stream.id(), "Media access granted");
                self.stream = Some(StreamGuard::new(stream));
                let warmup = self.config.settings.warmup_ms;
                if warmup > 0 {
                    tokio::time::sleep(Duration::from_millis(warmup)).await;
                }
                self.transition(CaptureEvent::PermissionGranted)?;
                Ok(OpenOutcome::Previewing)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Media access failed");
                self.transition(CaptureEvent::PermissionDenied)?;
                self.fail(CAMERA_UNAVAILABLE);
                Err(CheezyError::permission_denied(e.to_string()))
            }
        }
    }

    async fn delegate_to_picker(&mut self, kind: CaptureKind) -> CheezyResult<OpenOutcome> {
        let Some(picker) = self.picker.clone() else {
            self.fail(CAMERA_UNAVAILABLE);
            return Err(CheezyError::unsupported(
                "device policy requires the native picker but none is available",
            ));
        };

        tracing::info!(?kind, "Delegating capture to native picker");
        match picker.pick().await {
            Ok(picked) => {
                if picked.is_none() {
                    tracing::info!("Native picker cancelled");
                }
                Ok(OpenOutcome::Delegated(picked))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Native picker failed");
                self.fail(CAMERA_UNAVAILABLE);
                Err(e)
            }
        }
    }

    /// Sample the current preview frame into a PNG still.
    pub fn capture_photo(&mut self) -> CheezyResult<MediaBlob> {
        self.state.on(CaptureEvent::CapturePhoto)?;

        let fallback = (
            self.config.settings.fallback_width,
            self.config.settings.fallback_height,
        );
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| CheezyError::capture("no live stream"))?
            .stream_mut()?;
        let (width, height) = stream
            .dimensions()
            .filter(|(w, h)| *w > 0 && *h > 0)
            .unwrap_or(fallback);

        let frame = stream
            .sample_frame(width, height)
            .map_err(|e| CheezyError::capture(format!("Failed to sample frame: {e}")))?;
        let png = encode_png(frame)?;

        let name = format!("photo_{}.png", self.clock.now_ms());
        tracing::info!(file = %name, width, height, bytes = png.len(), "Photo captured");
        Ok(MediaBlob::new(
            name,
            self.config.settings.photo_mime.clone(),
            MediaType::Image,
            png,
        ))
    }

    /// Start recording and arm the forced stop at the recording cap.
    pub fn start_recording(&mut self) -> CheezyResult<RecordingId> {
        self.state.on(CaptureEvent::StartRecording)?;

        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| CheezyError::capture("no live stream"))?
            .stream_mut()?;
        let mut recorder = stream
            .create_recorder(&self.config.settings.video_mime)
            .map_err(|e| CheezyError::capture(format!("Failed to create recorder: {e}")))?;

        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        recorder
            .start(chunk_tx)
            .map_err(|e| CheezyError::capture(format!("Failed to start recorder: {e}")))?;

        let id = self.next_recording_id;
        self.next_recording_id += 1;

        let cap = Duration::from_secs(self.config.settings.max_recording_secs);
        let timeouts = self.timeouts_tx.clone();
        let deadline = ScheduledTask::after("recording-cap", cap, async move {
            let _ = timeouts.send(id);
        });

        self.recording = Some(ActiveRecording {
            id,
            recorder,
            chunks: chunk_rx,
            deadline,
            clock: RecordingClock::start(),
        });
        self.transition(CaptureEvent::StartRecording)?;
        tracing::info!(recording = id, cap_secs = cap.as_secs(), "Recording started");
        Ok(id)
    }

    /// Stop recording, assemble the chunks into one blob, and release the
    /// device.
    pub fn stop_recording(&mut self) -> CheezyResult<MediaBlob> {
        self.state.on(CaptureEvent::StopRecording)?;
        let Some(mut recording) = self.recording.take() else {
            return Err(CheezyError::capture("no recorder attached"));
        };
        recording.deadline.cancel();

        if let Err(e) = recording.recorder.stop() {
            tracing::error!(recording = recording.id, error = %e, "Recorder failed to stop");
            self.release_hardware();
            self.transition(CaptureEvent::RecorderFailed)?;
            self.fail("Recording failed");
            return Err(CheezyError::capture(format!("Recorder failed: {e}")));
        }
        self.transition(CaptureEvent::StopRecording)?;

        let mut data = Vec::new();
        let mut chunk_count = 0usize;
        while let Ok(chunk) = recording.chunks.try_recv() {
            if chunk.is_empty() {
                continue;
            }
            chunk_count += 1;
            data.extend_from_slice(&chunk);
        }
        let mime = recording.recorder.mime_type().to_string();
        let duration_secs = recording.clock.elapsed_secs();
        drop(recording);

        self.release_hardware();
        self.transition(CaptureEvent::Finalized)?;

        if data.is_empty() {
            self.fail("Recording produced no data");
            return Err(CheezyError::capture("recording produced no data"));
        }

        let name = format!("video_{}.mp4", self.clock.now_ms());
        tracing::info!(
            file = %name,
            chunks = chunk_count,
            bytes = data.len(),
            duration_secs,
            "Recording finalized"
        );
        Ok(MediaBlob::new(name, mime, MediaType::Video, data))
    }

    /// Wait for the next forced-stop expiry.
    pub async fn next_timeout(&mut self) -> Option<RecordingId> {
        self.timeouts_rx.recv().await
    }

    /// Handle a forced-stop expiry. A stale id (the recording was already
    /// stopped, or another one started since) is ignored.
    pub fn on_recording_timeout(&mut self, id: RecordingId) -> CheezyResult<Option<MediaBlob>> {
        let current = self.active_recording();
        if self.state != CaptureState::Recording || current != Some(id) {
            tracing::debug!(recording = id, ?current, "Stale recording cap ignored");
            return Ok(None);
        }
        tracing::info!(recording = id, "Recording cap reached, forcing stop");
        self.stop_recording().map(Some)
    }

    /// Tear the capture view down from any state. Discards an unfinished
    /// recording and releases the device synchronously.
    pub fn close(&mut self) {
        if let Some(mut recording) = self.recording.take() {
            recording.deadline.cancel();
            if let Err(e) = recording.recorder.stop() {
                tracing::debug!(error = %e, "Recorder stop during close failed");
            }
            tracing::info!(recording = recording.id, "Recording discarded");
        }
        self.release_hardware();
        if let Err(e) = self.transition(CaptureEvent::Close) {
            tracing::warn!(error = %e, "Close transition rejected");
        }
    }

    /// Leave the error state.
    pub fn reset(&mut self) -> CheezyResult<()> {
        self.transition(CaptureEvent::Reset)
    }

    fn release_hardware(&mut self) {
        if let Some(mut guard) = self.stream.take() {
            guard.release();
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        if self.recording.is_some() || self.holds_hardware() {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SyntheticDevices;
    use cheezy_common::clock::ManualClock;
    use cheezy_common::notice::CollectingNotifier;

    fn controller(devices: &SyntheticDevices) -> CaptureController {
        let mut config = CaptureConfig::default();
        config.settings.warmup_ms = 0;
        CaptureController::new(Arc::new(devices.clone()), config)
            .with_clock(Arc::new(ManualClock::new(1_700_000_000_000)))
    }

    #[tokio::test]
    async fn test_open_grants_and_previews() {
        let devices = SyntheticDevices::new(320, 240);
        let mut ctrl = controller(&devices);

        let outcome = ctrl.open(CaptureKind::Video).await.unwrap();
        assert!(matches!(outcome, OpenOutcome::Previewing));
        assert_eq!(ctrl.state(), CaptureState::Previewing);
        assert!(ctrl.holds_hardware());
        assert_eq!(devices.last_constraints().map(|c| c.audio), Some(true));
    }

    #[tokio::test]
    async fn test_denied_permission_lands_in_error_and_notifies() {
        let devices = SyntheticDevices::denying();
        let notifier = Arc::new(CollectingNotifier::new());
        let mut ctrl = controller(&devices).with_notifier(notifier.clone());

        let err = ctrl.open(CaptureKind::Photo).await.unwrap_err();
        assert!(matches!(err, CheezyError::PermissionDenied { .. }));
        assert_eq!(ctrl.state(), CaptureState::Error);
        assert!(!ctrl.holds_hardware());
        assert_eq!(notifier.failures(), vec![Notice::failure(CAMERA_UNAVAILABLE)]);

        ctrl.reset().unwrap();
        assert_eq!(ctrl.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_missing_hardware_is_reported_like_denial() {
        let devices = SyntheticDevices::without_hardware();
        let mut ctrl = controller(&devices);
        assert!(matches!(
            ctrl.open(CaptureKind::Video).await,
            Err(CheezyError::PermissionDenied { .. })
        ));
        assert_eq!(devices.streams_opened(), 0);
    }

    #[tokio::test]
    async fn test_photo_uses_fallback_size_and_keeps_previewing() {
        let devices = SyntheticDevices::new(0, 0);
        let mut ctrl = controller(&devices);
        ctrl.open(CaptureKind::Photo).await.unwrap();

        let blob = ctrl.capture_photo().unwrap();
        assert_eq!(blob.file_name, "photo_1700000000000.png");
        assert_eq!(blob.mime_type, "image/png");
        assert_eq!(blob.media_type, MediaType::Image);
        let decoded = image::load_from_memory(&blob.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (640, 480));
        assert_eq!(ctrl.state(), CaptureState::Previewing);

        ctrl.close();
        assert_eq!(devices.tracks_released(), 1);
    }

    #[tokio::test]
    async fn test_photo_rejected_outside_preview() {
        let devices = SyntheticDevices::new(8, 8);
        let mut ctrl = controller(&devices);
        assert!(matches!(
            ctrl.capture_photo(),
            Err(CheezyError::InvalidTransition { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_assembles_chunks_and_releases_once() {
        let devices = SyntheticDevices::new(64, 48);
        let mut ctrl = controller(&devices);
        ctrl.open(CaptureKind::Video).await.unwrap();
        ctrl.start_recording().unwrap();
        assert_eq!(ctrl.state(), CaptureState::Recording);

        tokio::time::sleep(Duration::from_secs(3)).await;
        let blob = ctrl.stop_recording().unwrap();

        assert_eq!(blob.media_type, MediaType::Video);
        assert_eq!(blob.mime_type, "video/mp4");
        assert_eq!(blob.file_name, "video_1700000000000.mp4");
        assert!(blob.data.starts_with(crate::backend::synthetic::CONTAINER_HEADER));
        assert_eq!(ctrl.state(), CaptureState::Idle);
        assert!(!ctrl.holds_hardware());

        drop(ctrl);
        assert_eq!(devices.tracks_released(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_stop_fires_at_cap() {
        let devices = SyntheticDevices::new(64, 48);
        let mut ctrl = controller(&devices);
        ctrl.open(CaptureKind::Video).await.unwrap();

        let started = tokio::time::Instant::now();
        let id = ctrl.start_recording().unwrap();
        let fired = ctrl.next_timeout().await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(fired, id);
        assert!(elapsed >= Duration::from_secs(40));
        assert!(elapsed < Duration::from_millis(40_010));

        let blob = ctrl.on_recording_timeout(fired).unwrap();
        assert!(blob.is_some());
        assert_eq!(ctrl.state(), CaptureState::Idle);
        assert_eq!(devices.tracks_released(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timeout_after_manual_stop_is_noop() {
        let devices = SyntheticDevices::new(64, 48);
        let mut ctrl = controller(&devices);
        ctrl.open(CaptureKind::Video).await.unwrap();
        let id = ctrl.start_recording().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        ctrl.stop_recording().unwrap();

        assert!(ctrl.on_recording_timeout(id).unwrap().is_none());
        assert_eq!(ctrl.state(), CaptureState::Idle);
        assert_eq!(devices.tracks_released(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_recording_discards_and_releases() {
        let devices = SyntheticDevices::new(64, 48);
        let mut ctrl = controller(&devices);
        ctrl.open(CaptureKind::Video).await.unwrap();
        ctrl.start_recording().unwrap();

        ctrl.close();
        ctrl.close();
        assert_eq!(ctrl.state(), CaptureState::Idle);
        assert_eq!(ctrl.active_recording(), None);
        assert_eq!(devices.tracks_released(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_failure_releases_and_errors() {
        let devices = SyntheticDevices::new(64, 48);
        devices.fail_recorder_stop(true);
        let notifier = Arc::new(CollectingNotifier::new());
        let mut ctrl = controller(&devices).with_notifier(notifier.clone());
        ctrl.open(CaptureKind::Video).await.unwrap();
        ctrl.start_recording().unwrap();

        assert!(ctrl.stop_recording().is_err());
        assert_eq!(ctrl.state(), CaptureState::Error);
        assert_eq!(devices.tracks_released(), 1);
        assert_eq!(notifier.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_dropping_previewing_controller_releases() {
        let devices = SyntheticDevices::new(8, 8);
        {
            let mut ctrl = controller(&devices);
            ctrl.open(CaptureKind::Photo).await.unwrap();
        }
        assert_eq!(devices.tracks_released(), 1);
    }

    #[tokio::test]
    async fn test_handheld_policy_delegates_to_picker() {
        struct OnePick;
        #[async_trait::async_trait]
        impl MediaPicker for OnePick {
            async fn pick(&self) -> CheezyResult<Option<MediaBlob>> {
                Ok(Some(MediaBlob::from_file("beach.mov", None, vec![1, 2, 3])))
            }
        }

        let devices = SyntheticDevices::new(8, 8);
        let mut config = CaptureConfig::default();
        config.policy = DevicePolicy::handheld();
        let mut ctrl = CaptureController::new(Arc::new(devices.clone()), config)
            .with_picker(Arc::new(OnePick));

        match ctrl.open(CaptureKind::Video).await.unwrap() {
            OpenOutcome::Delegated(Some(blob)) => {
                assert_eq!(blob.media_type, MediaType::Video);
            }
            other => panic!("expected picked blob, got {other:?}"),
        }
        assert_eq!(ctrl.state(), CaptureState::Idle);
        assert_eq!(devices.streams_opened(), 0);
    }

    #[tokio::test]
    async fn test_picker_policy_without_picker_is_unsupported() {
        let devices = SyntheticDevices::new(8, 8);
        let mut config = CaptureConfig::default();
        config.policy = DevicePolicy::handheld();
        let mut ctrl = CaptureController::new(Arc::new(devices), config);
        assert!(matches!(
            ctrl.open(CaptureKind::Photo).await,
            Err(CheezyError::Unsupported { .. })
        ));
    }
}

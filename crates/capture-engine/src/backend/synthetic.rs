//! Synthetic camera, microphone and recorder.
//!
//! Frames are a gradient that shifts with every sample. Recordings emit one
//! container header chunk on start and, on stop, one chunk per elapsed
//! second followed by an empty chunk. Elapsed time is read from the tokio
//! clock so paused-time tests are deterministic.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cheezy_platform_core::{
    ChunkSender, DeviceError, MediaDevices, MediaRecorder, MediaStream, RawFrame,
    StreamConstraints,
};
use tokio::time::Instant;

/// Leading bytes of every synthetic recording.
pub const CONTAINER_HEADER: &[u8] = b"\0\0\0\x18ftypmp42";

const CHUNK_BYTES: usize = 256;

#[derive(Debug, Default)]
struct Shared {
    deny: AtomicBool,
    no_hardware: AtomicBool,
    fail_recorder_stop: AtomicBool,
    streams_opened: AtomicUsize,
    tracks_released: AtomicUsize,
    frames_sampled: AtomicUsize,
    last_constraints: Mutex<Option<StreamConstraints>>,
}

/// In-process stand-in for the device's cameras and microphones.
#[derive(Debug, Clone)]
pub struct SyntheticDevices {
    width: u32,
    height: u32,
    shared: Arc<Shared>,
}

impl SyntheticDevices {
    /// A device whose stream reports `width` x `height`. Zero dimensions
    /// mimic a stream that has not reported its size yet.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            shared: Arc::new(Shared::default()),
        }
    }

    /// A device whose user declines every permission prompt.
    pub fn denying() -> Self {
        let devices = Self::new(640, 480);
        devices.set_deny(true);
        devices
    }

    /// A machine without a camera.
    pub fn without_hardware() -> Self {
        let devices = Self::new(640, 480);
        devices.shared.no_hardware.store(true, Ordering::SeqCst);
        devices
    }

    pub fn set_deny(&self, deny: bool) {
        self.shared.deny.store(deny, Ordering::SeqCst);
    }

    /// Make every recorder fail when stopped.
    pub fn fail_recorder_stop(&self, fail: bool) {
        self.shared.fail_recorder_stop.store(fail, Ordering::SeqCst);
    }

    /// Streams handed out so far.
    pub fn streams_opened(&self) -> usize {
        self.shared.streams_opened.load(Ordering::SeqCst)
    }

    /// Calls to `stop_tracks`, including repeated calls on the same stream.
    pub fn tracks_released(&self) -> usize {
        self.shared.tracks_released.load(Ordering::SeqCst)
    }

    pub fn frames_sampled(&self) -> usize {
        self.shared.frames_sampled.load(Ordering::SeqCst)
    }

    /// Streams opened and not yet released.
    pub fn live_streams(&self) -> usize {
        self.streams_opened().saturating_sub(self.tracks_released())
    }

    pub fn last_constraints(&self) -> Option<StreamConstraints> {
        self.shared.last_constraints.lock().ok().and_then(|c| *c)
    }
}

#[async_trait::async_trait]
impl MediaDevices for SyntheticDevices {
    async fn request_stream(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceError> {
        if let Ok(mut last) = self.shared.last_constraints.lock() {
            *last = Some(constraints);
        }
        if self.shared.no_hardware.load(Ordering::SeqCst) {
            return Err(DeviceError::NotFound("no synthetic camera attached".into()));
        }
        if self.shared.deny.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied(
                "user dismissed the permission prompt".into(),
            ));
        }

        let n = self.shared.streams_opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(SyntheticStream {
            id: format!("synthetic-{n}"),
            width: self.width,
            height: self.height,
            audio: constraints.audio,
            stopped: false,
            shared: self.shared.clone(),
        }))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

struct SyntheticStream {
    id: String,
    width: u32,
    height: u32,
    audio: bool,
    stopped: bool,
    shared: Arc<Shared>,
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }

    fn sample_frame(&mut self, width: u32, height: u32) -> Result<RawFrame, DeviceError> {
        if self.stopped {
            return Err(DeviceError::Failed("stream tracks are stopped".into()));
        }
        let phase = self.shared.frames_sampled.fetch_add(1, Ordering::SeqCst) as u32;
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let r = ((x + phase) * 255 / width.max(1)) as u8;
                let g = (y * 255 / height.max(1)) as u8;
                rgba.extend_from_slice(&[r, g, 0xc0, 0xff]);
            }
        }
        Ok(RawFrame {
            width,
            height,
            rgba,
        })
    }

    fn create_recorder(&mut self, mime_type: &str) -> Result<Box<dyn MediaRecorder>, DeviceError> {
        if self.stopped {
            return Err(DeviceError::Failed("stream tracks are stopped".into()));
        }
        Ok(Box::new(SyntheticRecorder {
            mime_type: mime_type.to_string(),
            with_audio: self.audio,
            started_at: None,
            sink: None,
            shared: self.shared.clone(),
        }))
    }

    fn stop_tracks(&mut self) {
        self.stopped = true;
        self.shared.tracks_released.fetch_add(1, Ordering::SeqCst);
    }
}

struct SyntheticRecorder {
    mime_type: String,
    with_audio: bool,
    started_at: Option<Instant>,
    sink: Option<ChunkSender>,
    shared: Arc<Shared>,
}

impl MediaRecorder for SyntheticRecorder {
    fn start(&mut self, chunks: ChunkSender) -> Result<(), DeviceError> {
        if self.started_at.is_some() {
            return Err(DeviceError::Failed("recorder already started".into()));
        }
        chunks
            .send(CONTAINER_HEADER.to_vec())
            .map_err(|_| DeviceError::Failed("chunk receiver dropped".into()))?;
        self.started_at = Some(Instant::now());
        self.sink = Some(chunks);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        let (Some(started_at), Some(sink)) = (self.started_at.take(), self.sink.take()) else {
            return Err(DeviceError::Failed("recorder is not running".into()));
        };
        if self.shared.fail_recorder_stop.load(Ordering::SeqCst) {
            return Err(DeviceError::Failed("encoder crashed".into()));
        }

        let seconds = started_at.elapsed().as_secs();
        let fill = if self.with_audio { 0xa5 } else { 0x5a };
        for second in 0..seconds {
            let mut chunk = vec![fill; CHUNK_BYTES];
            chunk[..8].copy_from_slice(&second.to_be_bytes());
            let _ = sink.send(chunk);
        }
        let _ = sink.send(Vec::new());
        Ok(())
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_denying_device_refuses_stream() {
        let devices = SyntheticDevices::denying();
        let err = devices
            .request_stream(StreamConstraints::video_only())
            .await
            .err()
            .unwrap();
        assert!(err.is_access_problem());
        assert_eq!(devices.streams_opened(), 0);
    }

    #[tokio::test]
    async fn test_frame_has_requested_size() {
        let devices = SyntheticDevices::new(16, 9);
        let mut stream = devices
            .request_stream(StreamConstraints::video_only())
            .await
            .unwrap();
        let frame = stream.sample_frame(16, 9).unwrap();
        assert_eq!(frame.rgba.len(), 16 * 9 * 4);

        stream.stop_tracks();
        assert!(stream.sample_frame(16, 9).is_err());
        assert_eq!(devices.live_streams(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_emits_chunk_per_second() {
        let devices = SyntheticDevices::new(16, 9);
        let mut stream = devices
            .request_stream(StreamConstraints::audio_video())
            .await
            .unwrap();
        let mut recorder = stream.create_recorder("video/mp4").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        recorder.start(tx).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        recorder.stop().unwrap();

        let mut chunks = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            chunks.push(chunk);
        }
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], CONTAINER_HEADER);
        assert!(chunks[3].is_empty());
        assert!(recorder.stop().is_err());
    }
}

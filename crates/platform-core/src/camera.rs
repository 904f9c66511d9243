//! Camera, microphone and recorder capability.

use tokio::sync::mpsc;

/// What to ask the device for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub video: bool,
    pub audio: bool,
}

impl StreamConstraints {
    /// Camera only.
    pub fn video_only() -> Self {
        Self {
            video: true,
            audio: false,
        }
    }

    /// Camera plus microphone.
    pub fn audio_video() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

/// Failures reported by a device backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("access denied: {0}")]
    PermissionDenied(String),

    #[error("no capture device: {0}")]
    NotFound(String),

    #[error("device failure: {0}")]
    Failed(String),
}

impl DeviceError {
    /// Whether the user (or the platform) refused access, or there was
    /// nothing to grant access to.
    pub fn is_access_problem(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::NotFound(_))
    }
}

/// One still frame, tightly packed RGBA8.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// Encoded media chunks flow from the recorder through this channel.
pub type ChunkSender = mpsc::UnboundedSender<Vec<u8>>;

/// Entry point to the device's cameras and microphones.
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    /// Ask for a live stream. This is where the permission prompt happens.
    async fn request_stream(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// A live stream holding the hardware lock until its tracks are stopped.
pub trait MediaStream: Send {
    /// Stream identifier for logging.
    fn id(&self) -> &str;

    /// Native frame size, if the device has reported it yet.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Copy the current video frame, scaled to `width` x `height`.
    fn sample_frame(&mut self, width: u32, height: u32) -> Result<RawFrame, DeviceError>;

    /// Attach an encoder that turns the stream into `mime_type` chunks.
    fn create_recorder(&mut self, mime_type: &str) -> Result<Box<dyn MediaRecorder>, DeviceError>;

    /// Stop every track and release the camera and microphone.
    fn stop_tracks(&mut self);
}

/// Incremental encoder bound to a stream.
pub trait MediaRecorder: Send {
    /// Begin encoding; chunks are delivered through `chunks` as they are ready.
    fn start(&mut self, chunks: ChunkSender) -> Result<(), DeviceError>;

    /// Stop encoding. Every remaining chunk is delivered before this returns.
    fn stop(&mut self) -> Result<(), DeviceError>;

    /// Container format of the delivered chunks.
    fn mime_type(&self) -> &str;
}

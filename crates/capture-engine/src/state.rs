//! Capture state machine.
//!
//! ```text
//! idle ──open──▶ requesting-permission ──granted──▶ previewing ──start──▶ recording
//!  ▲                     │ denied                     │  ▲ photo            │ stop
//!  │                     ▼                            └──┘                  ▼
//!  └──────reset──────  error  ◀──────recorder failed──────────────────  finalizing
//!  ▲                                                                        │
//!  └─────────────────────────────finalized──────────────────────────────────┘
//! ```
//!
//! `close` is accepted everywhere and always lands in `idle`.

use cheezy_common::error::{CheezyError, CheezyResult};
use cheezy_platform_core::StreamConstraints;

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    RequestingPermission,
    Previewing,
    Recording,
    Finalizing,
    Error,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    Open,
    PermissionGranted,
    PermissionDenied,
    CapturePhoto,
    StartRecording,
    StopRecording,
    RecorderFailed,
    Finalized,
    Close,
    Reset,
}

/// What the user is about to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    Photo,
    Video,
}

impl CaptureKind {
    /// Stills need the camera only; recordings also need the microphone.
    pub fn constraints(&self) -> StreamConstraints {
        match self {
            CaptureKind::Photo => StreamConstraints::video_only(),
            CaptureKind::Video => StreamConstraints::audio_video(),
        }
    }
}

impl CaptureState {
    /// Apply `event`, returning the next state or an error for an event
    /// the current state does not accept.
    pub fn on(self, event: CaptureEvent) -> CheezyResult<CaptureState> {
        use CaptureEvent as E;
        use CaptureState::*;

        let next = match (self, event) {
            (_, E::Close) => Idle,
            (Idle | Error, E::Open) => RequestingPermission,
            (RequestingPermission, E::PermissionGranted) => Previewing,
            (RequestingPermission, E::PermissionDenied) => Error,
            (Previewing, E::CapturePhoto) => Previewing,
            (Previewing, E::StartRecording) => Recording,
            (Recording, E::StopRecording) => Finalizing,
            (Recording, E::RecorderFailed) => Error,
            (Finalizing, E::Finalized) => Idle,
            (Error, E::Reset) => Idle,
            (state, event) => return Err(CheezyError::invalid_transition(state, event)),
        };
        Ok(next)
    }

    /// Whether `event` would be accepted.
    pub fn accepts(self, event: CaptureEvent) -> bool {
        self.on(event).is_ok()
    }
}

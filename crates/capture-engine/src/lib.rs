//! Cheezy Capture Engine
//!
//! Owns the camera/microphone handle and the active recorder, and turns a
//! preview into finished media blobs.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                CaptureSession                 │
//! │   commands ──▶ ┌───────────────────┐ ──▶ blobs │
//! │   timeouts ──▶ │ CaptureController │           │
//! │                └─────────┬─────────┘           │
//! │                          │ StreamGuard         │
//! │                          ▼                     │
//! │     MediaDevices ─▶ MediaStream ─▶ Recorder    │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! The state machine itself is a pure transition function in [`state`];
//! the controller applies it and performs the side effects.

pub mod backend;
pub mod controller;
pub mod session;
pub mod state;
pub mod still;

pub use controller::*;
pub use session::*;
pub use state::*;

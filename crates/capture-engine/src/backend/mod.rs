//! Device backends.
//!
//! Real camera access lives behind [`cheezy_platform_core::MediaDevices`];
//! the synthetic backend here produces deterministic frames and recordings
//! for tests, demos and headless runs.

pub mod synthetic;

pub use synthetic::SyntheticDevices;

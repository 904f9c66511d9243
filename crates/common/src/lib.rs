//! Cheezy Memories Common Utilities
//!
//! Shared infrastructure for all Cheezy crates:
//! - Error types and result aliases
//! - Wall clocks and recording clocks
//! - Cancellable scheduled tasks
//! - User-visible notices
//! - Tracing/logging initialization
//! - Configuration loading, including the injected device policy

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod notice;
pub mod timer;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use notice::*;
pub use timer::*;

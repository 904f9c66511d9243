//! Cheezy platform core contracts.
//!
//! The capture pipeline, the feed and the gesture engine never touch a
//! device, a bucket or a database directly. They talk to the narrow
//! capabilities defined here, which real backends and in-memory fakes both
//! implement:
//!
//! - [`camera`]: request a stream, sample stills, record chunks
//! - [`storage`]: write-once blob storage and the append-only record store
//! - [`picker`]: the platform's native gallery/camera chooser

pub mod camera;
pub mod picker;
pub mod storage;

pub use camera::*;
pub use picker::*;
pub use storage::*;

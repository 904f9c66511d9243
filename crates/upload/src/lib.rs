//! Cheezy Upload
//!
//! Turns a finished [`MediaBlob`](cheezy_experience_model::MediaBlob) into
//! a persisted Experience:
//!
//! 1. store the blob at a collision-resistant path and resolve its address
//! 2. append `{type, url, name, caption, createdAt}` to the shared store
//!
//! The second phase only runs if the first succeeded. A blob whose record
//! append fails stays in storage, unreferenced.

pub mod path;
pub mod pipeline;

pub use path::{sanitize_file_name, storage_path};
pub use pipeline::{UploadPipeline, UploadReceipt};

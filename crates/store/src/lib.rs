//! Cheezy Store
//!
//! Implementations of the storage capabilities:
//!
//! - [`FileBlobStore`]: write-once blobs under a local directory
//! - [`JsonlRecordStore`]: the shared append-only record store, one JSONL
//!   file per collection, with live snapshots
//! - [`MemoryBlobStore`] / [`MemoryRecordStore`]: in-process fakes with
//!   failure injection, used by tests and ephemeral runs
//!
//! Both record stores publish through a [`SnapshotHub`], which keeps the
//! current contents of every collection and fans changes out to
//! subscribers.

pub mod blob;
pub mod hub;
pub mod memory;
pub mod records;

pub use blob::FileBlobStore;
pub use hub::SnapshotHub;
pub use memory::{MemoryBlobStore, MemoryRecordStore};
pub use records::JsonlRecordStore;

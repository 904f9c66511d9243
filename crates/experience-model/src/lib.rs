//! Cheezy Memories Experience Model
//!
//! Defines the core data contracts shared by every component:
//! - **Experience:** the single persisted entity, immutable once written
//! - **Media:** finished blobs handed from capture (or the picker) to upload
//! - **Feed:** store snapshots and the sorted, de-duplicated view built from them
//! - **Id:** store-assigned ids and the append sequence they carry
//!
//! Wire field names (`type`, `createdAt`) match the shared record store.

pub mod experience;
pub mod feed;
pub mod id;
pub mod media;

pub use experience::*;
pub use feed::*;
pub use id::*;
pub use media::*;

//! JsonlRecordStore: the shared record store on disk.
//!
//! Each collection is one append-only JSONL file under
//! `{data_dir}/records/{collection}.jsonl`. The first line is a `#` header;
//! every other line is one record:
//!
//! ```text
//! # {"format":"cheezy-records","version":1,"collection":"experiences"}
//! {"id":"0000000001-5d2c...","fields":{"type":"image","url":"file:///...","createdAt":1718000000000}}
//! ```
//!
//! Lines that fail to parse are skipped with a warning, so one torn write
//! never hides the rest of the collection. Other processes may append to
//! the same file without coordination: ids carry a random nonce, so two
//! writers never hand out the same one, and [`JsonlRecordStore::refresh`]
//! picks up what the others wrote.

use std::path::{Path, PathBuf};

use cheezy_common::config::StorageConfig;
use cheezy_common::error::{CheezyError, CheezyResult};
use cheezy_experience_model::Snapshot;
use cheezy_platform_core::{RecordStore, Subscription};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::hub::SnapshotHub;

const FORMAT: &str = "cheezy-records";
const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct FileHeader {
    format: String,
    version: u32,
    collection: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    id: String,
    fields: serde_json::Value,
}

/// Result of reading one collection file.
#[derive(Debug, Default)]
pub struct ParsedRecords {
    pub snapshot: Snapshot,
    /// Line numbers (1-based) that could not be read.
    pub skipped: Vec<usize>,
}

/// Parse the body of a collection file.
///
/// Blank lines and `#` comment lines are ignored. A repeated id keeps its
/// first occurrence.
pub fn parse_records(content: &str) -> ParsedRecords {
    let mut parsed = ParsedRecords::default();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<StoredRecord>(line) {
            Ok(record) if !record.id.is_empty() => {
                parsed.snapshot.entry(record.id).or_insert(record.fields);
            }
            _ => parsed.skipped.push(index + 1),
        }
    }
    parsed
}

/// Append-only JSONL record store with live snapshots.
#[derive(Debug)]
pub struct JsonlRecordStore {
    dir: PathBuf,
    hub: SnapshotHub,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlRecordStore {
    /// Record store under `config.data_dir/records`.
    pub fn new(config: &StorageConfig) -> CheezyResult<Self> {
        Self::at_path(config.data_dir.join("records"))
    }

    /// Record store rooted at `dir`, created if missing.
    pub fn at_path(dir: impl Into<PathBuf>) -> CheezyResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            CheezyError::storage(format!("Failed to create record directory {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            hub: SnapshotHub::new(),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a collection.
    pub fn collection_path(&self, collection: &str) -> CheezyResult<PathBuf> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CheezyError::storage(format!(
                "Invalid collection name: {collection:?}"
            )));
        }
        Ok(self.dir.join(format!("{collection}.jsonl")))
    }

    /// Re-read a collection from disk and notify subscribers if it changed.
    ///
    /// Returns whether the contents changed.
    pub async fn refresh(&self, collection: &str) -> CheezyResult<bool> {
        let path = self.collection_path(collection)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(read_error(&path, e)),
        };
        self.load(collection, &content)
    }

    /// Current contents of a collection.
    pub fn snapshot(&self, collection: &str) -> CheezyResult<std::sync::Arc<Snapshot>> {
        self.ensure_loaded(collection)?;
        self.hub.snapshot(collection)
    }

    pub fn active_subscribers(&self) -> usize {
        self.hub.active_subscribers()
    }

    fn load(&self, collection: &str, content: &str) -> CheezyResult<bool> {
        let parsed = parse_records(content);
        for line in &parsed.skipped {
            tracing::warn!(collection, line, "Skipping unreadable record line");
        }
        let changed = self.hub.replace(collection, parsed.snapshot)?;
        if changed {
            tracing::debug!(collection, "Collection reloaded");
        }
        Ok(changed)
    }

    /// First load for callers outside the async path (`subscribe`,
    /// `snapshot`). Later reloads go through [`Self::refresh`].
    fn ensure_loaded(&self, collection: &str) -> CheezyResult<()> {
        if self.hub.contains(collection) {
            return Ok(());
        }
        let path = self.collection_path(collection)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(read_error(&path, e)),
        };
        self.load(collection, &content)?;
        Ok(())
    }

    /// Create the collection file with its header line unless it exists.
    ///
    /// The header is staged in a private file and hard-linked into place,
    /// so when several writers race to create the file exactly one header
    /// lands, and it is the first line.
    async fn ensure_file(&self, path: &Path, collection: &str) -> CheezyResult<()> {
        if tokio::fs::try_exists(path).await? {
            return Ok(());
        }
        let header = serde_json::to_string(&FileHeader {
            format: FORMAT.to_string(),
            version: VERSION,
            collection: collection.to_string(),
        })?;
        let header = format!("# {header}\n");

        let staged = self.dir.join(format!(
            ".{collection}.{}.partial",
            uuid::Uuid::new_v4().simple()
        ));
        tokio::fs::write(&staged, header.as_bytes()).await?;
        let linked = tokio::fs::hard_link(&staged, path).await;
        let _ = tokio::fs::remove_file(&staged).await;

        match linked {
            Ok(()) => {
                tracing::debug!(collection, path = %path.display(), "Collection file created");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => {
                // Filesystems without hard links: create in place instead.
                tracing::debug!(error = %e, "Hard link unavailable, creating collection file directly");
                match tokio::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(path)
                    .await
                {
                    Ok(mut file) => {
                        file.write_all(header.as_bytes()).await?;
                        file.flush().await?;
                        Ok(())
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Append one line with a single write, so lines from concurrent
    /// writers never interleave.
    async fn write_line(&self, path: &Path, line: &str) -> CheezyResult<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let mut out = String::with_capacity(line.len() + 1);
        out.push_str(line);
        out.push('\n');
        file.write_all(out.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn read_error(path: &Path, e: std::io::Error) -> CheezyError {
    CheezyError::storage(format!("Failed to read {}: {e}", path.display()))
}

#[async_trait::async_trait]
impl RecordStore for JsonlRecordStore {
    async fn append(&self, collection: &str, fields: serde_json::Value) -> CheezyResult<String> {
        let path = self.collection_path(collection)?;
        let _guard = self.write_lock.lock().await;

        self.ensure_file(&path, collection)
            .await
            .map_err(|e| CheezyError::storage(format!("Failed to create {collection}: {e}")))?;
        // Pick up appends from other writers before choosing a sequence.
        self.refresh(collection).await?;
        let id = self.hub.next_id(collection)?;

        let line = serde_json::to_string(&StoredRecord {
            id: id.clone(),
            fields: fields.clone(),
        })?;
        self.write_line(&path, &line)
            .await
            .map_err(|e| CheezyError::storage(format!("Failed to append to {collection}: {e}")))?;

        self.hub.insert(collection, id.clone(), fields)?;
        tracing::debug!(collection, id = %id, "Record appended");
        Ok(id)
    }

    fn subscribe(&self, collection: &str) -> CheezyResult<Subscription> {
        self.ensure_loaded(collection)?;
        self.hub.subscribe(collection)
    }
}

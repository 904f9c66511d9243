//! FileBlobStore: write-once blobs on the local filesystem.
//!
//! Layout:
//! ```text
//! {data_dir}/blobs/
//! └── experiences/
//!     ├── 1718000000000_3f9c1a2b_photo_1718000000000.png
//!     └── 1718000004200_0be4d771_holiday.mp4
//! ```
//!
//! Blobs are written to a `.partial` sibling and renamed into place, so a
//! reader never sees a half-written object.

use std::path::{Component, Path, PathBuf};

use cheezy_common::config::StorageConfig;
use cheezy_common::error::{CheezyError, CheezyResult};
use cheezy_experience_model::MediaBlob;
use cheezy_platform_core::BlobStore;
use tokio::io::AsyncWriteExt;

/// Local directory standing in for object storage.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl FileBlobStore {
    /// Blob store under `config.data_dir/blobs`.
    pub fn new(config: &StorageConfig) -> CheezyResult<Self> {
        let store = Self::at_path(config.data_dir.join("blobs"))?;
        Ok(match &config.public_base_url {
            Some(base) => store.with_public_base_url(base.clone()),
            None => store,
        })
    }

    /// Blob store rooted at `root`, created if missing.
    pub fn at_path(root: impl Into<PathBuf>) -> CheezyResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            CheezyError::storage(format!("Failed to create blob directory {}: {e}", root.display()))
        })?;
        Ok(Self {
            root,
            public_base_url: None,
        })
    }

    /// Resolve addresses under `base` instead of `file://` URLs.
    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(base.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location for a storage path.
    ///
    /// Only plain relative paths are accepted: no root, no `..`, no `.`.
    pub fn object_path(&self, path: &str) -> CheezyResult<PathBuf> {
        let relative = Path::new(path);
        let plain = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(CheezyError::storage(format!("Invalid storage path: {path:?}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl BlobStore for FileBlobStore {
    async fn put(&self, path: &str, blob: &MediaBlob) -> CheezyResult<()> {
        let target = self.object_path(path)?;
        if tokio::fs::try_exists(&target).await? {
            return Err(CheezyError::storage(format!("Blob already exists at {path}")));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut partial = target.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&partial)
            .await
            .map_err(|e| CheezyError::storage(format!("Failed to open {path}: {e}")))?;
        if let Err(e) = write_all(&mut file, &blob.data).await {
            drop(file);
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(CheezyError::storage(format!("Failed to write {path}: {e}")));
        }
        drop(file);
        tokio::fs::rename(&partial, &target).await?;

        tracing::debug!(path, bytes = blob.len(), mime = %blob.mime_type, "Blob stored");
        Ok(())
    }

    async fn resolve_url(&self, path: &str) -> CheezyResult<String> {
        let target = self.object_path(path)?;
        if !tokio::fs::try_exists(&target).await? {
            return Err(CheezyError::storage(format!("No blob stored at {path}")));
        }
        Ok(match &self.public_base_url {
            Some(base) => format!("{}/{path}", base.trim_end_matches('/')),
            None => format!("file://{}", target.display()),
        })
    }
}

async fn write_all(file: &mut tokio::fs::File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.sync_all().await
}

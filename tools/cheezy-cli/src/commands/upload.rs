//! Upload a file from disk.

use std::path::PathBuf;

use cheezy_common::config::AppConfig;
use cheezy_experience_model::MediaBlob;

use super::{print_receipt, Stores};

pub async fn run(
    config: &AppConfig,
    file: PathBuf,
    name: Option<String>,
    caption: Option<String>,
    mime: Option<String>,
) -> anyhow::Result<()> {
    let data = tokio::fs::read(&file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    let blob = MediaBlob::from_file(file_name, mime.as_deref(), data);

    println!(
        "Uploading {} ({}, {} bytes)",
        blob.file_name,
        blob.mime_type,
        blob.len()
    );

    let stores = Stores::open(config)?;
    let receipt = stores.pipeline(config).upload(&blob, name, caption).await?;
    print_receipt(&receipt)
}

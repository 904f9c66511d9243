pub mod browse;
pub mod capture;
pub mod check;
pub mod feed;
pub mod upload;

use std::sync::Arc;

use clap::ValueEnum;

use cheezy_capture_engine::CaptureKind;
use cheezy_common::config::AppConfig;
use cheezy_common::notice::{Notice, NoticeLevel, Notifier};
use cheezy_experience_model::Experience;
use cheezy_stack_engine::{LayoutMode, RenderedView};
use cheezy_store::{FileBlobStore, JsonlRecordStore};
use cheezy_upload::{UploadPipeline, UploadReceipt};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Photo,
    Video,
}

impl From<KindArg> for CaptureKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Photo => CaptureKind::Photo,
            KindArg::Video => CaptureKind::Video,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LayoutArg {
    Stack,
    Tile,
}

impl From<LayoutArg> for LayoutMode {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Stack => LayoutMode::Stack,
            LayoutArg::Tile => LayoutMode::Tile,
        }
    }
}

/// Prints user notices to the terminal.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => println!("[OK] {}", notice.message),
            NoticeLevel::Failure => eprintln!("[FAIL] {}", notice.message),
        }
    }
}

/// The local stores under the configured data directory.
pub struct Stores {
    pub blobs: Arc<FileBlobStore>,
    pub records: Arc<JsonlRecordStore>,
}

impl Stores {
    pub fn open(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            blobs: Arc::new(FileBlobStore::new(&config.storage)?),
            records: Arc::new(JsonlRecordStore::new(&config.storage)?),
        })
    }

    pub fn pipeline(&self, config: &AppConfig) -> UploadPipeline {
        UploadPipeline::new(self.blobs.clone(), self.records.clone(), &config.storage)
            .with_notifier(Arc::new(ConsoleNotifier))
    }
}

pub fn print_receipt(receipt: &UploadReceipt) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(receipt)?);
    Ok(())
}

pub fn describe(experience: &Experience) -> String {
    let mut line = format!(
        "[{}] {} {} by {}",
        experience.id,
        experience.media_type.as_str(),
        experience.url,
        experience.author()
    );
    if let Some(caption) = &experience.caption {
        line.push_str(&format!(": \"{caption}\""));
    }
    line
}

pub fn print_view(view: &RenderedView) {
    match view {
        RenderedView::Tile { items } => {
            println!("Feed ({} experiences, newest first)", items.len());
            println!("{}", "=".repeat(50));
            for experience in items {
                println!("  {}", describe(experience));
            }
        }
        RenderedView::Stack {
            cards,
            toggle_visible,
        } => {
            println!(
                "Stack ({} cards visible{})",
                cards.len(),
                if *toggle_visible { "" } else { ", layout locked" }
            );
            println!("{}", "=".repeat(50));
            for card in cards {
                let p = &card.placement;
                println!(
                    "  {}#{} x={:+.0} y={:.0} scale={:.2}  {}",
                    "  ".repeat(p.depth),
                    p.feed_index,
                    p.offset_x,
                    p.offset_y,
                    p.scale,
                    describe(&card.experience)
                );
            }
        }
    }
    if view.is_empty() {
        println!("  (nothing shared yet)");
    }
}

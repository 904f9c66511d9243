//! Print the shared feed, optionally following it.

use std::sync::Arc;
use std::time::Duration;

use cheezy_common::config::AppConfig;
use cheezy_feed_sync::FeedSync;
use cheezy_stack_engine::GalleryView;
use cheezy_store::JsonlRecordStore;

use super::{print_view, LayoutArg};

pub async fn run(
    config: &AppConfig,
    follow: bool,
    layout: LayoutArg,
    poll_ms: u64,
) -> anyhow::Result<()> {
    let collection = config.storage.collection.clone();
    let records = Arc::new(JsonlRecordStore::new(&config.storage)?);

    let mut sync = FeedSync::new(records.clone(), collection.clone());
    sync.activate()?;
    let mut updates = sync.watch();
    while sync.updates_applied() == 0 {
        updates.changed().await?;
    }

    let mut gallery = GalleryView::new(config.stack.clone(), &config.device);
    gallery.set_layout(layout.into());
    gallery.set_feed(sync.view());
    print_view(&gallery.render());

    if follow {
        // Other processes append to the same file; poll it for changes.
        let period = Duration::from_millis(poll_ms.max(50));
        let mut poll = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        println!();
        println!("Following the feed (Ctrl+C to stop)...");
        loop {
            tokio::select! {
                changed = updates.changed() => {
                    changed?;
                    gallery.set_feed(sync.view());
                    println!();
                    print_view(&gallery.render());
                }
                _ = poll.tick() => {
                    if let Err(e) = records.refresh(&collection).await {
                        tracing::warn!(error = %e, "Feed refresh failed");
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    }

    sync.deactivate().await;
    Ok(())
}

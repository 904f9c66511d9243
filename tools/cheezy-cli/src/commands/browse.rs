//! Swipe through the stored feed without following it.

use std::sync::Arc;

use cheezy_common::config::AppConfig;
use cheezy_feed_sync::FeedSync;
use cheezy_stack_engine::{DragOutcome, GalleryView, LayoutMode};
use cheezy_store::JsonlRecordStore;

use super::{describe, print_view};

pub fn run(config: &AppConfig, swipes: Vec<f64>, ticks: u32) -> anyhow::Result<()> {
    let records = Arc::new(JsonlRecordStore::new(&config.storage)?);
    let snapshot = records.snapshot(&config.storage.collection)?;

    let sync = FeedSync::new(records, &config.storage.collection);
    sync.apply_snapshot(&snapshot);

    let mut gallery = GalleryView::new(config.stack.clone(), &config.device);
    gallery.set_layout(LayoutMode::Stack);
    gallery.set_feed(sync.view());

    let top = |g: &GalleryView| g.top().map(describe).unwrap_or_else(|| "(empty)".to_string());
    println!("Top: {}", top(&gallery));

    for dx in swipes {
        gallery.on_drag_start(0.0);
        gallery.on_drag_move(dx);
        let outcome = gallery.on_drag_end();
        let verdict = match outcome {
            DragOutcome::Committed { cursor } => format!("committed, cursor {cursor}"),
            DragOutcome::SnappedBack => "snapped back".to_string(),
            DragOutcome::Ignored => "ignored".to_string(),
        };
        println!("Swipe {dx:+.0}: {verdict}. Top: {}", top(&gallery));
    }

    if ticks > 0 && !gallery.gesture().auto_advance() {
        println!("Auto-advance is off for this device policy");
    } else {
        for _ in 0..ticks {
            if let DragOutcome::Committed { cursor } = gallery.on_auto_advance_tick() {
                println!("Auto-advance: cursor {cursor}. Top: {}", top(&gallery));
            }
        }
    }

    println!();
    print_view(&gallery.render());
    Ok(())
}

//! The gallery: layout, gestures and the latest feed in one place.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cheezy_common::config::{DevicePolicy, StackSettings};
use cheezy_common::timer::ScheduledTask;
use cheezy_experience_model::{Experience, FeedView};
use tokio::sync::Notify;

use crate::cards::{visible_cards, CardPlacement};
use crate::gesture::{DragOutcome, StackGestureEngine};
use crate::layout::{LayoutController, LayoutMode};

/// A card ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCard {
    pub experience: Experience,
    pub placement: CardPlacement,
}

/// What the screen should show.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedView {
    Stack {
        /// Top card first.
        cards: Vec<RenderedCard>,
        toggle_visible: bool,
    },
    Tile {
        /// Newest first.
        items: Vec<Experience>,
    },
}

impl RenderedView {
    pub fn is_empty(&self) -> bool {
        match self {
            RenderedView::Stack { cards, .. } => cards.is_empty(),
            RenderedView::Tile { items } => items.is_empty(),
        }
    }
}

/// Presentation state over a read-only feed.
#[derive(Debug)]
pub struct GalleryView {
    settings: StackSettings,
    layout: LayoutController,
    gesture: StackGestureEngine,
    feed: Arc<FeedView>,
    /// Restarts the auto-advance countdown on user interaction.
    idle_reset: Arc<Notify>,
}

impl GalleryView {
    pub fn new(settings: StackSettings, policy: &DevicePolicy) -> Self {
        Self {
            gesture: StackGestureEngine::from_settings(&settings, policy),
            layout: LayoutController::new(policy),
            settings,
            feed: Arc::new(FeedView::empty()),
            idle_reset: Arc::new(Notify::new()),
        }
    }

    /// Show a newer feed. Cursor and drag state carry over.
    pub fn set_feed(&mut self, feed: Arc<FeedView>) {
        self.feed = feed;
    }

    pub fn feed(&self) -> &Arc<FeedView> {
        &self.feed
    }

    pub fn layout(&self) -> &LayoutController {
        &self.layout
    }

    pub fn gesture(&self) -> &StackGestureEngine {
        &self.gesture
    }

    pub fn mode(&self) -> LayoutMode {
        self.layout.mode()
    }

    pub fn toggle_layout(&mut self) -> LayoutMode {
        self.layout.toggle()
    }

    pub fn set_layout(&mut self, mode: LayoutMode) -> LayoutMode {
        self.layout.set_mode(mode)
    }

    pub fn on_drag_start(&mut self, x: f64) {
        if self.mode() == LayoutMode::Stack {
            self.gesture.on_drag_start(x);
            self.idle_reset.notify_one();
        }
    }

    pub fn on_drag_move(&mut self, x: f64) {
        if self.mode() == LayoutMode::Stack {
            self.gesture.on_drag_move(x);
        }
    }

    pub fn on_drag_end(&mut self) -> DragOutcome {
        if self.mode() != LayoutMode::Stack {
            return DragOutcome::Ignored;
        }
        let outcome = self.gesture.on_drag_end(self.feed.len());
        if outcome != DragOutcome::Ignored {
            self.idle_reset.notify_one();
        }
        outcome
    }

    /// One idle period elapsed.
    pub fn on_auto_advance_tick(&mut self) -> DragOutcome {
        if self.mode() != LayoutMode::Stack {
            return DragOutcome::Ignored;
        }
        self.gesture.on_idle_tick(self.feed.len())
    }

    /// The current top card, if any.
    pub fn top(&self) -> Option<&Experience> {
        self.gesture
            .top_index(self.feed.len())
            .and_then(|i| self.feed.get(i))
    }

    pub fn render(&self) -> RenderedView {
        match self.mode() {
            LayoutMode::Tile => RenderedView::Tile {
                items: self.feed.items().to_vec(),
            },
            LayoutMode::Stack => {
                let len = self.feed.len();
                let cursor = self.gesture.top_index(len).unwrap_or(0);
                let cards = visible_cards(cursor, self.gesture.drag_offset(), len, &self.settings)
                    .into_iter()
                    .filter_map(|placement| {
                        self.feed.get(placement.feed_index).map(|e| RenderedCard {
                            experience: e.clone(),
                            placement,
                        })
                    })
                    .collect();
                RenderedView::Stack {
                    cards,
                    toggle_visible: self.layout.toggle_visible(),
                }
            }
        }
    }

    /// Start the idle auto-advance ticker for a shared gallery.
    ///
    /// The countdown restarts whenever a drag starts or ends, so a card only
    /// advances on its own after a full period without interaction. Returns
    /// `None` when the policy leaves auto-advance off. Dropping the returned
    /// task stops the ticker.
    pub fn spawn_auto_advance(gallery: &Arc<Mutex<GalleryView>>) -> Option<ScheduledTask> {
        let (period, reset) = {
            let g = gallery.lock().ok()?;
            if !g.gesture.auto_advance() {
                return None;
            }
            (
                Duration::from_secs(g.settings.auto_advance_secs.max(1)),
                g.idle_reset.clone(),
            )
        };

        let gallery = gallery.clone();
        Some(ScheduledTask::idle("auto-advance", period, reset, move || {
            if let Ok(mut g) = gallery.lock() {
                if let DragOutcome::Committed { cursor } = g.on_auto_advance_tick() {
                    tracing::debug!(cursor, "Auto-advanced");
                }
            }
        }))
    }
}

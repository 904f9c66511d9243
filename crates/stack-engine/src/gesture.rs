//! Swipe gesture state machine.

use cheezy_common::config::{DevicePolicy, StackSettings};

/// What a drag end (or idle tick) did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    /// The top card was swiped away; `cursor` is the new top.
    Committed { cursor: usize },
    /// The drag stayed within the threshold.
    SnappedBack,
    /// No drag was active.
    Ignored,
}

/// Cursor and drag state for the card stack.
///
/// The cursor is circular over the feed length, which is passed in on every
/// call that can move it: the feed belongs to the feed sync, not to us.
#[derive(Debug, Clone)]
pub struct StackGestureEngine {
    threshold: f64,
    auto_advance: bool,
    cursor: usize,
    drag_offset: f64,
    drag_active: bool,
    start_x: f64,
}

impl Default for StackGestureEngine {
    fn default() -> Self {
        Self::new(StackSettings::default().commit_threshold, false)
    }
}

impl StackGestureEngine {
    pub fn new(threshold: f64, auto_advance: bool) -> Self {
        Self {
            threshold: threshold.abs(),
            auto_advance,
            cursor: 0,
            drag_offset: 0.0,
            drag_active: false,
            start_x: 0.0,
        }
    }

    pub fn from_settings(settings: &StackSettings, policy: &DevicePolicy) -> Self {
        Self::new(settings.commit_threshold, policy.auto_advances())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn drag_offset(&self) -> f64 {
        self.drag_offset
    }

    pub fn drag_active(&self) -> bool {
        self.drag_active
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    /// Begin a drag at `x`. A drag already in progress restarts from `x`.
    pub fn on_drag_start(&mut self, x: f64) {
        self.start_x = x;
        self.drag_offset = 0.0;
        self.drag_active = true;
    }

    /// Track the pointer. No effect without an active drag.
    pub fn on_drag_move(&mut self, x: f64) {
        if self.drag_active {
            self.drag_offset = x - self.start_x;
        }
    }

    /// Finish the drag: commit past the threshold, snap back otherwise.
    pub fn on_drag_end(&mut self, feed_len: usize) -> DragOutcome {
        if !self.drag_active {
            return DragOutcome::Ignored;
        }
        self.drag_active = false;

        if self.drag_offset.abs() > self.threshold {
            tracing::debug!(offset = self.drag_offset, "Swipe committed");
            DragOutcome::Committed {
                cursor: self.commit(feed_len),
            }
        } else {
            tracing::debug!(offset = self.drag_offset, "Swipe snapped back");
            self.drag_offset = 0.0;
            DragOutcome::SnappedBack
        }
    }

    /// Advance to the next card, wrapping to the first. An empty feed keeps
    /// the cursor at zero.
    pub fn commit(&mut self, feed_len: usize) -> usize {
        self.drag_offset = 0.0;
        self.cursor = if feed_len == 0 {
            0
        } else {
            (self.cursor + 1) % feed_len
        };
        self.cursor
    }

    /// Idle timer tick. Commits only when the policy enables auto-advance
    /// and the user is not dragging.
    pub fn on_idle_tick(&mut self, feed_len: usize) -> DragOutcome {
        if !self.auto_advance || self.drag_active || feed_len == 0 {
            return DragOutcome::Ignored;
        }
        DragOutcome::Committed {
            cursor: self.commit(feed_len),
        }
    }

    /// Index of the top card for a feed of `feed_len` items.
    pub fn top_index(&self, feed_len: usize) -> Option<usize> {
        (feed_len > 0).then(|| self.cursor % feed_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn swipe(engine: &mut StackGestureEngine, dx: f64, feed_len: usize) -> DragOutcome {
        engine.on_drag_start(500.0);
        engine.on_drag_move(500.0 + dx);
        engine.on_drag_end(feed_len)
    }

    #[test]
    fn test_commit_boundary() {
        let mut engine = StackGestureEngine::new(120.0, false);
        assert_eq!(swipe(&mut engine, 119.0, 3), DragOutcome::SnappedBack);
        assert_eq!(engine.cursor(), 0);
        assert_eq!(engine.drag_offset(), 0.0);

        assert_eq!(swipe(&mut engine, 120.0, 3), DragOutcome::SnappedBack);
        assert_eq!(engine.cursor(), 0);

        assert_eq!(
            swipe(&mut engine, 121.0, 3),
            DragOutcome::Committed { cursor: 1 }
        );
        assert_eq!(engine.drag_offset(), 0.0);
        assert!(!engine.drag_active());
    }

    #[test]
    fn test_leftward_swipe_also_commits() {
        let mut engine = StackGestureEngine::new(120.0, false);
        assert_eq!(
            swipe(&mut engine, -121.0, 3),
            DragOutcome::Committed { cursor: 1 }
        );
    }

    #[test]
    fn test_last_card_wraps_to_first() {
        let mut engine = StackGestureEngine::new(120.0, false);
        engine.commit(3);
        engine.commit(3);
        assert_eq!(engine.cursor(), 2);
        assert_eq!(
            swipe(&mut engine, 121.0, 3),
            DragOutcome::Committed { cursor: 0 }
        );
    }

    #[test]
    fn test_three_card_scenario() {
        // Feed newest first: A(300), B(200), C(100).
        let mut engine = StackGestureEngine::new(120.0, false);
        assert_eq!(engine.cursor(), 0);
        swipe(&mut engine, 200.0, 3);
        assert_eq!(engine.cursor(), 1);
        swipe(&mut engine, 200.0, 3);
        swipe(&mut engine, 200.0, 3);
        assert_eq!(engine.cursor(), 0);
    }

    #[test]
    fn test_move_and_end_without_start_do_nothing() {
        let mut engine = StackGestureEngine::new(120.0, false);
        engine.on_drag_move(900.0);
        assert_eq!(engine.drag_offset(), 0.0);
        assert_eq!(engine.on_drag_end(3), DragOutcome::Ignored);
        assert_eq!(engine.cursor(), 0);
    }

    #[test]
    fn test_empty_feed_commit_keeps_cursor_at_zero() {
        let mut engine = StackGestureEngine::new(120.0, true);
        assert_eq!(
            swipe(&mut engine, 300.0, 0),
            DragOutcome::Committed { cursor: 0 }
        );
        assert_eq!(engine.on_idle_tick(0), DragOutcome::Ignored);
        assert_eq!(engine.top_index(0), None);
    }

    #[test]
    fn test_idle_tick_follows_policy_and_drag() {
        let mut off = StackGestureEngine::new(120.0, false);
        assert_eq!(off.on_idle_tick(3), DragOutcome::Ignored);
        assert_eq!(off.cursor(), 0);

        let mut on = StackGestureEngine::from_settings(
            &StackSettings::default(),
            &DevicePolicy::handheld(),
        );
        assert_eq!(on.on_idle_tick(3), DragOutcome::Committed { cursor: 1 });

        on.on_drag_start(0.0);
        on.on_drag_move(40.0);
        assert_eq!(on.on_idle_tick(3), DragOutcome::Ignored);
        assert_eq!(on.cursor(), 1);
        assert_eq!(on.drag_offset(), 40.0);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Start(f64),
        Move(f64),
        End,
        Tick,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (-1000.0..1000.0f64).prop_map(Step::Start),
            (-1000.0..1000.0f64).prop_map(Step::Move),
            Just(Step::End),
            Just(Step::Tick),
        ]
    }

    proptest! {
        #[test]
        fn prop_cursor_stays_in_range(
            feed_len in 1usize..8,
            steps in proptest::collection::vec(step(), 0..60),
        ) {
            let mut engine = StackGestureEngine::new(120.0, true);
            for s in steps {
                match s {
                    Step::Start(x) => engine.on_drag_start(x),
                    Step::Move(x) => engine.on_drag_move(x),
                    Step::End => { engine.on_drag_end(feed_len); }
                    Step::Tick => { engine.on_idle_tick(feed_len); }
                }
                prop_assert!(engine.cursor() < feed_len);
                if !engine.drag_active() {
                    prop_assert_eq!(engine.drag_offset(), 0.0);
                }
            }
        }
    }
}

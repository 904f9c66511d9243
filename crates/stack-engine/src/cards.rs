//! Card placement for the stack.

use cheezy_common::config::StackSettings;

/// Where one visible card sits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardPlacement {
    /// Index into the sorted feed.
    pub feed_index: usize,
    /// 0 for the top card, increasing toward the back.
    pub depth: usize,
    /// Horizontal offset in px; only the top card follows the drag.
    pub offset_x: f64,
    /// Vertical offset in px.
    pub offset_y: f64,
    pub scale: f64,
}

/// Cards to draw, top first.
///
/// Up to `settings.visible_cards` cards starting at `cursor`, wrapping
/// around the feed. Shorter feeds draw fewer cards and never repeat one.
pub fn visible_cards(
    cursor: usize,
    drag_offset: f64,
    feed_len: usize,
    settings: &StackSettings,
) -> Vec<CardPlacement> {
    if feed_len == 0 {
        return Vec::new();
    }
    let count = settings.visible_cards.min(feed_len);
    (0..count)
        .map(|depth| CardPlacement {
            feed_index: (cursor + depth) % feed_len,
            depth,
            offset_x: if depth == 0 { drag_offset } else { 0.0 },
            offset_y: depth as f64 * settings.depth_offset_px,
            scale: (1.0 - depth as f64 * settings.depth_scale_step).max(0.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_cards_with_depth() {
        let settings = StackSettings::default();
        let cards = visible_cards(4, 35.0, 5, &settings);

        let indices: Vec<usize> = cards.iter().map(|c| c.feed_index).collect();
        assert_eq!(indices, vec![4, 0, 1]);
        assert_eq!(cards[0].offset_x, 35.0);
        assert_eq!(cards[1].offset_x, 0.0);
        assert!(cards[0].scale > cards[1].scale && cards[1].scale > cards[2].scale);
        assert!(cards[0].offset_y < cards[1].offset_y && cards[1].offset_y < cards[2].offset_y);
    }

    #[test]
    fn test_short_feeds_draw_fewer_cards() {
        let settings = StackSettings::default();
        assert!(visible_cards(0, 0.0, 0, &settings).is_empty());
        assert_eq!(visible_cards(0, 0.0, 1, &settings).len(), 1);

        let two = visible_cards(1, 0.0, 2, &settings);
        let indices: Vec<usize> = two.iter().map(|c| c.feed_index).collect();
        assert_eq!(indices, vec![1, 0]);
    }
}

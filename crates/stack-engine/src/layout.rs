//! Stack or tile presentation.

use cheezy_common::config::DevicePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// Gesture-driven card stack.
    #[default]
    Stack,
    /// Flat chronological grid.
    Tile,
}

/// Current layout and whether the user may change it.
///
/// The mode is a display preference only; changing it never touches the
/// feed or the stack cursor.
#[derive(Debug, Clone)]
pub struct LayoutController {
    mode: LayoutMode,
    forced_stack: bool,
}

impl LayoutController {
    pub fn new(policy: &DevicePolicy) -> Self {
        Self {
            mode: LayoutMode::Stack,
            forced_stack: policy.forces_stack_layout(),
        }
    }

    pub fn mode(&self) -> LayoutMode {
        if self.forced_stack {
            LayoutMode::Stack
        } else {
            self.mode
        }
    }

    /// Whether the toggle is shown at all.
    pub fn toggle_visible(&self) -> bool {
        !self.forced_stack
    }

    /// Flip between stack and tile. Returns the resulting mode.
    pub fn toggle(&mut self) -> LayoutMode {
        let next = match self.mode() {
            LayoutMode::Stack => LayoutMode::Tile,
            LayoutMode::Tile => LayoutMode::Stack,
        };
        self.set_mode(next)
    }

    /// Select a mode. Ignored while the policy forces the stack.
    pub fn set_mode(&mut self, mode: LayoutMode) -> LayoutMode {
        if self.forced_stack {
            tracing::debug!(requested = ?mode, "Layout is locked to stack");
        } else {
            self.mode = mode;
        }
        self.mode()
    }
}

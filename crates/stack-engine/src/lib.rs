//! Cheezy Stack Engine
//!
//! Everything between the feed and the screen:
//! - **Gesture:** drag deltas become commit or snap-back decisions over a
//!   circular cursor
//! - **Cards:** where the top cards of the stack sit
//! - **Layout:** stack or tile presentation under the device policy
//! - **Gallery:** the three combined with the latest feed into a rendered view
//!
//! Nothing here touches the feed contents; the view is read-only input.

pub mod cards;
pub mod gallery;
pub mod gesture;
pub mod layout;

pub use cards::{visible_cards, CardPlacement};
pub use gallery::{GalleryView, RenderedCard, RenderedView};
pub use gesture::{DragOutcome, StackGestureEngine};
pub use layout::{LayoutController, LayoutMode};

//! Native gallery/camera chooser.

use cheezy_common::error::CheezyResult;
use cheezy_experience_model::MediaBlob;

/// The platform's own picker. On handheld clients capture is delegated
/// here instead of opening the camera in-page.
#[async_trait::async_trait]
pub trait MediaPicker: Send + Sync {
    /// Let the user choose or shoot a file. `None` means they cancelled.
    async fn pick(&self) -> CheezyResult<Option<MediaBlob>>;
}

//! Display surface for decoded inference frames.
//!
//! Every shown frame is wrapped in a handle that holds display resources
//! until released. A handle must be released exactly once: never releasing
//! it leaks, and releasing one still on screen is a use-after-release.

use thiserror::Error;

use crate::domain::foundation::DeviceId;
use crate::domain::realtime::ImageFrame;

/// Opaque handle to one displayed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayHandle(u64);

impl DisplayHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    #[error("Display handle {0:?} was already released")]
    AlreadyReleased(DisplayHandle),

    #[error("Frame could not be displayed: {0}")]
    Rejected(String),
}

/// Creates and releases display handles.
///
/// Synchronous: both calls happen inline with the viewer's own state change.
pub trait FrameDisplay: Send + Sync {
    fn create(&self, device_id: Option<&DeviceId>, frame: &ImageFrame)
        -> Result<DisplayHandle, DisplayError>;

    /// Releases `handle`. Returns `AlreadyReleased` for a handle released before.
    fn release(&self, handle: DisplayHandle) -> Result<(), DisplayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_display_is_object_safe_and_send_sync() {
        fn _assert_trait_object(_: &dyn FrameDisplay) {}
        fn _assert_arc_send_sync<T: Send + Sync + ?Sized>() {}
        _assert_arc_send_sync::<std::sync::Arc<dyn FrameDisplay>>();
    }
}

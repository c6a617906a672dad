//! InferenceViewer - shows a device's inference frames one at a time.
//!
//! The viewer owns at most one display handle. Showing the next frame
//! creates its handle first and then releases the previous one, so a handle
//! is never released while still on screen and each handle is released
//! exactly once (on replacement, `close` or drop).

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::foundation::DeviceId;
use crate::domain::realtime::ImageFrame;
use crate::ports::{DisplayError, DisplayHandle, FrameDisplay};

use crate::application::realtime::RealtimeState;

/// Where a viewer takes its frames from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSource {
    /// The bounded image buffer of one device (frames are popped).
    Device(DeviceId),
    /// The single most-recent raw binary frame.
    LatestBinary,
}

#[derive(Debug, Clone, Copy)]
struct Shown {
    handle: DisplayHandle,
    sequence: u64,
}

pub struct InferenceViewer {
    state: Arc<RealtimeState>,
    display: Arc<dyn FrameDisplay>,
    source: FrameSource,
    shown: Option<Shown>,
    arrivals_rx: watch::Receiver<u64>,
    closed: bool,
}

impl InferenceViewer {
    pub fn for_device(
        state: Arc<RealtimeState>,
        display: Arc<dyn FrameDisplay>,
        device_id: DeviceId,
    ) -> Self {
        Self::new(state, display, FrameSource::Device(device_id))
    }

    pub fn latest_binary(state: Arc<RealtimeState>, display: Arc<dyn FrameDisplay>) -> Self {
        Self::new(state, display, FrameSource::LatestBinary)
    }

    fn new(state: Arc<RealtimeState>, display: Arc<dyn FrameDisplay>, source: FrameSource) -> Self {
        let arrivals_rx = state.subscribe_images();
        Self {
            state,
            display,
            source,
            shown: None,
            arrivals_rx,
            closed: false,
        }
    }

    pub fn source(&self) -> &FrameSource {
        &self.source
    }

    /// Handle currently on screen.
    pub fn current(&self) -> Option<DisplayHandle> {
        self.shown.map(|s| s.handle)
    }

    pub fn shown_sequence(&self) -> Option<u64> {
        self.shown.map(|s| s.sequence)
    }

    /// Displays the next frame, replacing the current one.
    ///
    /// Returns `Ok(None)` when there is nothing new to show (the current
    /// frame stays up) or the viewer is closed. If the display rejects the
    /// frame, the frame is dropped and the current one stays up.
    pub fn show_next(&mut self) -> Result<Option<DisplayHandle>, DisplayError> {
        if self.closed {
            return Ok(None);
        }
        let Some(frame) = self.next_frame() else {
            return Ok(None);
        };

        let device_id = match &self.source {
            FrameSource::Device(id) => Some(id),
            FrameSource::LatestBinary => None,
        };
        let handle = self.display.create(device_id, &frame)?;

        if let Some(previous) = self.shown.replace(Shown {
            handle,
            sequence: frame.sequence,
        }) {
            self.release(previous.handle);
        }
        debug!(sequence = frame.sequence, handle = handle.raw(), "Frame displayed");
        Ok(Some(handle))
    }

    fn next_frame(&self) -> Option<ImageFrame> {
        match &self.source {
            FrameSource::Device(id) => self.state.pop_image(id),
            FrameSource::LatestBinary => self
                .state
                .latest_binary()
                .filter(|f| self.shown.map_or(true, |s| s.sequence != f.sequence)),
        }
    }

    /// Waits for a new frame to arrive anywhere on the channel.
    pub async fn changed(&mut self) {
        let _ = self.arrivals_rx.changed().await;
    }

    /// Releases the frame on screen. Safe to call more than once.
    pub fn close(&mut self) {
        self.closed = true;
        if let Some(shown) = self.shown.take() {
            self.release(shown.handle);
        }
    }

    fn release(&self, handle: DisplayHandle) {
        if let Err(error) = self.display.release(handle) {
            warn!(handle = handle.raw(), error = %error, "Display handle release failed");
        }
    }
}

impl Drop for InferenceViewer {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for InferenceViewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceViewer")
            .field("source", &self.source)
            .field("shown", &self.shown.map(|s| s.sequence))
            .field("closed", &self.closed)
            .finish()
    }
}

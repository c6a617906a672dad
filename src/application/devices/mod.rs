//! Device consumers: trackers, command handling and the inference viewer.

mod commands;
mod inference_viewer;
mod tracker;

pub use commands::{CommandError, DeviceCommandHandler};
pub use inference_viewer::{FrameSource, InferenceViewer};
pub use tracker::{AppliedTransition, DeviceTracker, TrackerScope};

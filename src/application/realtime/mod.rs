//! Realtime channel: connection lifecycle, frame routing and the sinks
//! consumers read from.

mod binding;
mod client;
mod pipeline;
mod reconnect;
mod state;

pub use binding::spawn_session_binding;
pub use client::{ChannelSettings, InitOutcome, RealtimeClient, DEFAULT_CLOSE_TIMEOUT};
pub use pipeline::{decode_image_async, process_frame, DropReason, FrameOutcome};
pub use reconnect::ReconnectPolicy;
pub use state::{RealtimeState, SinkLimits};

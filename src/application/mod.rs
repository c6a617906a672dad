//! Application layer - orchestrates domain logic over the ports.
//!
//! - [`realtime`] - the realtime channel and the sinks it fills
//! - [`session`] - the session/identity provider
//! - [`devices`] - consumers of realtime state (trackers, viewers) and
//!   device command handling

pub mod devices;
pub mod realtime;
pub mod session;

pub use devices::{
    AppliedTransition, CommandError, DeviceCommandHandler, DeviceTracker, FrameSource,
    InferenceViewer, TrackerScope,
};
pub use realtime::{
    spawn_session_binding, ChannelSettings, InitOutcome, RealtimeClient, RealtimeState,
    ReconnectPolicy, SinkLimits,
};
pub use session::SessionProvider;

//! Realtime module - inbound event protocol and the shapes it is routed into.
//!
//! - [`event`] - tagged union of server-pushed events and frame parsing
//! - [`classify`] - maps an event to its sink
//! - [`BoundedBuffer`] - per-device image and log buffers
//! - [`TransitionLog`] - ordered, multi-reader transition log
//! - [`frame`] - decoded inference images

mod buffer;
pub mod classify;
pub mod event;
pub mod frame;
mod status;
mod transition_log;

pub use buffer::{BoundedBuffer, DEFAULT_BUFFER_CAPACITY};
pub use classify::{classify, RoutedEvent};
pub use event::{parse_frame, FrameError, InboundEvent, JobStatus, LogEntry, LogLevel};
pub use frame::{decode_image, DecodeOutcome, ImageFrame};
pub use status::ChannelStatus;
pub use transition_log::{
    CursorId, CursorStart, SequencedTransition, TransitionBatch, TransitionLog,
    DEFAULT_TRANSITION_RETENTION,
};

//! Inbound frame pipeline: parse, classify, decode, write.

use tracing::{debug, warn};

use crate::domain::foundation::DeviceId;
use crate::domain::realtime::{
    classify, decode_image, parse_frame, DecodeOutcome, FrameError, RoutedEvent,
};
use crate::ports::InboundFrame;

use super::state::RealtimeState;

/// What became of one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Transition { sequence: u64 },
    Image { device_id: DeviceId, sequence: u64 },
    Log { device_id: DeviceId },
    LegacyImage { sequence: u64 },
    /// The frame was unusable and was dropped.
    Dropped(DropReason),
    /// The connection that produced the frame is no longer accepted.
    Refused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Frame(FrameError),
    Decode { device_id: DeviceId, reason: String },
}

/// Decodes a base64 image on the blocking pool.
///
/// A panicking or cancelled decode task is reported as `DecodeFailed`.
pub async fn decode_image_async(encoded: String) -> DecodeOutcome {
    match tokio::task::spawn_blocking(move || decode_image(&encoded)).await {
        Ok(outcome) => outcome,
        Err(e) => DecodeOutcome::DecodeFailed(format!("decode task failed: {}", e)),
    }
}

/// Routes one frame into `state` on behalf of `generation`.
pub async fn process_frame(
    state: &RealtimeState,
    generation: u64,
    frame: InboundFrame,
) -> FrameOutcome {
    let text = match frame {
        InboundFrame::Binary(data) => {
            return state
                .record_binary(generation, data)
                .map_or(FrameOutcome::Refused, |sequence| FrameOutcome::LegacyImage {
                    sequence,
                })
        }
        InboundFrame::Text(text) => text,
    };

    let event = match parse_frame(&text) {
        Ok(event) => event,
        Err(error) => {
            match &error {
                FrameError::UnknownAction(action) => {
                    warn!(generation, action = %action, "Dropping frame with unknown action")
                }
                other => warn!(generation, error = %other, "Dropping malformed frame"),
            }
            return FrameOutcome::Dropped(DropReason::Frame(error));
        }
    };

    match classify(event) {
        RoutedEvent::Transition(transition) => {
            debug!(
                generation,
                device_id = %transition.device_id,
                action = ?transition.action,
                "Transition received"
            );
            state
                .record_transition(generation, transition)
                .map_or(FrameOutcome::Refused, |sequence| FrameOutcome::Transition {
                    sequence,
                })
        }
        RoutedEvent::Image { device_id, encoded } => match decode_image_async(encoded).await {
            DecodeOutcome::Decoded(bytes) => state
                .record_image(generation, device_id.clone(), bytes)
                .map_or(FrameOutcome::Refused, |sequence| FrameOutcome::Image {
                    device_id,
                    sequence,
                }),
            DecodeOutcome::DecodeFailed(reason) => {
                warn!(generation, device_id = %device_id, reason = %reason, "Dropping undecodable image");
                FrameOutcome::Dropped(DropReason::Decode { device_id, reason })
            }
        },
        RoutedEvent::Log { device_id, entry } => {
            if state.record_log(generation, device_id.clone(), entry) {
                FrameOutcome::Log { device_id }
            } else {
                FrameOutcome::Refused
            }
        }
    }
}

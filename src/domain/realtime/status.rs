//! Realtime channel connection status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Observable state of the realtime channel.
///
/// Published through a `watch` channel; consumers only ever see the latest
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ChannelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelStatus::Disconnected => "disconnected",
            ChannelStatus::Connecting => "connecting",
            ChannelStatus::Connected => "connected",
            ChannelStatus::Error => "error",
        }
    }

    /// True while a connection is being attempted or is open.
    pub fn is_active(&self) -> bool {
        matches!(self, ChannelStatus::Connecting | ChannelStatus::Connected)
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_disconnected() {
        assert_eq!(ChannelStatus::default(), ChannelStatus::Disconnected);
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&ChannelStatus::Connecting).unwrap();
        assert_eq!(json, "\"connecting\"");
    }

    #[test]
    fn only_connecting_and_connected_are_active() {
        assert!(ChannelStatus::Connecting.is_active());
        assert!(ChannelStatus::Connected.is_active());
        assert!(!ChannelStatus::Error.is_active());
        assert!(!ChannelStatus::Disconnected.is_active());
    }
}

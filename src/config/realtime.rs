//! Realtime channel configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::realtime::{ChannelSettings, ReconnectPolicy, SinkLimits};
use crate::domain::realtime::{DEFAULT_BUFFER_CAPACITY, DEFAULT_TRANSITION_RETENTION};

use super::error::ValidationError;

/// Realtime channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Images kept per device
    #[serde(default = "default_buffer_capacity")]
    pub image_buffer_capacity: usize,

    /// Log lines kept per device
    #[serde(default = "default_buffer_capacity")]
    pub log_buffer_capacity: usize,

    /// Transitions kept when no tracker holds them
    #[serde(default = "default_transition_retention")]
    pub transition_retention: usize,

    /// Upper bound on waiting for the transport to close, in milliseconds
    #[serde(default = "default_close_timeout")]
    pub close_timeout_ms: u64,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Reconnection after a transport failure
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Unlimited when absent
    pub max_attempts: Option<u32>,

    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl RealtimeConfig {
    pub fn sink_limits(&self) -> SinkLimits {
        SinkLimits {
            image_capacity: self.image_buffer_capacity,
            log_capacity: self.log_buffer_capacity,
            transition_retention: self.transition_retention,
        }
    }

    pub fn channel_settings(&self) -> ChannelSettings {
        ChannelSettings {
            close_timeout: Duration::from_millis(self.close_timeout_ms),
            reconnect: self.reconnect.policy(),
        }
    }

    /// Validate realtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.image_buffer_capacity == 0
            || self.log_buffer_capacity == 0
            || self.transition_retention == 0
        {
            return Err(ValidationError::InvalidBufferCapacity);
        }
        if self.close_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        self.reconnect.validate()
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: self.enabled,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts,
            jitter: self.jitter,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_delay_ms == 0 || self.base_delay_ms > self.max_delay_ms {
            return Err(ValidationError::InvalidBackoff);
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            image_buffer_capacity: default_buffer_capacity(),
            log_buffer_capacity: default_buffer_capacity(),
            transition_retention: default_transition_retention(),
            close_timeout_ms: default_close_timeout(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            max_attempts: None,
            jitter: default_jitter(),
        }
    }
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_transition_retention() -> usize {
    DEFAULT_TRANSITION_RETENTION
}

fn default_close_timeout() -> u64 {
    2000
}

fn default_base_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_jitter() -> bool {
    true
}

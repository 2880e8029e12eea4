//! Channel configuration.

use std::time::Duration;

/// Real-time channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// How long to wait for an acknowledgement
    pub ack_timeout: Duration,
    /// Updates buffered per room subscription before new ones are dropped
    pub room_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(5),
            room_buffer: 64,
        }
    }
}

impl RealtimeConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub const fn builder() -> RealtimeConfigBuilder {
        RealtimeConfigBuilder {
            ack_timeout: None,
            room_buffer: None,
        }
    }
}

/// Builder for [`RealtimeConfig`].
#[derive(Debug, Clone)]
pub struct RealtimeConfigBuilder {
    ack_timeout: Option<Duration>,
    room_buffer: Option<usize>,
}

impl RealtimeConfigBuilder {
    /// Set the acknowledgement timeout.
    #[must_use]
    pub const fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = Some(timeout);
        self
    }

    /// Set the per-subscription buffer. Zero is raised to one.
    #[must_use]
    pub const fn room_buffer(mut self, buffer: usize) -> Self {
        self.room_buffer = Some(buffer);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> RealtimeConfig {
        let defaults = RealtimeConfig::default();
        RealtimeConfig {
            ack_timeout: self.ack_timeout.unwrap_or(defaults.ack_timeout),
            room_buffer: self.room_buffer.unwrap_or(defaults.room_buffer).max(1),
        }
    }
}

//! Hub configuration

use std::time::Duration;

/// Configuration for the connection manager and broadcast hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Interval between keep-alive frames on each connection
    pub heartbeat_interval: Duration,

    /// A connection is considered stale after this many missed heartbeat
    /// intervals without a successful push
    pub stale_multiplier: u32,

    /// Per-connection frame buffer capacity; a full buffer counts as a
    /// delivery failure
    pub connection_buffer: usize,

    /// How often the staleness reaper sweeps the registry
    pub reaper_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            stale_multiplier: 2,
            connection_buffer: 64,
            reaper_interval: Duration::from_secs(30),
        }
    }
}

impl HubConfig {
    /// Set the heartbeat interval (the reaper sweeps at the same cadence)
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self.reaper_interval = interval;
        self
    }

    /// Set the stale multiplier
    pub fn stale_multiplier(mut self, multiplier: u32) -> Self {
        self.stale_multiplier = multiplier;
        self
    }

    /// Set the per-connection buffer capacity (minimum 1, so the connected
    /// acknowledgement frame always fits)
    pub fn connection_buffer(mut self, capacity: usize) -> Self {
        self.connection_buffer = capacity.max(1);
        self
    }

    /// Age past which a connection without a successful heartbeat is purged
    pub fn stale_timeout(&self) -> Duration {
        self.heartbeat_interval * self.stale_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();

        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.stale_multiplier, 2);
        assert_eq!(config.stale_timeout(), Duration::from_secs(60));
        assert!(config.connection_buffer > 0);
    }

    #[test]
    fn test_builder_chaining() {
        let config = HubConfig::default()
            .heartbeat_interval(Duration::from_secs(5))
            .stale_multiplier(3)
            .connection_buffer(16);

        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.reaper_interval, Duration::from_secs(5));
        assert_eq!(config.stale_timeout(), Duration::from_secs(15));
        assert_eq!(config.connection_buffer, 16);
    }

    #[test]
    fn test_buffer_floor() {
        let config = HubConfig::default().connection_buffer(0);

        assert_eq!(config.connection_buffer, 1);
    }
}

//! Configuration type definitions.

use std::time::Duration;

/// Default pause between idle worker poll iterations, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 0.5;

/// Default capacity of each bridge channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub discord: DiscordConfig,
    pub bridge: BridgeConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscordConfig {
    pub token: String,
    /// Seconds the worker sleeps when a poll iteration found no work.
    pub poll_interval: f64,
}

impl DiscordConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            poll_interval: DEFAULT_POLL_INTERVAL_SECS,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECS))
    }
}

/// Bridge transport settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Capacity of each of the five channels.
    pub queue_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Config {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            discord: DiscordConfig::new(token),
            bridge: BridgeConfig::default(),
        }
    }
}

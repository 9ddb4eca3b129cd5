//! Engine configuration.

use std::time::Duration;

/// Configuration for the notification sync engine.
///
/// The timing defaults are the subsystem's design values; tests shrink them
/// via paused time rather than overriding.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the remote notification service (e.g. `https://api.example.com`).
    pub base_url: String,
    /// WebSocket URL of the push channel endpoint.
    pub push_url: String,
    /// Maximum number of notifications requested per list pull.
    pub list_limit: u32,
    /// Period of the scheduler's two-step pull.
    pub poll_interval: Duration,
    /// Stagger between the list pull and the unread-count pull.
    pub count_pull_delay: Duration,
    /// Fixed delay before a reconnect attempt after the push channel drops.
    pub reconnect_delay: Duration,
    /// Cool-down window the breaker stays open after a rate-limit signal.
    pub breaker_cooldown: Duration,
    /// Capacity of the store event queue.
    pub event_queue_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            push_url: String::new(),
            list_limit: 50,
            poll_interval: Duration::from_secs(5 * 60),
            count_pull_delay: Duration::from_secs(3),
            reconnect_delay: Duration::from_secs(5),
            breaker_cooldown: Duration::from_secs(10 * 60),
            event_queue_capacity: 256,
        }
    }
}

impl SyncConfig {
    /// Create a config for the given service endpoints with default timings.
    pub fn new(base_url: impl Into<String>, push_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            push_url: push_url.into(),
            ..Self::default()
        }
    }
}

//! Shared-fate rate-limit circuit breaker.
//!
//! Once any caller observes a 429-class response the breaker opens for a
//! fixed cool-down, and every guarded caller short-circuits without touching
//! the network until it closes. Nothing is queued or replayed; callers retry
//! on their own natural schedule (the scheduler's next tick, or the user
//! re-invoking an action). This is not a token-bucket limiter.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Breaker handle shared by the scheduler and the action handlers.
pub type SharedBreaker = Arc<Mutex<RateLimitBreaker>>;

/// Open/closed guard with a fixed cool-down deadline.
///
/// Closing happens purely by elapsed time (optimistic close, no probe):
/// `is_open` compares against the stored deadline, which is observably
/// identical to a single close timer firing at that deadline.
#[derive(Debug)]
pub struct RateLimitBreaker {
    cooldown: Duration,
    open_until: Option<Instant>,
}

impl RateLimitBreaker {
    /// Create a closed breaker with the given cool-down window.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            open_until: None,
        }
    }

    /// Create a shared handle around a closed breaker.
    pub fn shared(cooldown: Duration) -> SharedBreaker {
        Arc::new(Mutex::new(Self::new(cooldown)))
    }

    /// Whether the breaker is currently open (calls must be skipped).
    pub fn is_open(&self) -> bool {
        self.open_until.is_some_and(|deadline| Instant::now() < deadline)
    }

    /// Open the breaker after observing a rate-limit signal.
    ///
    /// Idempotent: tripping while already open leaves the existing deadline
    /// untouched, bounding the worst-case suspension at one cool-down from
    /// the first signal.
    pub fn trip(&mut self) {
        if self.is_open() {
            debug!("rate limit re-observed while breaker already open");
            return;
        }
        let deadline = Instant::now() + self.cooldown;
        self.open_until = Some(deadline);
        warn!(
            cooldown_secs = self.cooldown.as_secs(),
            "rate limit observed, suspending notification requests"
        );
    }

    /// Time remaining until the breaker closes, if open.
    pub fn remaining(&self) -> Option<Duration> {
        self.open_until
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .filter(|d| !d.is_zero())
    }
}

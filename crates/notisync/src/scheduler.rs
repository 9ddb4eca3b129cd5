//! Periodic pull driver keeping the store eventually consistent.
//!
//! The scheduler issues a "list notifications" pull immediately on start,
//! an "unread count" pull after a short fixed stagger, and repeats the pair
//! on a fixed period. Every pull consults the credential and the shared
//! breaker first; a skipped pull is not queued or retried early — the next
//! periodic tick is the retry point.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::NotificationApi;
use crate::auth::AuthProvider;
use crate::breaker::SharedBreaker;
use crate::error::{Result, SyncError};
use crate::store::StoreEvent;

/// Guarded pull operations shared by the scheduler and the connection
/// manager (which refreshes the unread count after each push delivery).
#[derive(Clone)]
pub(crate) struct PullDriver {
    api: Arc<dyn NotificationApi>,
    auth: Arc<dyn AuthProvider>,
    breaker: SharedBreaker,
    events: mpsc::Sender<StoreEvent>,
    list_limit: u32,
}

impl PullDriver {
    pub(crate) fn new(
        api: Arc<dyn NotificationApi>,
        auth: Arc<dyn AuthProvider>,
        breaker: SharedBreaker,
        events: mpsc::Sender<StoreEvent>,
        list_limit: u32,
    ) -> Self {
        Self {
            api,
            auth,
            breaker,
            events,
            list_limit,
        }
    }

    /// Uniform pre-call check: pulls are skipped entirely when no credential
    /// exists or the breaker is open, without contacting the network.
    fn guard(&self) -> Result<()> {
        if self.auth.token().is_none() || self.breaker.lock().is_open() {
            return Err(SyncError::Throttled);
        }
        Ok(())
    }

    /// Open the breaker if the error is the server rate-limit signal.
    fn note_rate_limit(&self, err: &SyncError) {
        if err.is_rate_limit() {
            self.breaker.lock().trip();
        }
    }

    async fn submit(&self, event: StoreEvent) {
        if self.events.send(event).await.is_err() {
            warn!("store task is gone, dropping event");
        }
    }

    /// Pull the full notification list into the store.
    pub(crate) async fn pull_list(&self) -> Result<()> {
        self.guard()?;
        self.submit(StoreEvent::SetLoading(true)).await;
        let outcome = match self.api.list(self.list_limit).await {
            Ok(items) => {
                debug!(count = items.len(), "list pull succeeded");
                self.submit(StoreEvent::SetList(items)).await;
                self.submit(StoreEvent::ClearError).await;
                Ok(())
            }
            Err(err) => {
                self.note_rate_limit(&err);
                self.submit(StoreEvent::SetError(Some(err.to_string()))).await;
                Err(err)
            }
        };
        self.submit(StoreEvent::SetLoading(false)).await;
        outcome
    }

    /// Pull the authoritative unread count into the store.
    pub(crate) async fn pull_unread_count(&self) -> Result<()> {
        self.guard()?;
        match self.api.unread_count().await {
            Ok(count) => {
                debug!(count, "unread count pull succeeded");
                self.submit(StoreEvent::SetUnreadCount(count)).await;
                Ok(())
            }
            Err(err) => {
                self.note_rate_limit(&err);
                self.submit(StoreEvent::SetError(Some(err.to_string()))).await;
                Err(err)
            }
        }
    }
}

/// Fixed-period two-step pull loop.
pub(crate) struct SyncScheduler {
    pub(crate) pulls: PullDriver,
    pub(crate) poll_interval: Duration,
    pub(crate) count_pull_delay: Duration,
    pub(crate) shutdown: CancellationToken,
}

impl SyncScheduler {
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // First tick completes immediately: the initial pull happens on
            // subsystem start.
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(err) = self.pulls.pull_list().await {
                debug!(error = %err, "list pull skipped or failed");
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = sleep(self.count_pull_delay) => {}
            }

            if let Err(err) = self.pulls.pull_unread_count().await {
                debug!(error = %err, "unread count pull skipped or failed");
            }
        }
        debug!("sync scheduler stopped");
    }
}

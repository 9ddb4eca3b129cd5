//! Public facade wiring the store, scheduler, and connection manager.
//!
//! [`NotificationSync`] is the handle callers hold for one session: it
//! exposes read-only snapshots of the store and connection status, the
//! user-triggered action handlers, and teardown. Actions never mutate the
//! store optimistically — the corresponding transition is submitted only
//! after the server confirms.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{HttpNotificationApi, NotificationApi};
use crate::auth::AuthProvider;
use crate::breaker::{RateLimitBreaker, SharedBreaker};
use crate::config::SyncConfig;
use crate::connection::{ConnectionManager, ConnectionStatus, PushTransport, WebSocketTransport};
use crate::error::{Result, SyncError};
use crate::model::NotificationSettings;
use crate::scheduler::{PullDriver, SyncScheduler};
use crate::store::{self, StoreEvent, StoreState};

/// Handle to a running notification sync session.
pub struct NotificationSync {
    api: Arc<dyn NotificationApi>,
    auth: Arc<dyn AuthProvider>,
    breaker: SharedBreaker,
    events: mpsc::Sender<StoreEvent>,
    state: watch::Receiver<StoreState>,
    connection: watch::Receiver<ConnectionStatus>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl NotificationSync {
    /// Start a session against a live service: HTTP pull channel plus
    /// websocket push channel.
    pub fn connect(config: SyncConfig, auth: Arc<dyn AuthProvider>) -> Self {
        let api = Arc::new(HttpNotificationApi::new(config.base_url.clone(), auth.clone()));
        let transport = WebSocketTransport::new(config.push_url.clone());
        Self::start(config, api, transport, auth)
    }

    /// Start a session with explicit API and push transport implementations.
    pub fn start(
        config: SyncConfig,
        api: Arc<dyn NotificationApi>,
        transport: impl PushTransport,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        info!("starting notification sync session");
        let breaker = RateLimitBreaker::shared(config.breaker_cooldown);
        let (events, state, store_task) = store::spawn(config.event_queue_capacity);
        let shutdown = CancellationToken::new();

        let pulls = PullDriver::new(
            api.clone(),
            auth.clone(),
            breaker.clone(),
            events.clone(),
            config.list_limit,
        );

        let scheduler_task = SyncScheduler {
            pulls: pulls.clone(),
            poll_interval: config.poll_interval,
            count_pull_delay: config.count_pull_delay,
            shutdown: shutdown.child_token(),
        }
        .spawn();

        let (status_tx, connection) = watch::channel(ConnectionStatus::default());
        let manager = ConnectionManager::new(
            transport,
            auth.clone(),
            events.clone(),
            pulls,
            status_tx,
            config.reconnect_delay,
            shutdown.child_token(),
        );
        let connection_task = tokio::spawn(manager.run());

        Self {
            api,
            auth,
            breaker,
            events,
            state,
            connection,
            shutdown,
            tasks: vec![store_task, scheduler_task, connection_task],
        }
    }

    /// Current store snapshot (list, unread count, settings, flags).
    pub fn state(&self) -> StoreState {
        self.state.borrow().clone()
    }

    /// Watch receiver notified after every store transition.
    pub fn watch_state(&self) -> watch::Receiver<StoreState> {
        self.state.clone()
    }

    /// Current connection status.
    pub fn connection(&self) -> ConnectionStatus {
        self.connection.borrow().clone()
    }

    /// Watch receiver notified on every connection status change.
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionStatus> {
        self.connection.clone()
    }

    /// Whether the push channel is currently up.
    pub fn connected(&self) -> bool {
        self.connection.borrow().connected()
    }

    /// Fail fast without a credential; short-circuit while the breaker is
    /// open. Runs before every action's network call.
    fn guard_action(&self) -> Result<()> {
        if self.auth.token().is_none() {
            return Err(SyncError::Unauthenticated);
        }
        if self.breaker.lock().is_open() {
            return Err(SyncError::Throttled);
        }
        Ok(())
    }

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

    /// Mark one notification as read, applying the transition only after the
    /// server confirms.
    pub async fn mark_as_read(&self, id: &str) -> Result<()> {
        self.guard_action()?;
        match self.api.mark_read(id).await {
            Ok(()) => {
                self.submit(StoreEvent::MarkRead(id.to_string())).await;
                Ok(())
            }
            Err(err) => {
                self.note_rate_limit(&err);
                Err(err)
            }
        }
    }

    /// Mark every notification as read (server-confirmed).
    pub async fn mark_all_as_read(&self) -> Result<()> {
        self.guard_action()?;
        match self.api.mark_all_read().await {
            Ok(()) => {
                self.submit(StoreEvent::MarkAllRead).await;
                Ok(())
            }
            Err(err) => {
                self.note_rate_limit(&err);
                Err(err)
            }
        }
    }

    /// Delete one notification (server-confirmed).
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.guard_action()?;
        match self.api.delete(id).await {
            Ok(()) => {
                self.submit(StoreEvent::Remove(id.to_string())).await;
                Ok(())
            }
            Err(err) => {
                self.note_rate_limit(&err);
                Err(err)
            }
        }
    }

    /// Fetch the settings blob into the store.
    pub async fn load_settings(&self) -> Result<NotificationSettings> {
        self.guard_action()?;
        match self.api.settings().await {
            Ok(settings) => {
                self.submit(StoreEvent::SetSettings(settings.clone())).await;
                Ok(settings)
            }
            Err(err) => {
                self.note_rate_limit(&err);
                Err(err)
            }
        }
    }

    /// Replace the settings blob, applying the server-confirmed value.
    pub async fn update_settings(&self, settings: NotificationSettings) -> Result<()> {
        self.guard_action()?;
        match self.api.update_settings(&settings).await {
            Ok(confirmed) => {
                self.submit(StoreEvent::SetSettings(confirmed)).await;
                Ok(())
            }
            Err(err) => {
                self.note_rate_limit(&err);
                Err(err)
            }
        }
    }

    /// Tear the session down: cancel the scheduler's timer and any pending
    /// reconnect, close the push channel, and stop the store task.
    pub async fn shutdown(self) {
        info!("shutting down notification sync session");
        self.shutdown.cancel();
        // Dropping the facade's producer handle lets the store task finish
        // once the scheduler and connection manager have released theirs.
        drop(self.events);
        for task in self.tasks {
            if let Err(err) = task.await {
                debug!(error = %err, "sync task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerToken;
    use crate::connection::PushStream;
    use crate::testing::{MockApi, sample};
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    /// Transport whose channel opens and then stays silent.
    struct SilentTransport;

    #[async_trait]
    impl PushTransport for SilentTransport {
        async fn connect(&self, _token: &str) -> Result<PushStream> {
            Ok(Box::pin(futures::stream::pending()))
        }
    }

    fn test_config() -> SyncConfig {
        SyncConfig::new("https://example.invalid", "wss://example.invalid/push")
    }

    async fn wait_for<F>(sync: &NotificationSync, mut predicate: F) -> StoreState
    where
        F: FnMut(&StoreState) -> bool,
    {
        let mut rx = sync.watch_state();
        loop {
            {
                let state = rx.borrow();
                if predicate(&state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("store task gone");
        }
    }

    fn start(api: Arc<MockApi>, auth: Arc<dyn AuthProvider>) -> NotificationSync {
        NotificationSync::start(test_config(), api, SilentTransport, auth)
    }

    #[tokio::test(start_paused = true)]
    async fn mark_as_read_applies_confirmed_transition() {
        let api = Arc::new(MockApi::default());
        *api.list_items.lock() = vec![sample("1", false)];
        let sync = start(api.clone(), BearerToken::new("token"));

        // Initial scheduled pull populates the store.
        wait_for(&sync, |s| !s.items.is_empty()).await;

        sync.mark_as_read("1").await.unwrap();
        let state = wait_for(&sync, |s| s.items[0].read).await;
        assert_eq!(state.unread_count, 0);
        assert!(api.ops().contains(&"mark_read:1".to_string()));

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_action_leaves_store_unchanged() {
        let api = Arc::new(MockApi::default());
        *api.list_items.lock() = vec![sample("1", false)];
        api.fail_actions.store(true, Ordering::SeqCst);
        let sync = start(api.clone(), BearerToken::new("token"));

        let before = wait_for(&sync, |s| !s.items.is_empty()).await;

        let err = sync.mark_as_read("1").await.unwrap_err();
        assert!(matches!(err, SyncError::Api { status: 500, .. }));

        // Give any stray event a chance to land, then compare.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let after = sync.state();
        assert_eq!(after.items, before.items);
        assert_eq!(after.unread_count, before.unread_count);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn actions_fail_fast_without_credential() {
        let api = Arc::new(MockApi::default());
        let sync = start(api.clone(), BearerToken::empty());

        let err = sync.delete("1").await.unwrap_err();
        assert!(matches!(err, SyncError::Unauthenticated));
        assert!(api.ops().iter().all(|op| !op.starts_with("delete")));

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_action_opens_breaker_for_all_callers() {
        let api = Arc::new(MockApi::default());
        api.rate_limit_actions.store(true, Ordering::SeqCst);
        let sync = start(api.clone(), BearerToken::new("token"));

        let err = sync.mark_all_as_read().await.unwrap_err();
        assert!(err.is_rate_limit());

        // The shared breaker now short-circuits the next action without a
        // network call.
        let calls_before = api.ops().len();
        let err = sync.delete("1").await.unwrap_err();
        assert_eq!(err.to_string(), "Not authenticated or rate limited.");
        assert_eq!(api.ops().len(), calls_before);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn update_settings_applies_confirmed_blob() {
        let api = Arc::new(MockApi::default());
        let sync = start(api.clone(), BearerToken::new("token"));

        let settings = NotificationSettings::from([(
            "push_enabled".to_string(),
            serde_json::Value::Bool(false),
        )]);
        sync.update_settings(settings.clone()).await.unwrap();

        let state = wait_for(&sync, |s| !s.settings.is_empty()).await;
        assert_eq!(state.settings, settings);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_all_pulls() {
        let api = Arc::new(MockApi::default());
        let sync = start(api.clone(), BearerToken::new("token"));

        wait_for(&sync, |s| !s.loading).await;
        sync.shutdown().await;

        let calls = api.ops().len();
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(api.ops().len(), calls, "no pull after teardown");
    }
}

//! Push channel lifecycle management.
//!
//! The connection manager owns one long-lived push connection: it connects
//! with the current credential, decodes inbound envelopes, forwards
//! notification deliveries to the store, and schedules exactly one reconnect
//! after a fixed delay whenever the channel drops. It is an explicitly owned
//! task handle, never a process-wide singleton.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::auth::AuthProvider;
use crate::error::{Result, SyncError};
use crate::model::PushEnvelope;
use crate::scheduler::PullDriver;
use crate::store::StoreEvent;

/// Stream of decoded text frames from the push channel.
pub type PushStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Transport behind the connection manager.
///
/// Production uses [`WebSocketTransport`]; tests substitute a scripted
/// implementation.
#[async_trait]
pub trait PushTransport: Send + Sync + 'static {
    /// Open the push channel with the given credential.
    async fn connect(&self, token: &str) -> Result<PushStream>;
}

/// WebSocket push transport passing the credential as a `token` query
/// parameter on the connection URL.
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl PushTransport for WebSocketTransport {
    async fn connect(&self, token: &str) -> Result<PushStream> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| SyncError::connection(format!("invalid push url: {e}")))?;
        url.query_pairs_mut().append_pair("token", token);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| SyncError::connection(e.to_string()))?;

        let frames = ws_stream.filter_map(|frame| async move {
            match frame {
                Ok(Message::Text(text)) => Some(Ok(text.to_string())),
                // Control frames carry no envelopes; the stream itself ends
                // after a close frame.
                Ok(_) => None,
                Err(e) => Some(Err(SyncError::connection(e.to_string()))),
            }
        });
        Ok(Box::pin(frames))
    }
}

/// Push channel lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Connection-status flags exposed to callers alongside the store snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub last_error: Option<String>,
}

impl ConnectionStatus {
    /// Whether the push channel is currently up.
    pub fn connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Owns the push channel for one session.
pub(crate) struct ConnectionManager<T: PushTransport> {
    transport: T,
    auth: Arc<dyn AuthProvider>,
    events: mpsc::Sender<StoreEvent>,
    pulls: PullDriver,
    status: watch::Sender<ConnectionStatus>,
    reconnect_delay: Duration,
    shutdown: CancellationToken,
}

impl<T: PushTransport> ConnectionManager<T> {
    pub(crate) fn new(
        transport: T,
        auth: Arc<dyn AuthProvider>,
        events: mpsc::Sender<StoreEvent>,
        pulls: PullDriver,
        status: watch::Sender<ConnectionStatus>,
        reconnect_delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transport,
            auth,
            events,
            pulls,
            status,
            reconnect_delay,
            shutdown,
        }
    }

    fn set_status(&self, state: ConnectionState, last_error: Option<String>) {
        self.status.send_replace(ConnectionStatus { state, last_error });
    }

    pub(crate) async fn run(self) {
        let conn_id = uuid::Uuid::new_v4();

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            // A connect attempt requires a credential. Without one the
            // manager parks in an error state and schedules no retry; a new
            // session (with a credential) starts a fresh manager.
            let Some(token) = self.auth.token() else {
                warn!(%conn_id, "no credential for push channel, abandoning connect");
                self.set_status(ConnectionState::Error, Some("not authenticated".into()));
                return;
            };

            self.set_status(ConnectionState::Connecting, None);
            debug!(%conn_id, "connecting push channel");

            let connect = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                res = self.transport.connect(&token) => res,
            };

            match connect {
                Ok(mut frames) => {
                    info!(%conn_id, "push channel connected");
                    self.set_status(ConnectionState::Connected, None);

                    loop {
                        tokio::select! {
                            _ = self.shutdown.cancelled() => {
                                self.set_status(ConnectionState::Disconnected, None);
                                debug!(%conn_id, "connection manager stopped");
                                return;
                            }
                            frame = frames.next() => match frame {
                                Some(Ok(text)) => self.handle_frame(&text).await,
                                Some(Err(err)) => {
                                    warn!(%conn_id, error = %err, "push channel error");
                                    self.set_status(
                                        ConnectionState::Disconnected,
                                        Some(err.to_string()),
                                    );
                                    break;
                                }
                                None => {
                                    info!(%conn_id, "push channel closed");
                                    self.set_status(ConnectionState::Disconnected, None);
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(%conn_id, error = %err, "push channel connect failed");
                    self.set_status(ConnectionState::Error, Some(err.to_string()));
                }
            }

            // Exactly one reconnect is pending at any time: this is the only
            // place a reconnect is scheduled, and teardown cancels it.
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = sleep(self.reconnect_delay) => {}
            }
        }

        self.set_status(ConnectionState::Disconnected, None);
        debug!(%conn_id, "connection manager stopped");
    }

    async fn handle_frame(&self, text: &str) {
        match serde_json::from_str::<PushEnvelope>(text) {
            Ok(PushEnvelope::Notification { notification }) => {
                debug!(id = %notification.id, "push notification received");
                if self
                    .events
                    .send(StoreEvent::AddOne(notification))
                    .await
                    .is_err()
                {
                    return;
                }
                // A push delivery triggers one authoritative count refresh
                // outside the scheduler's own period.
                if let Err(err) = self.pulls.pull_unread_count().await {
                    debug!(error = %err, "unread count refresh after push failed");
                }
            }
            Err(err) => {
                trace!(error = %err, "discarding unrecognized push envelope");
            }
        }
    }
}

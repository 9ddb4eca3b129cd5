//! Notisync: client-side notification synchronization engine.
//!
//! Keeps a local view of a user's notifications and unread counter
//! consistent with a remote service over two channels: a persistent push
//! connection for low-latency delivery and a periodic pull as fallback and
//! consistency check.
//!
//! ## Core Types
//!
//! - [`NotificationSync`] - Session handle: snapshots, actions, teardown
//! - [`StoreState`] / [`StoreEvent`] - Canonical local state and its
//!   transition function
//! - [`RateLimitBreaker`] - Shared cool-down guard after a server 429
//! - [`ConnectionStatus`] - Push channel state flags
//!
//! ## Seams
//!
//! - [`NotificationApi`] - Remote service operations (reqwest-backed
//!   [`HttpNotificationApi`] in production)
//! - [`PushTransport`] - Push channel transport (websocket-backed
//!   [`WebSocketTransport`] in production)
//! - [`AuthProvider`] - Synchronously queryable bearer credential
//!
//! ## Example
//!
//! ```no_run
//! use notisync::{BearerToken, NotificationSync, SyncConfig};
//!
//! # async fn run() {
//! let auth = BearerToken::new("token");
//! let config = SyncConfig::new("https://api.example.com", "wss://api.example.com/push");
//! let sync = NotificationSync::connect(config, auth);
//!
//! let state = sync.state();
//! println!("{} unread", state.unread_count);
//!
//! sync.mark_all_as_read().await.unwrap();
//! sync.shutdown().await;
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod breaker;
pub mod config;
pub mod connection;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{HttpNotificationApi, NotificationApi};
pub use auth::{AuthProvider, BearerToken};
pub use breaker::{RateLimitBreaker, SharedBreaker};
pub use config::SyncConfig;
pub use connection::{
    ConnectionState, ConnectionStatus, PushStream, PushTransport, WebSocketTransport,
};
pub use error::{Result, SyncError};
pub use model::{Notification, NotificationKind, NotificationSettings, PushEnvelope};
pub use service::NotificationSync;
pub use store::{StoreEvent, StoreState};

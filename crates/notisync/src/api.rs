//! Remote notification service client.
//!
//! [`NotificationApi`] is the seam the scheduler, connection manager, and
//! action handlers call through; [`HttpNotificationApi`] is the production
//! implementation over reqwest. Tests substitute a recording mock.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::auth::AuthProvider;
use crate::error::{Result, SyncError};
use crate::model::{Notification, NotificationSettings};

/// Pull and action operations against the remote notification service.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Fetch the newest notifications, most-recent-first.
    async fn list(&self, limit: u32) -> Result<Vec<Notification>>;

    /// Fetch the authoritative unread count.
    async fn unread_count(&self) -> Result<u64>;

    /// Mark one notification as read.
    async fn mark_read(&self, id: &str) -> Result<()>;

    /// Mark every notification as read.
    async fn mark_all_read(&self) -> Result<()>;

    /// Delete one notification.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Fetch the settings blob.
    async fn settings(&self) -> Result<NotificationSettings>;

    /// Replace the settings blob; returns the server-confirmed value.
    async fn update_settings(&self, settings: &NotificationSettings)
    -> Result<NotificationSettings>;
}

#[derive(Deserialize)]
struct ListResponse {
    notifications: Vec<Notification>,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct SettingsResponse {
    settings: NotificationSettings,
}

/// Build the default HTTP client for the pull channel.
pub fn default_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("failed to create HTTP client")
}

/// Reqwest-backed implementation of [`NotificationApi`].
///
/// Every call queries the auth provider first and fails fast with
/// [`SyncError::Unauthenticated`] when no credential exists, without touching
/// the network.
pub struct HttpNotificationApi {
    client: Client,
    base_url: String,
    auth: Arc<dyn AuthProvider>,
}

impl HttpNotificationApi {
    /// Create a client for the given service base URL.
    pub fn new(base_url: impl Into<String>, auth: Arc<dyn AuthProvider>) -> Self {
        Self::with_client(default_client(), base_url, auth)
    }

    /// Create a client reusing an existing reqwest client.
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            auth,
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.auth.token().ok_or(SyncError::Unauthenticated)?;
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "notification api request");
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| {
                body.get("message")
                    .or_else(|| body.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_default();
        Err(map_status(status, message))
    }
}

/// Map a non-success HTTP status to the error taxonomy.
fn map_status(status: StatusCode, message: String) -> SyncError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => SyncError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Unauthenticated,
        _ => SyncError::api(
            status.as_u16(),
            if message.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                message
            },
        ),
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn list(&self, limit: u32) -> Result<Vec<Notification>> {
        let builder = self
            .request(Method::GET, "/notifications")?
            .query(&[("limit", limit)]);
        let body: ListResponse = self.send(builder).await?.json().await?;
        Ok(body.notifications)
    }

    async fn unread_count(&self) -> Result<u64> {
        let builder = self.request(Method::GET, "/notifications/unread-count")?;
        let body: CountResponse = self.send(builder).await?.json().await?;
        Ok(body.count)
    }

    async fn mark_read(&self, id: &str) -> Result<()> {
        let builder = self.request(Method::PATCH, &format!("/notifications/{id}/read"))?;
        self.send(builder).await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<()> {
        let builder = self.request(Method::PATCH, "/notifications/read-all")?;
        self.send(builder).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("/notifications/{id}"))?;
        self.send(builder).await?;
        Ok(())
    }

    async fn settings(&self) -> Result<NotificationSettings> {
        let builder = self.request(Method::GET, "/notifications/settings")?;
        let body: SettingsResponse = self.send(builder).await?.json().await?;
        Ok(body.settings)
    }

    async fn update_settings(
        &self,
        settings: &NotificationSettings,
    ) -> Result<NotificationSettings> {
        let builder = self
            .request(Method::PUT, "/notifications/settings")?
            .json(&serde_json::json!({ "settings": settings }));
        let body: SettingsResponse = self.send(builder).await?.json().await?;
        Ok(body.settings)
    }
}

//! Notification sync error types.

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while synchronizing notifications.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No credential is available; no network attempt was made.
    #[error("not authenticated")]
    Unauthenticated,

    /// The server signaled a rate limit (HTTP 429). Observing this opens
    /// the shared breaker.
    #[error("rate limited by server")]
    RateLimited,

    /// The call was short-circuited before reaching the network because the
    /// breaker is open or no credential exists. The display string is the
    /// uniform client-facing outcome for skipped pulls.
    #[error("Not authenticated or rate limited.")]
    Throttled,

    /// The server rejected the request with a non-2xx status.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level HTTP errors (connect, timeout, body).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed JSON in a response body.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Push channel errors (websocket connect/read failures).
    #[error("connection error: {0}")]
    Connection(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an API error from a status code and server message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error is the server-side rate-limit signal.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

//! Credential source for both channels.
//!
//! Session issuance is an external concern; the engine only queries the
//! current bearer credential right before each network attempt.

use parking_lot::RwLock;
use std::sync::Arc;

/// Synchronously queryable source of the current bearer credential.
pub trait AuthProvider: Send + Sync {
    /// The current credential, or `None` when the session is signed out.
    fn token(&self) -> Option<String>;
}

/// An updatable bearer token, shared between the application's session
/// management and the sync engine.
#[derive(Debug, Default)]
pub struct BearerToken {
    token: RwLock<Option<String>>,
}

impl BearerToken {
    /// Create a token holder with an initial credential.
    pub fn new(token: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            token: RwLock::new(Some(token.into())),
        })
    }

    /// Create an empty (signed-out) token holder.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the credential (e.g. after refresh or sign-in).
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Clear the credential (sign-out).
    pub fn clear(&self) {
        *self.token.write() = None;
    }
}

impl AuthProvider for BearerToken {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

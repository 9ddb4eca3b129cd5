//! Core notification types shared by the push and pull channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Notification severity/category, a closed set mirrored from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// A single notification as delivered by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Opaque unique ID.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Message body.
    pub message: String,
    /// Type tag.
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    /// Whether the user has read this notification.
    #[serde(default)]
    pub read: bool,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Per-user notification settings blob (string -> bool/number values).
pub type NotificationSettings = HashMap<String, serde_json::Value>;

/// Tagged wrapper around a push message body.
///
/// Only the `notification` tag carries a payload this subsystem acts on;
/// envelopes with any other tag are dropped by the connection manager.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEnvelope {
    /// A freshly created notification delivered over the push channel.
    Notification { notification: Notification },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        "2026-01-15T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn notification_round_trips_with_type_tag() {
        let n = Notification {
            id: "n1".into(),
            title: "Booking confirmed".into(),
            message: "Your table for two is booked.".into(),
            kind: NotificationKind::Success,
            read: false,
            created_at: ts(),
        };
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains("\"type\":\"success\""));
        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn notification_defaults_for_missing_fields() {
        let n: Notification = serde_json::from_str(
            r#"{"id":"n2","title":"t","message":"m","created_at":"2026-01-15T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(n.kind, NotificationKind::Info);
        assert!(!n.read);
    }

    #[test]
    fn envelope_parses_notification_tag() {
        let env: PushEnvelope = serde_json::from_str(
            r#"{"type":"notification","notification":{"id":"3","title":"t","message":"m","created_at":"2026-01-15T10:00:00Z"}}"#,
        )
        .unwrap();
        let PushEnvelope::Notification { notification } = env;
        assert_eq!(notification.id, "3");
    }

    #[test]
    fn envelope_rejects_unknown_tag() {
        let res: std::result::Result<PushEnvelope, _> =
            serde_json::from_str(r#"{"type":"presence","users":3}"#);
        assert!(res.is_err());
    }
}

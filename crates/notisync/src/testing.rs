//! Shared test doubles: a recording mock of the remote API and an event sink
//! standing in for the store queue.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::api::NotificationApi;
use crate::error::{Result, SyncError};
use crate::model::{Notification, NotificationKind, NotificationSettings};
use crate::store::StoreEvent;

/// A sample notification with a fixed timestamp.
pub(crate) fn sample(id: &str, read: bool) -> Notification {
    Notification {
        id: id.to_string(),
        title: format!("title {id}"),
        message: format!("message {id}"),
        kind: NotificationKind::Info,
        read,
        created_at: "2026-01-15T10:00:00Z".parse().unwrap(),
    }
}

/// Receiver-side capture of store events, drained synchronously so tests
/// never race a collector task.
pub(crate) struct EventSink {
    rx: Mutex<mpsc::Receiver<StoreEvent>>,
}

impl EventSink {
    pub(crate) fn drain(&self) -> Vec<StoreEvent> {
        let mut rx = self.rx.lock();
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }
}

/// A store-event channel whose receiving end records instead of applying.
pub(crate) fn collect_events() -> (mpsc::Sender<StoreEvent>, EventSink) {
    let (tx, rx) = mpsc::channel(256);
    (tx, EventSink { rx: Mutex::new(rx) })
}

/// Recording mock of the remote notification service.
#[derive(Default)]
pub(crate) struct MockApi {
    /// Operations in call order, with the (paused-clock) time of each call.
    pub calls: Mutex<Vec<(String, Instant)>>,
    /// Items returned by `list`.
    pub list_items: Mutex<Vec<Notification>>,
    /// Count returned by `unread_count`.
    pub count: AtomicU64,
    /// Respond 429 to `list`.
    pub rate_limit_list: AtomicBool,
    /// Respond 500 to `list`.
    pub fail_list: AtomicBool,
    /// Respond 429 to action calls.
    pub rate_limit_actions: AtomicBool,
    /// Respond 500 to action calls.
    pub fail_actions: AtomicBool,
}

impl MockApi {
    pub(crate) fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().clone()
    }

    pub(crate) fn ops(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(op, _)| op.clone()).collect()
    }

    fn record(&self, op: impl Into<String>) {
        self.calls.lock().push((op.into(), Instant::now()));
    }

    fn action_result(&self) -> Result<()> {
        if self.rate_limit_actions.load(Ordering::SeqCst) {
            return Err(SyncError::RateLimited);
        }
        if self.fail_actions.load(Ordering::SeqCst) {
            return Err(SyncError::api(500, "internal error"));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationApi for MockApi {
    async fn list(&self, _limit: u32) -> Result<Vec<Notification>> {
        self.record("list");
        if self.rate_limit_list.load(Ordering::SeqCst) {
            return Err(SyncError::RateLimited);
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(SyncError::api(500, "internal error"));
        }
        Ok(self.list_items.lock().clone())
    }

    async fn unread_count(&self) -> Result<u64> {
        self.record("unread_count");
        Ok(self.count.load(Ordering::SeqCst))
    }

    async fn mark_read(&self, id: &str) -> Result<()> {
        self.record(format!("mark_read:{id}"));
        self.action_result()
    }

    async fn mark_all_read(&self) -> Result<()> {
        self.record("mark_all_read");
        self.action_result()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.record(format!("delete:{id}"));
        self.action_result()
    }

    async fn settings(&self) -> Result<NotificationSettings> {
        self.record("settings");
        self.action_result()?;
        Ok(NotificationSettings::from([(
            "email".to_string(),
            serde_json::Value::Bool(true),
        )]))
    }

    async fn update_settings(
        &self,
        settings: &NotificationSettings,
    ) -> Result<NotificationSettings> {
        self.record("update_settings");
        self.action_result()?;
        Ok(settings.clone())
    }
}

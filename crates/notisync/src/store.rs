//! Canonical notification state and its transition function.
//!
//! The store is a pure state container: producers (connection manager, sync
//! scheduler, action handlers) submit [`StoreEvent`]s onto one queue, a
//! single drain task applies them in arrival order, and read-only snapshots
//! are published on a watch channel after every transition. No I/O happens
//! here.

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

use crate::model::{Notification, NotificationSettings};

/// A transition submitted to the store queue.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// Replace the list wholesale (full pull); unread count is recomputed.
    SetList(Vec<Notification>),
    /// Prepend a single push-delivered notification.
    AddOne(Notification),
    /// Mark one notification as read (no-op if absent).
    MarkRead(String),
    /// Mark every notification as read.
    MarkAllRead,
    /// Delete one notification (no-op if absent).
    Remove(String),
    /// Authoritative unread count from the dedicated count pull; may
    /// transiently diverge from the list until the next `SetList`.
    SetUnreadCount(u64),
    /// Background-pull loading flag.
    SetLoading(bool),
    /// Set or clear the last background error.
    SetError(Option<String>),
    /// Clear the last background error.
    ClearError,
    /// Replace the settings blob with a server-confirmed one.
    SetSettings(NotificationSettings),
}

/// Read-only snapshot of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreState {
    /// Canonical notification list, most-recent-first.
    pub items: Vec<Notification>,
    /// Unread counter; derived from `items` except right after an
    /// authoritative `SetUnreadCount`.
    pub unread_count: u64,
    /// Per-user settings blob.
    pub settings: NotificationSettings,
    /// Whether a background pull is in flight.
    pub loading: bool,
    /// Last background error, if any.
    pub last_error: Option<String>,
}

impl StoreState {
    /// Apply one event. Total over well-formed input: transitions that
    /// reference an unknown ID degrade to no-ops, because "already removed"
    /// and "never existed" are indistinguishable and both safe.
    pub fn apply(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::SetList(items) => self.set_list(items),
            StoreEvent::AddOne(item) => self.add_one(item),
            StoreEvent::MarkRead(id) => self.mark_read(&id),
            StoreEvent::MarkAllRead => self.mark_all_read(),
            StoreEvent::Remove(id) => self.remove(&id),
            StoreEvent::SetUnreadCount(n) => self.unread_count = n,
            StoreEvent::SetLoading(loading) => self.loading = loading,
            StoreEvent::SetError(err) => self.last_error = err,
            StoreEvent::ClearError => self.last_error = None,
            StoreEvent::SetSettings(settings) => self.settings = settings,
        }
    }

    fn set_list(&mut self, mut items: Vec<Notification>) {
        // The server sends newest-first already; a stable sort keeps server
        // insertion order for equal timestamps while enforcing the ordering
        // invariant against a misbehaving response.
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut seen = std::collections::HashSet::new();
        items.retain(|n| seen.insert(n.id.clone()));
        self.unread_count = Self::derived_unread(&items);
        self.items = items;
    }

    fn add_one(&mut self, item: Notification) {
        if self.items.iter().any(|n| n.id == item.id) {
            trace!(id = %item.id, "pushed notification already present, ignoring");
            return;
        }
        if !item.read {
            self.unread_count += 1;
        }
        self.items.insert(0, item);
    }

    fn mark_read(&mut self, id: &str) {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(item) if !item.read => {
                item.read = true;
                self.unread_count = self.unread_count.saturating_sub(1);
            }
            Some(_) => {}
            None => trace!(id, "mark_read for unknown notification, ignoring"),
        }
    }

    fn mark_all_read(&mut self) {
        for item in &mut self.items {
            item.read = true;
        }
        self.unread_count = 0;
    }

    fn remove(&mut self, id: &str) {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        if self.items.len() == before {
            trace!(id, "remove for unknown notification, ignoring");
            return;
        }
        self.unread_count = Self::derived_unread(&self.items);
    }

    fn derived_unread(items: &[Notification]) -> u64 {
        items.iter().filter(|n| !n.read).count() as u64
    }
}

/// Spawn the store drain task.
///
/// Returns the producer side of the event queue, a watch receiver carrying
/// the latest snapshot, and the task handle. The task ends once every
/// producer handle is dropped.
pub(crate) fn spawn(
    capacity: usize,
) -> (
    mpsc::Sender<StoreEvent>,
    watch::Receiver<StoreState>,
    tokio::task::JoinHandle<()>,
) {
    let (event_tx, mut event_rx) = mpsc::channel::<StoreEvent>(capacity);
    let (state_tx, state_rx) = watch::channel(StoreState::default());

    let handle = tokio::spawn(async move {
        let mut state = StoreState::default();
        while let Some(event) = event_rx.recv().await {
            state.apply(event);
            if state_tx.send(state.clone()).is_err() {
                // No watchers left; keep applying so late watchers created
                // from a retained receiver would still be consistent.
                trace!("store snapshot watchers all dropped");
            }
        }
        debug!("store drain task stopped");
    });

    (event_tx, state_rx, handle)
}

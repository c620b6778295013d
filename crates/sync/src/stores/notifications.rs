//! Notification store.
//!
//! Read status is local state: mark-read, mark-all-read and delete are never
//! mirrored to the document store, so a fresh `load` brings them back as the
//! remote has them.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, instrument};

use organic_market_core::{MemberId, NotificationId};

use super::{LoadGeneration, LoadOutcome, OwnerFilter, load_owned};
use crate::error::report_remote_failure;
use crate::models::Notification;
use crate::remote::DocumentStore;

/// Loaded notifications plus the derived unread count.
///
/// The count is recomputed from the list on every mutation and can't be set
/// directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationState {
    items: Vec<Notification>,
    unread_count: usize,
}

impl NotificationState {
    fn new(items: Vec<Notification>) -> Self {
        let mut state = Self {
            items,
            unread_count: 0,
        };
        state.recount();
        state
    }

    fn recount(&mut self) {
        self.unread_count = self.items.iter().filter(|n| !n.read_status).count();
    }

    #[must_use]
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    #[must_use]
    pub const fn unread_count(&self) -> usize {
        self.unread_count
    }
}

/// Notifications visible to the current member.
pub struct NotificationStore<S> {
    remote: Arc<S>,
    collection: String,
    state: watch::Sender<NotificationState>,
    generation: LoadGeneration,
}

impl<S> NotificationStore<S> {
    /// Create an empty store reading from `collection`.
    #[must_use]
    pub fn new(remote: Arc<S>, collection: impl Into<String>) -> Self {
        Self {
            remote,
            collection: collection.into(),
            state: watch::channel(NotificationState::default()).0,
            generation: LoadGeneration::default(),
        }
    }

    /// Subscribe to list and count changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.state.subscribe()
    }

    /// Snapshot of list and count, taken together.
    #[must_use]
    pub fn snapshot(&self) -> NotificationState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn items(&self) -> Vec<Notification> {
        self.state.borrow().items.clone()
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.state.borrow().unread_count
    }

    /// Replace the whole list.
    pub fn set_all(&self, items: Vec<Notification>) {
        self.state.send_replace(NotificationState::new(items));
    }

    /// Prepend a locally originated or pushed notification.
    pub fn add(&self, notification: Notification) {
        self.state.send_modify(|state| {
            state.items.insert(0, notification);
            state.recount();
        });
    }

    /// Mark one notification read.
    ///
    /// Returns `false` when the entry is absent or already read; nothing is
    /// published in that case.
    pub fn mark_read(&self, id: &NotificationId) -> bool {
        self.state.send_if_modified(|state| {
            let Some(entry) = state
                .items
                .iter_mut()
                .find(|n| &n.id == id && !n.read_status)
            else {
                return false;
            };
            entry.read_status = true;
            state.recount();
            true
        })
    }

    /// Mark every notification read.
    pub fn mark_all_read(&self) {
        self.state.send_if_modified(|state| {
            if state.unread_count == 0 {
                return false;
            }
            for entry in &mut state.items {
                entry.read_status = true;
            }
            state.recount();
            true
        });
    }

    /// Remove a notification. Deleting an absent ID is a no-op.
    pub fn delete(&self, id: &NotificationId) -> bool {
        self.state.send_if_modified(|state| {
            let Some(index) = state.items.iter().position(|n| &n.id == id) else {
                return false;
            };
            state.items.remove(index);
            state.recount();
            true
        })
    }

    /// Drop everything and cancel any in-flight load.
    pub fn clear(&self) {
        self.generation.begin();
        self.state.send_replace(NotificationState::default());
    }
}

impl<S: DocumentStore> NotificationStore<S> {
    /// Replace local state with the notifications `owner` can see.
    ///
    /// Broadcasts (no owner) are included. The remote order is kept as-is.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn load(&self, owner: &MemberId) -> LoadOutcome {
        let ticket = self.generation.begin();

        let items = match load_owned(
            self.remote.as_ref(),
            &self.collection,
            OwnerFilter::visible_to(Notification::OWNER_FIELD, owner),
            |n: &Notification| n.is_visible_to(owner),
        )
        .await
        {
            Ok(items) => items,
            Err(e) => {
                report_remote_failure("notifications.load", &self.collection, &e);
                return LoadOutcome::Failed;
            }
        };

        let count = items.len();
        let applied = self.state.send_if_modified(|state| {
            if !self.generation.is_current(ticket) {
                return false;
            }
            *state = NotificationState::new(items);
            true
        });

        if applied {
            debug!(member_id = %owner, count, "Notifications loaded");
            LoadOutcome::Applied { count }
        } else {
            debug!(member_id = %owner, "Discarding superseded notification load");
            LoadOutcome::Superseded
        }
    }
}

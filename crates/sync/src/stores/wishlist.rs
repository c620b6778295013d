//! Wishlist (membership) store.
//!
//! Holds the favorited products of the current member. `add` and `remove`
//! are local only: the action handler issues the remote create/delete first
//! and mirrors it here, so one user action means exactly one network call no
//! matter how many subscribers react.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, instrument};

use organic_market_core::{MemberId, ProductId, WishlistItemId};

use super::{LoadGeneration, LoadOutcome, OwnerFilter, load_owned};
use crate::error::report_remote_failure;
use crate::models::WishlistItem;
use crate::remote::DocumentStore;

/// Favorited products of the current member, newest first.
pub struct WishlistStore<S> {
    remote: Arc<S>,
    collection: String,
    state: watch::Sender<Vec<WishlistItem>>,
    generation: LoadGeneration,
}

impl<S> WishlistStore<S> {
    /// Create an empty store reading from `collection`.
    #[must_use]
    pub fn new(remote: Arc<S>, collection: impl Into<String>) -> Self {
        Self {
            remote,
            collection: collection.into(),
            state: watch::channel(Vec::new()).0,
            generation: LoadGeneration::default(),
        }
    }

    /// Name of the backing remote collection.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Subscribe to list changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<WishlistItem>> {
        self.state.subscribe()
    }

    /// Snapshot of the current list.
    #[must_use]
    pub fn items(&self) -> Vec<WishlistItem> {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }

    /// Whether `product` is favorited, judged from local state only.
    #[must_use]
    pub fn has(&self, product: &ProductId) -> bool {
        self.state
            .borrow()
            .iter()
            .any(|item| &item.product_reference == product)
    }

    /// First local entry for `product`, if any.
    #[must_use]
    pub fn find(&self, product: &ProductId) -> Option<WishlistItem> {
        self.state
            .borrow()
            .iter()
            .find(|item| &item.product_reference == product)
            .cloned()
    }

    /// First local entry for `product` owned by `owner`.
    #[must_use]
    pub fn find_for(&self, owner: &MemberId, product: &ProductId) -> Option<WishlistItem> {
        self.state
            .borrow()
            .iter()
            .find(|item| &item.owner_id == owner && &item.product_reference == product)
            .cloned()
    }

    /// Prepend an entry the caller has already created remotely.
    pub fn add(&self, item: WishlistItem) {
        debug!(item_id = %item.id, product = %item.product_reference, "Wishlist add");
        self.state.send_modify(|items| items.insert(0, item));
    }

    /// Remove the entry with `id` after the caller deleted it remotely.
    ///
    /// Returns `false` (and notifies nobody) when no such entry exists.
    pub fn remove(&self, id: &WishlistItemId) -> bool {
        self.state.send_if_modified(|items| {
            items
                .iter()
                .position(|item| &item.id == id)
                .map(|index| items.remove(index))
                .is_some()
        })
    }

    /// Drop all entries and cancel any in-flight load.
    pub fn clear(&self) {
        self.generation.begin();
        self.state.send_replace(Vec::new());
    }
}

impl<S: DocumentStore> WishlistStore<S> {
    /// Replace local state with the remote entries owned by `owner`.
    ///
    /// A missing or empty remote collection yields an empty list. On remote
    /// failure the previous list is kept.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn load(&self, owner: &MemberId) -> LoadOutcome {
        let ticket = self.generation.begin();

        let items = match load_owned(
            self.remote.as_ref(),
            &self.collection,
            OwnerFilter::owned_by(WishlistItem::OWNER_FIELD, owner),
            |item: &WishlistItem| &item.owner_id == owner,
        )
        .await
        {
            Ok(items) => items,
            Err(e) => {
                report_remote_failure("wishlist.load", &self.collection, &e);
                return LoadOutcome::Failed;
            }
        };

        let count = items.len();
        let applied = self.state.send_if_modified(|current| {
            if !self.generation.is_current(ticket) {
                return false;
            }
            *current = items;
            true
        });

        if applied {
            debug!(member_id = %owner, count, "Wishlist loaded");
            LoadOutcome::Applied { count }
        } else {
            debug!(member_id = %owner, "Discarding superseded wishlist load");
            LoadOutcome::Superseded
        }
    }
}

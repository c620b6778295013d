//! Application context shared by every consumer of the stores.
//!
//! Replaces process-wide singletons: build one [`AppContext`] at startup and
//! hand clones to whoever needs the stores.

use std::sync::Arc;

use tracing::instrument;

use organic_market_core::MemberId;

use crate::config::{CollectionNames, SyncConfig};
use crate::error::RemoteError;
use crate::remote::{DocumentStore, HttpDocumentStore};
use crate::storage::{FileKeyValueStore, KeyValueStore};
use crate::stores::{LoadOutcome, NotificationStore, SessionStore, WishlistStore};

/// Outcome of loading everything a member sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberLoad {
    pub role: LoadOutcome,
    pub wishlist: LoadOutcome,
    pub notifications: LoadOutcome,
}

/// Stores and remote client shared across the application.
///
/// This struct is cheaply cloneable via `Arc`; every clone sees the same
/// stores.
pub struct AppContext<S> {
    inner: Arc<AppContextInner<S>>,
}

struct AppContextInner<S> {
    remote: Arc<S>,
    collections: CollectionNames,
    session: SessionStore<S>,
    wishlist: WishlistStore<S>,
    notifications: NotificationStore<S>,
}

impl<S> Clone for AppContext<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl AppContext<HttpDocumentStore> {
    /// Build a context backed by the REST document store and a file-backed
    /// session slot, restoring any persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client can't be built.
    pub fn from_config(config: &SyncConfig) -> Result<Self, RemoteError> {
        let remote = HttpDocumentStore::new(&config.docstore)?;
        let storage = Arc::new(FileKeyValueStore::new(&config.session_storage_path));
        let context = Self::new(remote, storage, config.collections.clone());
        context.session().restore();
        Ok(context)
    }
}

impl<S> AppContext<S> {
    /// Create a context with empty stores.
    #[must_use]
    pub fn new(remote: S, storage: Arc<dyn KeyValueStore>, collections: CollectionNames) -> Self {
        let remote = Arc::new(remote);
        let session = SessionStore::new(Arc::clone(&remote), collections.roles.clone(), storage);
        let wishlist = WishlistStore::new(Arc::clone(&remote), collections.wishlist.clone());
        let notifications =
            NotificationStore::new(Arc::clone(&remote), collections.notifications.clone());

        Self {
            inner: Arc::new(AppContextInner {
                remote,
                collections,
                session,
                wishlist,
                notifications,
            }),
        }
    }

    /// Get a reference to the remote document store.
    #[must_use]
    pub fn remote(&self) -> &S {
        &self.inner.remote
    }

    /// Get a reference to the configured collection names.
    #[must_use]
    pub fn collections(&self) -> &CollectionNames {
        &self.inner.collections
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore<S> {
        &self.inner.session
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore<S> {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationStore<S> {
        &self.inner.notifications
    }
}

impl<S: DocumentStore> AppContext<S> {
    /// Load role, wishlist and notifications for `member_id` concurrently.
    #[instrument(skip(self))]
    pub async fn load_member(&self, member_id: &MemberId) -> MemberLoad {
        let (role, wishlist, notifications) = tokio::join!(
            self.session().load_role(member_id),
            self.wishlist().load(member_id),
            self.notifications().load(member_id),
        );
        MemberLoad {
            role,
            wishlist,
            notifications,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use organic_market_core::{ProductId, Role};
    use serde_json::json;

    use super::*;
    use crate::remote::InMemoryDocumentStore;
    use crate::storage::MemoryKeyValueStore;

    fn context() -> (InMemoryDocumentStore, AppContext<InMemoryDocumentStore>) {
        let remote = InMemoryDocumentStore::new();
        let context = AppContext::new(
            remote.clone(),
            Arc::new(MemoryKeyValueStore::new()),
            CollectionNames::default(),
        );
        (remote, context)
    }

    #[tokio::test]
    async fn test_load_member_fills_every_store() {
        let (remote, context) = context();
        remote
            .seed(
                "userRoles",
                [json!({"id": "r1", "memberId": "m1", "role": "customer", "active": true})],
            )
            .unwrap();
        remote
            .seed("wishlist", [json!({"id": "a", "ownerId": "m1", "productReference": "p1"})])
            .unwrap();
        remote
            .seed("notifications", [json!({"id": "n1", "readStatus": false})])
            .unwrap();

        let load = context.load_member(&MemberId::new("m1")).await;

        assert_eq!(load.role, LoadOutcome::Applied { count: 1 });
        assert_eq!(load.wishlist, LoadOutcome::Applied { count: 1 });
        assert_eq!(load.notifications, LoadOutcome::Applied { count: 1 });
        assert_eq!(context.session().role(), Some(Role::Customer));
        assert!(context.wishlist().has(&ProductId::new("p1")));
        assert_eq!(context.notifications().unread_count(), 1);
    }

    #[test]
    fn test_clones_share_stores() {
        let (_remote, context) = context();
        let clone = context.clone();
        clone
            .session()
            .set_role(Role::Admin, MemberId::new("m1"), None);
        assert!(context.session().is_authenticated());
    }
}

//! User action handlers.
//!
//! Wishlist actions issue the remote write first and mirror it into the store
//! only once it succeeds, so a failed write never leaves local and remote
//! state apart. Failures are logged and returned; nothing is retried.

use tracing::{info, instrument};

use organic_market_core::{MemberId, ProductId};

use crate::context::{AppContext, MemberLoad};
use crate::error::{IdentityError, RemoteError, add_breadcrumb, report_remote_failure};
use crate::identity::IdentityProvider;
use crate::models::WishlistItem;
use crate::remote::DocumentStore;

impl<S: DocumentStore> AppContext<S> {
    /// Favorite `product` for `owner`.
    ///
    /// Already favorited products return the existing entry without a
    /// remote call.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the create fails; the store is untouched.
    #[instrument(skip(self))]
    pub async fn add_to_wishlist(
        &self,
        owner: &MemberId,
        product: &ProductId,
    ) -> Result<WishlistItem, RemoteError> {
        if let Some(existing) = self.wishlist().find_for(owner, product) {
            return Ok(existing);
        }

        let collection = self.wishlist().collection();
        let draft = WishlistItem::new(owner.clone(), product.clone());
        let created = self
            .remote()
            .create(collection, &draft)
            .await
            .inspect_err(|e| report_remote_failure("wishlist.add", collection, e))?;

        add_breadcrumb(
            "wishlist",
            "Added to wishlist",
            Some(&[("product", product.as_str())]),
        );
        self.wishlist().add(created.clone());
        Ok(created)
    }

    /// Unfavorite `product` for `owner`.
    ///
    /// Only the first local entry for the product is deleted. Returns
    /// `false` if the product wasn't favorited.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the delete fails; the store is untouched.
    #[instrument(skip(self))]
    pub async fn remove_from_wishlist(
        &self,
        owner: &MemberId,
        product: &ProductId,
    ) -> Result<bool, RemoteError> {
        let Some(entry) = self.wishlist().find_for(owner, product) else {
            return Ok(false);
        };

        let collection = self.wishlist().collection();
        self.remote()
            .delete(collection, entry.id.as_str())
            .await
            .inspect_err(|e| report_remote_failure("wishlist.remove", collection, e))?;

        add_breadcrumb(
            "wishlist",
            "Removed from wishlist",
            Some(&[("product", product.as_str())]),
        );
        self.wishlist().remove(&entry.id);
        Ok(true)
    }

    /// Flip the membership of `product` and return whether it is now
    /// favorited.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the underlying create or delete fails.
    pub async fn toggle_wishlist(
        &self,
        owner: &MemberId,
        product: &ProductId,
    ) -> Result<bool, RemoteError> {
        if self.wishlist().find_for(owner, product).is_some() {
            self.remove_from_wishlist(owner, product).await?;
            Ok(false)
        } else {
            self.add_to_wishlist(owner, product).await?;
            Ok(true)
        }
    }

    /// Log in through `identity`, then load everything the member sees.
    ///
    /// # Errors
    ///
    /// Returns the identity provider's error; stores are untouched then.
    #[instrument(skip(self, identity))]
    pub async fn login<I: IdentityProvider>(
        &self,
        identity: &I,
    ) -> Result<(MemberId, MemberLoad), IdentityError> {
        let member_id = identity.login().await?;
        info!(member_id = %member_id, "Member logged in");
        let load = self.load_member(&member_id).await;
        Ok((member_id, load))
    }

    /// Log out through `identity` and reset every store.
    #[instrument(skip(self, identity))]
    pub async fn logout<I: IdentityProvider>(&self, identity: &I) {
        identity.logout().await;
        self.session().clear();
        self.wishlist().clear();
        self.notifications().clear();
        info!("Member logged out");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use organic_market_core::Role;
    use serde_json::json;

    use super::*;
    use crate::config::CollectionNames;
    use crate::identity::StaticIdentityProvider;
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
    async fn test_toggle_adds_then_removes() {
        let (remote, context) = context();
        let owner = MemberId::new("m1");
        let product = ProductId::new("p1");

        assert!(context.toggle_wishlist(&owner, &product).await.unwrap());
        assert!(context.wishlist().has(&product));
        assert_eq!(remote.documents("wishlist").len(), 1);

        assert!(!context.toggle_wishlist(&owner, &product).await.unwrap());
        assert!(!context.wishlist().has(&product));
        assert!(remote.documents("wishlist").is_empty());
    }

    #[tokio::test]
    async fn test_entry_of_another_owner_is_not_reused() {
        let (remote, context) = context();
        let product = ProductId::new("p1");
        let theirs = context
            .add_to_wishlist(&MemberId::new("m1"), &product)
            .await
            .unwrap();

        let mine = context
            .add_to_wishlist(&MemberId::new("m2"), &product)
            .await
            .unwrap();

        assert_ne!(mine.id, theirs.id);
        assert_eq!(mine.owner_id, MemberId::new("m2"));
        assert_eq!(remote.documents("wishlist").len(), 2);
        assert!(
            !context
                .remove_from_wishlist(&MemberId::new("m3"), &product)
                .await
                .unwrap()
        );
        assert_eq!(remote.documents("wishlist").len(), 2);
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (remote, context) = context();
        let owner = MemberId::new("m1");
        let product = ProductId::new("p1");

        let first = context.add_to_wishlist(&owner, &product).await.unwrap();
        let second = context.add_to_wishlist(&owner, &product).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(context.wishlist().len(), 1);
        assert_eq!(remote.documents("wishlist").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_remote_create_leaves_store_untouched() {
        let (remote, context) = context();
        remote.set_failing(true);

        let result = context
            .add_to_wishlist(&MemberId::new("m1"), &ProductId::new("p1"))
            .await;

        assert!(matches!(result, Err(RemoteError::Unavailable(_))));
        assert!(context.wishlist().is_empty());
    }

    #[tokio::test]
    async fn test_failed_remote_delete_leaves_store_untouched() {
        let (remote, context) = context();
        let owner = MemberId::new("m1");
        let product = ProductId::new("p1");
        context.add_to_wishlist(&owner, &product).await.unwrap();
        remote.set_failing(true);

        assert!(context.toggle_wishlist(&owner, &product).await.is_err());
        assert!(context.wishlist().has(&product));
    }

    #[tokio::test]
    async fn test_remove_unknown_product_is_noop() {
        let (_remote, context) = context();
        let removed = context
            .remove_from_wishlist(&MemberId::new("m1"), &ProductId::new("p1"))
            .await
            .unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let (remote, context) = context();
        remote
            .seed(
                "userRoles",
                [json!({"id": "r1", "memberId": "m1", "role": "farmer", "active": true})],
            )
            .unwrap();
        remote
            .seed("wishlist", [json!({"id": "a", "ownerId": "m1", "productReference": "p1"})])
            .unwrap();
        let identity = StaticIdentityProvider::new(MemberId::new("m1"));

        let (member, _load) = context.login(&identity).await.unwrap();
        assert_eq!(member, MemberId::new("m1"));
        assert_eq!(context.session().role(), Some(Role::Farmer));
        assert_eq!(context.wishlist().len(), 1);

        context.logout(&identity).await;
        assert!(!context.session().is_authenticated());
        assert!(context.wishlist().is_empty());
        assert_eq!(identity.member_id(), None);
    }
}

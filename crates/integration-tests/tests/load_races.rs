//! Load ordering: only the newest load of a store may publish.
//!
//! Reads are held at a gate so the interleaving is fixed by the test.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use organic_market_core::{MemberId, ProductId, Role};
use organic_market_integration_tests::GatedDocumentStore;
use organic_market_sync::{
    AppContext, CollectionNames, InMemoryDocumentStore, LoadOutcome, MemoryKeyValueStore,
    NotificationStore, WishlistStore,
};
use serde_json::json;

fn seeded() -> InMemoryDocumentStore {
    let remote = InMemoryDocumentStore::new();
    remote
        .seed(
            "wishlist",
            [
                json!({"id": "a", "ownerId": "m1", "productReference": "p1"}),
                json!({"id": "b", "ownerId": "m2", "productReference": "p2"}),
            ],
        )
        .unwrap();
    remote
        .seed(
            "notifications",
            [
                json!({"id": "n1", "ownerId": "m1", "readStatus": false}),
                json!({"id": "n2", "ownerId": "m2", "readStatus": false}),
            ],
        )
        .unwrap();
    remote
        .seed(
            "userRoles",
            [json!({"id": "r1", "memberId": "m1", "role": "farmer", "active": true})],
        )
        .unwrap();
    remote
}

#[tokio::test]
async fn test_newer_wishlist_load_wins() {
    let gated = GatedDocumentStore::new(seeded());
    let store = WishlistStore::new(Arc::new(gated.clone()), "wishlist");
    let (m1, m2) = (MemberId::new("m1"), MemberId::new("m2"));

    let (older, newer, ()) = tokio::join!(store.load(&m1), store.load(&m2), async {
        gated.release(2);
    });

    assert_eq!(older, LoadOutcome::Superseded);
    assert_eq!(newer, LoadOutcome::Applied { count: 1 });
    assert!(store.has(&ProductId::new("p2")));
    assert!(!store.has(&ProductId::new("p1")));
}

#[tokio::test]
async fn test_clear_discards_in_flight_wishlist_load() {
    let gated = GatedDocumentStore::new(seeded());
    let store = WishlistStore::new(Arc::new(gated.clone()), "wishlist");

    let member = MemberId::new("m1");
    let (outcome, ()) = tokio::join!(store.load(&member), async {
        store.clear();
        gated.release(1);
    });

    assert_eq!(outcome, LoadOutcome::Superseded);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_clear_discards_in_flight_notification_load() {
    let gated = GatedDocumentStore::new(seeded());
    let store = NotificationStore::new(Arc::new(gated.clone()), "notifications");

    let member = MemberId::new("m1");
    let (outcome, ()) = tokio::join!(store.load(&member), async {
        store.clear();
        gated.release(1);
    });

    assert_eq!(outcome, LoadOutcome::Superseded);
    assert!(store.items().is_empty());
    assert_eq!(store.unread_count(), 0);
}

#[tokio::test]
async fn test_logout_during_role_lookup_stays_logged_out() {
    let gated = GatedDocumentStore::new(seeded());
    let storage = Arc::new(MemoryKeyValueStore::new());
    let context = AppContext::new(gated.clone(), storage, CollectionNames::default());

    let member = MemberId::new("m1");
    let (outcome, ()) = tokio::join!(context.session().load_role(&member), async {
        context.session().clear();
        gated.release(1);
    });

    assert_eq!(outcome, LoadOutcome::Superseded);
    assert!(!context.session().is_authenticated());
}

#[tokio::test]
async fn test_set_role_during_lookup_keeps_explicit_role() {
    let gated = GatedDocumentStore::new(seeded());
    let context = AppContext::new(
        gated.clone(),
        Arc::new(MemoryKeyValueStore::new()),
        CollectionNames::default(),
    );

    let member = MemberId::new("m1");
    let (outcome, ()) = tokio::join!(context.session().load_role(&member), async {
        context
            .session()
            .set_role(Role::Admin, MemberId::new("m1"), None);
        gated.release(1);
    });

    assert_eq!(outcome, LoadOutcome::Superseded);
    assert_eq!(context.session().role(), Some(Role::Admin));
}

#[tokio::test]
async fn test_local_add_during_load_is_overwritten() {
    let gated = GatedDocumentStore::new(seeded());
    let context = AppContext::new(
        gated.clone(),
        Arc::new(MemoryKeyValueStore::new()),
        CollectionNames::default(),
    );
    let owner = MemberId::new("m1");

    let (outcome, ()) = tokio::join!(context.wishlist().load(&owner), async {
        context
            .wishlist()
            .add(organic_market_sync::models::WishlistItem::new(
                owner.clone(),
                ProductId::new("p9"),
            ));
        gated.release(1);
    });

    assert_eq!(outcome, LoadOutcome::Applied { count: 1 });
    assert!(!context.wishlist().has(&ProductId::new("p9")));
    assert!(context.wishlist().has(&ProductId::new("p1")));
}

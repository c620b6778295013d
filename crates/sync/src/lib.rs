//! Organic Market client state sync layer.
//!
//! Three reactive stores (session, wishlist, notifications) kept loosely in
//! step with a remote document store. Build an [`AppContext`] once and hand
//! clones to every consumer.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod actions;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod models;
pub mod remote;
pub mod storage;
pub mod stores;

pub use config::{CollectionNames, ConfigError, DocStoreConfig, SyncConfig};
pub use context::{AppContext, MemberLoad};
pub use error::{IdentityError, RemoteError, StorageError};
pub use identity::{IdentityProvider, StaticIdentityProvider};
pub use remote::{DocumentStore, HttpDocumentStore, InMemoryDocumentStore};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use stores::{LoadOutcome, NotificationStore, SessionStore, WishlistStore};

//! Remote document store clients.
//!
//! # Architecture
//!
//! - The document store is a REST collection store: `getAll`, `create` and
//!   `delete` per named collection. No filtering, sorting or pagination.
//! - Stores always fetch the whole collection and filter client-side (see
//!   [`crate::stores::load_owned`]).
//! - [`HttpDocumentStore`] caches `getAll` responses via `moka`; writes
//!   invalidate the collection they touched.
//!
//! # Example
//!
//! ```rust,ignore
//! use organic_market_sync::remote::{DocumentStore, HttpDocumentStore};
//!
//! let remote = HttpDocumentStore::new(&config.docstore)?;
//! let rows: Vec<WishlistItem> = remote.get_all("wishlist").await?;
//! ```

mod http;
mod memory;

pub use http::HttpDocumentStore;
pub use memory::InMemoryDocumentStore;

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::RemoteError;

/// CRUD surface of the remote document store.
pub trait DocumentStore: Send + Sync {
    /// Fetch every document in `collection`.
    ///
    /// A collection that does not exist yet reads as empty.
    fn get_all<T>(&self, collection: &str) -> impl Future<Output = Result<Vec<T>, RemoteError>> + Send
    where
        T: DeserializeOwned + Send;

    /// Store `doc` in `collection` and return the stored document.
    ///
    /// The caller supplies the document ID.
    fn create<T>(
        &self,
        collection: &str,
        doc: &T,
    ) -> impl Future<Output = Result<T, RemoteError>> + Send
    where
        T: Serialize + DeserializeOwned + Send + Sync;

    /// Delete the document with `id` from `collection`.
    fn delete(&self, collection: &str, id: &str) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

//! Process-local document store for tests and demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::DocumentStore;
use crate::error::RemoteError;

/// In-memory document store with the same semantics as the REST store.
///
/// Documents are kept as JSON values in insertion order. Call
/// [`set_failing`](Self::set_failing) to make every operation fail with
/// [`RemoteError::Unavailable`].
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    failing: AtomicBool,
    get_all_calls: AtomicUsize,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append documents to `collection`, bypassing ID checks.
    ///
    /// # Errors
    ///
    /// Returns error if a document can't be converted to JSON.
    pub fn seed<T, I>(&self, collection: &str, docs: I) -> Result<(), RemoteError>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let values = docs
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.collections()
            .entry(collection.to_string())
            .or_default()
            .extend(values);
        Ok(())
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Raw documents currently stored in `collection`.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of `get_all` calls served so far.
    #[must_use]
    pub fn get_all_calls(&self) -> usize {
        self.inner.get_all_calls.load(Ordering::SeqCst)
    }

    fn collections(&self) -> MutexGuard<'_, HashMap<String, Vec<Value>>> {
        self.inner
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("document store offline".to_string()));
        }
        Ok(())
    }
}

fn document_id(doc: &Value) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

impl DocumentStore for InMemoryDocumentStore {
    async fn get_all<T>(&self, collection: &str) -> Result<Vec<T>, RemoteError>
    where
        T: DeserializeOwned + Send,
    {
        self.inner.get_all_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let docs = self.documents(collection);
        docs.iter()
            .map(|value| T::deserialize(value).map_err(RemoteError::from))
            .collect()
    }

    async fn create<T>(&self, collection: &str, doc: &T) -> Result<T, RemoteError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        self.check_available()?;
        let value = serde_json::to_value(doc)?;
        let stored = T::deserialize(&value)?;

        let mut collections = self.collections();
        let docs = collections.entry(collection.to_string()).or_default();
        if let Some(id) = document_id(&value)
            && docs.iter().any(|existing| document_id(existing) == Some(id))
        {
            return Err(RemoteError::Api {
                status: 409,
                message: format!("document {id} already exists in {collection}"),
            });
        }
        docs.push(value);
        Ok(stored)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        self.check_available()?;
        let mut collections = self.collections();
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| RemoteError::NotFound(format!("{collection}/{id}")))?;
        let position = docs
            .iter()
            .position(|doc| document_id(doc) == Some(id))
            .ok_or_else(|| RemoteError::NotFound(format!("{collection}/{id}")))?;
        docs.remove(position);
        Ok(())
    }
}

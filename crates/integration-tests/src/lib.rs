//! Integration test support for the Organic Market sync layer.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p organic-market-integration-tests
//! ```
//!
//! Everything runs in-process: [`DocStoreServer`] is an `axum` app speaking
//! the document store's REST protocol on an ephemeral port, so the real
//! [`HttpDocumentStore`] client is exercised end to end without a network
//! dependency. [`GatedDocumentStore`] holds reads until a test releases them,
//! which makes load races deterministic.

#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use organic_market_sync::{
    AppContext, CollectionNames, DocStoreConfig, DocumentStore, HttpDocumentStore,
    InMemoryDocumentStore, MemoryKeyValueStore, RemoteError,
};
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use url::Url;

// ============================================================================
// In-process REST document store
// ============================================================================

#[derive(Clone, Default)]
struct ServerState {
    collections: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    list_requests: Arc<AtomicUsize>,
    api_key: Option<Arc<str>>,
}

impl ServerState {
    fn collections(&self) -> MutexGuard<'_, HashMap<String, Vec<Value>>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(key) = &self.api_key else {
            return true;
        };
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| token == &**key)
    }
}

/// Document store emulator served on `127.0.0.1` with an ephemeral port.
///
/// Collections that were never written answer `404`, like the real store.
pub struct DocStoreServer {
    base_url: Url,
    state: ServerState,
}

impl DocStoreServer {
    /// Start an open server.
    pub async fn start() -> Self {
        Self::spawn(ServerState::default()).await
    }

    /// Start a server that requires `Authorization: Bearer {api_key}`.
    pub async fn start_with_api_key(api_key: &str) -> Self {
        Self::spawn(ServerState {
            api_key: Some(Arc::from(api_key)),
            ..ServerState::default()
        })
        .await
    }

    async fn spawn(state: ServerState) -> Self {
        let app = Router::new()
            .route("/api/collections/{name}/items", get(list_items).post(create_item))
            .route("/api/collections/{name}/items/{id}", delete(delete_item))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Document store emulator crashed");
        });

        let base_url = Url::parse(&format!("http://{addr}/api")).expect("Invalid base URL");
        Self { base_url, state }
    }

    /// Base URL to point a [`DocStoreConfig`] at.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Store documents directly, bypassing the HTTP surface.
    pub fn seed(&self, collection: &str, docs: impl IntoIterator<Item = Value>) {
        self.state
            .collections()
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
    }

    /// Documents currently stored in `collection`.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.state
            .collections()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of collection reads served over HTTP.
    #[must_use]
    pub fn list_requests(&self) -> usize {
        self.state.list_requests.load(Ordering::SeqCst)
    }

    /// Client config for this server with caching on.
    #[must_use]
    pub fn config(&self) -> DocStoreConfig {
        DocStoreConfig::new(self.base_url.clone())
    }

    /// Client config for this server with caching off.
    #[must_use]
    pub fn uncached_config(&self) -> DocStoreConfig {
        let mut config = self.config();
        config.cache_ttl = Duration::ZERO;
        config
    }

    /// Client config carrying `api_key` as bearer token.
    #[must_use]
    pub fn config_with_api_key(&self, api_key: &str) -> DocStoreConfig {
        let mut config = self.uncached_config();
        config.api_key = Some(SecretString::from(api_key.to_string()));
        config
    }

    /// Application context talking to this server, with an in-memory
    /// session slot.
    #[must_use]
    pub fn context(&self) -> AppContext<HttpDocumentStore> {
        let remote =
            HttpDocumentStore::new(&self.uncached_config()).expect("Failed to build client");
        AppContext::new(
            remote,
            Arc::new(MemoryKeyValueStore::new()),
            CollectionNames::default(),
        )
    }
}

fn document_id(doc: &Value) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

async fn list_items(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.list_requests.fetch_add(1, Ordering::SeqCst);

    match state.collections().get(&name) {
        Some(items) => Json(json!({ "items": items })).into_response(),
        None => (StatusCode::NOT_FOUND, "collection not found").into_response(),
    }
}

async fn create_item(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(doc): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut collections = state.collections();
    let items = collections.entry(name).or_default();
    if let Some(id) = document_id(&doc)
        && items.iter().any(|existing| document_id(existing) == Some(id))
    {
        return (StatusCode::CONFLICT, format!("document {id} already exists")).into_response();
    }
    items.push(doc.clone());
    (StatusCode::CREATED, Json(doc)).into_response()
}

async fn delete_item(
    State(state): State<ServerState>,
    Path((name, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut collections = state.collections();
    let Some(items) = collections.get_mut(&name) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match items.iter().position(|doc| document_id(doc) == Some(id.as_str())) {
        Some(index) => {
            items.remove(index);
            StatusCode::NO_CONTENT.into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ============================================================================
// Gated store
// ============================================================================

/// In-memory store whose reads block until [`release`](Self::release) hands
/// out a permit.
///
/// Writes are not gated.
#[derive(Clone)]
pub struct GatedDocumentStore {
    inner: InMemoryDocumentStore,
    gate: Arc<Semaphore>,
}

impl GatedDocumentStore {
    #[must_use]
    pub fn new(inner: InMemoryDocumentStore) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let `reads` pending or future reads through.
    pub fn release(&self, reads: usize) {
        self.gate.add_permits(reads);
    }
}

impl DocumentStore for GatedDocumentStore {
    async fn get_all<T>(&self, collection: &str) -> Result<Vec<T>, RemoteError>
    where
        T: DeserializeOwned + Send,
    {
        self.gate
            .acquire()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?
            .forget();
        self.inner.get_all(collection).await
    }

    async fn create<T>(&self, collection: &str, doc: &T) -> Result<T, RemoteError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        self.inner.create(collection, doc).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        self.inner.delete(collection, id).await
    }
}

//! REST document store client.
//!
//! Uses `reqwest` for HTTP and caches whole-collection reads with `moka`.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::DocumentStore;
use crate::config::DocStoreConfig;
use crate::error::RemoteError;

/// Upper bound on cached collections.
const CACHE_CAPACITY: u64 = 64;

/// Response body of `GET /collections/{name}/items`.
#[derive(Debug, Deserialize)]
struct ItemsEnvelope {
    #[serde(default)]
    items: Option<Vec<Value>>,
}

/// Client for the REST document store.
///
/// Routes:
/// - `GET    {base}/collections/{name}/items` returns `{ "items": [...] }`
/// - `POST   {base}/collections/{name}/items` creates a document
/// - `DELETE {base}/collections/{name}/items/{id}` deletes a document
#[derive(Clone)]
pub struct HttpDocumentStore {
    inner: Arc<HttpDocumentStoreInner>,
}

struct HttpDocumentStoreInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    cache: Option<Cache<String, Arc<Vec<Value>>>>,
}

impl HttpDocumentStore {
    /// Create a new document store client.
    ///
    /// A zero `cache_ttl` disables the response cache.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &DocStoreConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        let cache = (!config.cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(config.cache_ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(HttpDocumentStoreInner {
                client,
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                cache,
            }),
        })
    }

    /// Drop the cached copy of `collection`, if any.
    pub async fn invalidate(&self, collection: &str) {
        if let Some(cache) = &self.inner.cache {
            cache.invalidate(collection).await;
        }
    }

    fn items_url(&self, collection: &str, id: Option<&str>) -> Result<Url, RemoteError> {
        let mut url = self.inner.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                RemoteError::Unavailable(format!(
                    "base URL cannot carry a path: {}",
                    self.inner.base_url
                ))
            })?;
            segments
                .pop_if_empty()
                .push("collections")
                .push(collection)
                .push("items");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    /// Fetch the raw documents of a collection, consulting the cache first.
    async fn fetch_items(&self, collection: &str) -> Result<Arc<Vec<Value>>, RemoteError> {
        if let Some(cache) = &self.inner.cache
            && let Some(items) = cache.get(collection).await
        {
            debug!("Cache hit for collection");
            return Ok(items);
        }

        let url = self.items_url(collection, None)?;
        let response = self.authorized(self.inner.client.get(url)).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("Collection does not exist yet, reading as empty");
            return Ok(Arc::new(Vec::new()));
        }
        if !status.is_success() {
            return Err(api_error(response).await);
        }

        let body = response.text().await?;
        let envelope: ItemsEnvelope = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse document store response"
            );
            RemoteError::Parse(e)
        })?;
        let items = Arc::new(envelope.items.unwrap_or_default());

        if let Some(cache) = &self.inner.cache {
            cache.insert(collection.to_string(), Arc::clone(&items)).await;
        }

        Ok(items)
    }
}

impl DocumentStore for HttpDocumentStore {
    #[instrument(skip(self))]
    async fn get_all<T>(&self, collection: &str) -> Result<Vec<T>, RemoteError>
    where
        T: DeserializeOwned + Send,
    {
        let items = self.fetch_items(collection).await?;
        items
            .iter()
            .map(|value| T::deserialize(value).map_err(RemoteError::from))
            .collect()
    }

    #[instrument(skip(self, doc))]
    async fn create<T>(&self, collection: &str, doc: &T) -> Result<T, RemoteError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let url = self.items_url(collection, None)?;
        let response = self
            .authorized(self.inner.client.post(url))
            .json(doc)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        self.invalidate(collection).await;

        let body = response.text().await?;
        if body.trim().is_empty() {
            // 201/204 without a body: the store kept the document as sent
            return Ok(serde_json::from_value(serde_json::to_value(doc)?)?);
        }
        Ok(serde_json::from_str(&body)?)
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        let url = self.items_url(collection, Some(id))?;
        let response = self.authorized(self.inner.client.delete(url)).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            // Someone else removed it; our cached copy is stale either way
            self.invalidate(collection).await;
            return Err(RemoteError::NotFound(format!("{collection}/{id}")));
        }
        if !status.is_success() {
            return Err(api_error(response).await);
        }

        self.invalidate(collection).await;
        Ok(())
    }
}

/// Turn a non-success response into [`RemoteError::Api`].
async fn api_error(response: reqwest::Response) -> RemoteError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();
    tracing::error!(
        status = %status,
        body = %message.chars().take(500).collect::<String>(),
        "Document store returned non-success status"
    );
    RemoteError::Api {
        status: status.as_u16(),
        message: message.chars().take(200).collect(),
    }
}

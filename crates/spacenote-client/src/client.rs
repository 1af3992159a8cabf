//! HTTP client for the SpaceNote API.
//!
//! Reads go through [`QueryCache`] and the read [`RetryPolicy`]. Mutations
//! are sent once, and on success invalidate the cache keys they affect.
//! Authentication is the session cookie set by `auth/login`; the cookie
//! store is kept for the life of the client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use spacenote_core::defaults::API_PREFIX;
use spacenote_core::{Error, Result};

use crate::cache::QueryCache;
use crate::config::ClientConfig;
use crate::error::{error_from_response, error_from_transport, ErrorDisposition, RequestKind};
use crate::image::{ImageLoader, ImageProbe, ImageSource};
use crate::notifications::NotificationBus;
use crate::retry::RetryPolicy;

/// Percent-encode one path segment.
pub(crate) fn seg(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Query parameters of a request.
pub(crate) type Params = Vec<(&'static str, String)>;

#[derive(Debug, Clone)]
pub struct SpaceNoteClient {
    http: Client,
    config: Arc<ClientConfig>,
    cache: QueryCache,
    notifications: NotificationBus,
}

impl SpaceNoteClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        debug!(
            subsystem = "client",
            component = "http",
            base_url = %config.origin(),
            "SpaceNote client created"
        );

        Ok(Self {
            http,
            notifications: NotificationBus::new(config.notification_capacity),
            cache: QueryCache::with_capacity(config.cache_capacity),
            config: Arc::new(config),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn notifications(&self) -> &NotificationBus {
        &self.notifications
    }

    /// Absolute URL of an API path such as `spaces/trips`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.config.origin(), API_PREFIX, path)
    }

    /// URL of the image stored in a note's image field.
    pub fn note_image_url(&self, space: &str, number: i64, field: &str) -> String {
        self.url(&format!(
            "spaces/{}/notes/{}/images/{}",
            seg(space),
            number,
            seg(field)
        ))
    }

    /// Image loader polling through this client.
    pub fn image_loader(&self) -> ImageLoader<SpaceNoteClient> {
        ImageLoader::new(Arc::new(self.clone()), self.config.image_poll.clone())
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path))
    }

    pub(crate) fn put(&self, path: &str) -> RequestBuilder {
        self.http.put(self.url(path))
    }

    pub(crate) fn patch(&self, path: &str) -> RequestBuilder {
        self.http.patch(self.url(path))
    }

    pub(crate) fn delete(&self, path: &str) -> RequestBuilder {
        self.http.delete(self.url(path))
    }

    /// Send a request; non-2xx responses become errors.
    async fn send(&self, op: &str, request: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let response = request.send().await.map_err(error_from_transport)?;
        let status = response.status();
        debug!(
            subsystem = "client",
            component = "http",
            op,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        if status.is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        response.json::<T>().await.map_err(error_from_transport)
    }

    /// One uncached, unretried GET.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        op: &str,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<T> {
        let response = self.send(op, self.get(path).query(params)).await?;
        Self::read_json(response).await
    }

    /// Cached read with retries.
    ///
    /// When a refetch fails but earlier data exists, the earlier data is
    /// returned and the failure goes out as a notification only. A refetch
    /// rejected as unauthorized clears the cache and returns the error.
    pub(crate) async fn query<T>(&self, op: &str, path: &str, params: Params) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let key = cache_key(path, &params);
        let this = self;
        let params = params.as_slice();
        let fetched = self
            .cache
            .fetch(&key, move || {
                this.config
                    .retry
                    .run(op, move || this.get_json::<T>(op, path, params))
            })
            .await?;

        let Some(error) = fetched.refetch_error else {
            return Ok(fetched.value);
        };
        match ErrorDisposition::for_error(&error, RequestKind::BackgroundRefetch, path) {
            ErrorDisposition::RedirectToLogin { .. } => {
                warn!(
                    subsystem = "client",
                    component = "query",
                    op,
                    query_key = %key,
                    "Session rejected on refetch, dropping cached data"
                );
                self.cache.clear();
                Err(error)
            }
            _ => {
                warn!(
                    subsystem = "client",
                    component = "query",
                    op,
                    query_key = %key,
                    error = %error,
                    "Background refetch failed"
                );
                self.notifications.error(&error);
                Ok(fetched.value)
            }
        }
    }

    /// Send a mutation once. On success, invalidate `invalidate` prefixes.
    pub(crate) async fn mutate(
        &self,
        op: &str,
        request: RequestBuilder,
        invalidate: &[String],
    ) -> Result<Response> {
        match self.send(op, request).await {
            Ok(response) => {
                for prefix in invalidate {
                    self.cache.invalidate(prefix);
                }
                Ok(response)
            }
            Err(error) => {
                warn!(
                    subsystem = "client",
                    component = "mutation",
                    op,
                    code = %error.code(),
                    error = %error,
                    "Mutation failed"
                );
                Err(error)
            }
        }
    }

    pub(crate) async fn mutate_json<T: DeserializeOwned>(
        &self,
        op: &str,
        request: RequestBuilder,
        invalidate: &[String],
    ) -> Result<T> {
        let response = self.mutate(op, request, invalidate).await?;
        Self::read_json(response).await
    }

    pub(crate) async fn mutate_unit(
        &self,
        op: &str,
        request: RequestBuilder,
        invalidate: &[String],
    ) -> Result<()> {
        self.mutate(op, request, invalidate).await.map(|_| ())
    }

    /// Read without caching, with the read retry policy.
    pub(crate) async fn fetch_uncached<T: DeserializeOwned>(
        &self,
        op: &str,
        path: &str,
        params: Params,
    ) -> Result<T> {
        let policy: &RetryPolicy = &self.config.retry;
        let params = params.as_slice();
        policy
            .run(op, move || self.get_json::<T>(op, path, params))
            .await
    }
}

fn cache_key(path: &str, params: &[(&'static str, String)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();
    format!("{}?{}", path, query.join("&"))
}

#[async_trait]
impl ImageSource for SpaceNoteClient {
    async fn probe(&self, url: &str) -> Result<ImageProbe> {
        let response = self.send("image_probe", self.http.get(url)).await?;
        if response.status() == StatusCode::ACCEPTED {
            return Ok(ImageProbe::Processing);
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(error_from_transport)?;
        Ok(ImageProbe::Ready {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

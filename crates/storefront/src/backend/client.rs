//! Backend REST client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP. Category lists are cached with `moka`.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use super::query::{FULL_LIST_BATCH, ListQuery};
use super::types::{AuthResponse, ListResult};
use super::{ApiErrorBody, BackendError};
use crate::config::BackendConfig;

/// How much of an unexpected response body to keep in logs.
const LOG_BODY_CHARS: usize = 500;

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the backend REST API.
///
/// Cheap to clone; all clones share one connection pool and cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the base URL
    /// cannot carry API paths.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        if config.url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(config.url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.url.clone(),
                cache,
            }),
        })
    }

    /// The configured backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub(super) fn cache(&self) -> &Cache<CacheKey, CacheValue> {
        &self.inner.cache
    }

    /// Drop all cached catalog lists.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Build a URL from path segments below the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn records_url(&self, collection: &str) -> Result<Url, BackendError> {
        self.endpoint(&["api", "collections", collection, "records"])
    }

    fn record_url(&self, collection: &str, id: &str) -> Result<Url, BackendError> {
        self.endpoint(&["api", "collections", collection, "records", id])
    }

    /// Start a request, attaching the auth token when one is given.
    pub(super) fn request(
        &self,
        method: Method,
        url: Url,
        auth: Option<&SecretString>,
    ) -> RequestBuilder {
        let request = self.inner.client.request(method, url);
        match auth {
            Some(token) => request.header(AUTHORIZATION, token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and decode the JSON response body.
    pub(super) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &path, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path,
                body = %truncate(&body),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    /// Send a request whose success response has no body.
    pub(super) async fn send_empty(&self, request: RequestBuilder) -> Result<(), BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let path = response.url().path().to_string();
        let body = response.text().await?;
        Err(api_error(status, &path, &body))
    }

    // =========================================================================
    // Generic record operations
    // =========================================================================

    /// Fetch one page of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, query, auth), fields(collection = %collection))]
    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &ListQuery,
        auth: Option<&SecretString>,
    ) -> Result<ListResult<T>, BackendError> {
        let url = self.records_url(collection)?;
        let request = self.request(Method::GET, url, auth).query(&query.to_pairs());
        self.send(request).await
    }

    /// Fetch every record matching the query, batching through all pages.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self, query, auth), fields(collection = %collection))]
    pub async fn full_list<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &ListQuery,
        auth: Option<&SecretString>,
    ) -> Result<Vec<T>, BackendError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let batch_query = query
                .clone()
                .page(page)
                .per_page(FULL_LIST_BATCH)
                .skip_total();
            let batch: ListResult<T> = self.list(collection, &batch_query, auth).await?;
            let fetched = batch.items.len();
            items.extend(batch.items);
            if fetched < FULL_LIST_BATCH as usize {
                break;
            }
            page += 1;
        }
        debug!(count = items.len(), "Fetched full list");
        Ok(items)
    }

    /// Fetch the first record matching the query.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if nothing matches.
    #[instrument(skip(self, query, auth), fields(collection = %collection))]
    pub async fn first<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &ListQuery,
        auth: Option<&SecretString>,
    ) -> Result<T, BackendError> {
        let first_query = query.clone().page(1).per_page(1).skip_total();
        let result: ListResult<T> = self.list(collection, &first_query, auth).await?;
        result.items.into_iter().next().ok_or_else(|| {
            let filter = query
                .filter
                .as_ref()
                .map_or_else(String::new, ToString::to_string);
            BackendError::NotFound(format!("{collection}: {filter}"))
        })
    }

    /// Fetch a single record by id.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the record does not exist or is not
    /// visible to the caller.
    #[instrument(skip(self, auth), fields(collection = %collection, id = %id))]
    pub async fn get_one<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        expand: Option<&str>,
        auth: Option<&SecretString>,
    ) -> Result<T, BackendError> {
        let url = self.record_url(collection, id)?;
        let mut request = self.request(Method::GET, url, auth);
        if let Some(expand) = expand {
            request = request.query(&[("expand", expand)]);
        }
        self.send(request).await
    }

    /// Create a record from a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` with field errors if validation fails.
    #[instrument(skip(self, body, auth), fields(collection = %collection))]
    pub async fn create<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        collection: &str,
        body: &B,
        auth: Option<&SecretString>,
    ) -> Result<T, BackendError> {
        let url = self.records_url(collection)?;
        self.send(self.request(Method::POST, url, auth).json(body))
            .await
    }

    /// Create a record from a multipart form (records with files).
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` with field errors if validation fails.
    #[instrument(skip(self, form, auth), fields(collection = %collection))]
    pub async fn create_multipart<T: DeserializeOwned>(
        &self,
        collection: &str,
        form: Form,
        auth: Option<&SecretString>,
    ) -> Result<T, BackendError> {
        let url = self.records_url(collection)?;
        self.send(self.request(Method::POST, url, auth).multipart(form))
            .await
    }

    /// Update fields of a record from a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is missing or validation fails.
    #[instrument(skip(self, body, auth), fields(collection = %collection, id = %id))]
    pub async fn update<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        collection: &str,
        id: &str,
        body: &B,
        auth: Option<&SecretString>,
    ) -> Result<T, BackendError> {
        let url = self.record_url(collection, id)?;
        self.send(self.request(Method::PATCH, url, auth).json(body))
            .await
    }

    /// Update a record from a multipart form.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is missing or validation fails.
    #[instrument(skip(self, form, auth), fields(collection = %collection, id = %id))]
    pub async fn update_multipart<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        form: Form,
        auth: Option<&SecretString>,
    ) -> Result<T, BackendError> {
        let url = self.record_url(collection, id)?;
        self.send(self.request(Method::PATCH, url, auth).multipart(form))
            .await
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is missing or the caller may not delete it.
    #[instrument(skip(self, auth), fields(collection = %collection, id = %id))]
    pub async fn delete(
        &self,
        collection: &str,
        id: &str,
        auth: Option<&SecretString>,
    ) -> Result<(), BackendError> {
        let url = self.record_url(collection, id)?;
        self.send_empty(self.request(Method::DELETE, url, auth))
            .await
    }

    /// Authenticate a record of an auth collection with identity and password.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` with status 400 for wrong credentials.
    #[instrument(skip(self, password), fields(collection = %collection))]
    pub async fn auth_with_password<T: DeserializeOwned>(
        &self,
        collection: &str,
        identity: &str,
        password: &SecretString,
    ) -> Result<AuthResponse<T>, BackendError> {
        #[derive(Serialize)]
        struct Credentials<'a> {
            identity: &'a str,
            password: &'a str,
        }

        let url = self.endpoint(&["api", "collections", collection, "auth-with-password"])?;
        let body = Credentials {
            identity,
            password: password.expose_secret(),
        };
        self.send(self.request(Method::POST, url, None).json(&body))
            .await
    }

    /// Check that the backend is reachable and healthy.
    ///
    /// # Errors
    ///
    /// Returns an error if the health endpoint does not answer with 2xx.
    pub async fn health(&self) -> Result<(), BackendError> {
        let url = self.endpoint(&["api", "health"])?;
        self.send_empty(self.request(Method::GET, url, None)).await
    }

    /// Public URL of a stored file, optionally as a thumbnail (`"100x100"`).
    ///
    /// Returns `None` when the record has no file.
    #[must_use]
    pub fn file_url(
        &self,
        collection: &str,
        record_id: &str,
        filename: &str,
        thumb: Option<&str>,
    ) -> Option<String> {
        if filename.is_empty() {
            return None;
        }
        let mut url = self
            .endpoint(&["api", "files", collection, record_id, filename])
            .ok()?;
        if let Some(thumb) = thumb {
            url.query_pairs_mut().append_pair("thumb", thumb);
        }
        Some(url.to_string())
    }
}

/// Convert a non-success response into a `BackendError`.
fn api_error(status: StatusCode, path: &str, body: &str) -> BackendError {
    if status == StatusCode::NOT_FOUND {
        debug!(path = %path, "Backend record not found");
        return BackendError::NotFound(path.to_string());
    }

    if status.is_server_error() {
        tracing::error!(
            status = %status,
            path = %path,
            body = %truncate(body),
            "Backend returned server error"
        );
    } else {
        tracing::warn!(
            status = %status,
            path = %path,
            body = %truncate(body),
            "Backend rejected request"
        );
    }

    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.message.is_empty() {
        truncate(body)
    } else {
        parsed.message
    };

    BackendError::Api {
        status: status.as_u16(),
        message,
        data: parsed.data,
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            url: Url::parse(base).unwrap(),
            timeout: Duration::from_secs(5),
            catalog_cache_ttl: Duration::from_secs(60),
        })
        .unwrap()
    }

    #[test]
    fn test_record_url() {
        let client = client("http://127.0.0.1:8090");
        assert_eq!(
            client.record_url("products", "abc").unwrap().as_str(),
            "http://127.0.0.1:8090/api/collections/products/records/abc"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("https://shop.example/pb/");
        assert_eq!(
            client.records_url("orders").unwrap().as_str(),
            "https://shop.example/pb/api/collections/orders/records"
        );
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let client = client("http://127.0.0.1:8090");
        let url = client.record_url("products", "a/b").unwrap();
        assert_eq!(url.path(), "/api/collections/products/records/a%2Fb");
    }

    #[test]
    fn test_file_url() {
        let client = client("http://127.0.0.1:8090");
        assert_eq!(
            client
                .file_url("products", "p1", "rose.jpg", Some("100x100"))
                .unwrap(),
            "http://127.0.0.1:8090/api/files/products/p1/rose.jpg?thumb=100x100"
        );
        assert!(client.file_url("products", "p1", "", None).is_none());
    }

    #[test]
    fn test_api_error_decodes_body() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            "/api/collections/users/auth-with-password",
            r#"{"status":400,"message":"Failed to authenticate.","data":{}}"#,
        );
        match err {
            BackendError::Api {
                status, message, ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Failed to authenticate.");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_api_error_not_found() {
        let err = api_error(StatusCode::NOT_FOUND, "/api/x", "");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_api_error_non_json_body() {
        let err = api_error(StatusCode::BAD_GATEWAY, "/api/x", "upstream down");
        match err {
            BackendError::Api { message, .. } => assert_eq!(message, "upstream down"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_base_url() {
        let config = BackendConfig {
            url: Url::parse("mailto:admin@madio.ir").unwrap(),
            ..BackendConfig::default()
        };
        assert!(matches!(
            BackendClient::new(&config),
            Err(BackendError::InvalidUrl(_))
        ));
    }
}

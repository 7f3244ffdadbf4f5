//! HTTP client for the delivery backend.
//!
//! Every request reads the access token from the [`TokenStore`] at send
//! time. Any 401 clears the store before the error reaches the caller.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, multipart};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::{ApiError, ApiResult};
use crate::store::{ClearReason, TokenStore};

/// User-Agent header value.
pub const USER_AGENT: &str = concat!("entregas/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: TokenStore,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration, store: TokenStore) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    /// Client using the configured base URL and timeout.
    ///
    /// # Errors
    /// Returns an error if the base URL is malformed.
    pub fn from_config(config: &Config, store: TokenStore) -> Result<Self> {
        let base_url = config.effective_base_url()?;
        Self::new(&base_url, config.effective_timeout(), store)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.store.access_token() {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(Method::GET, path, self.request(Method::GET, path))
            .await
    }

    pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path).query(query);
        self.send(Method::GET, path, builder).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, path).json(body);
        self.send(Method::POST, path, builder).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::PUT, path).json(body);
        self.send(Method::PUT, path, builder).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::PATCH, path).json(body);
        self.send(Method::PATCH, path, builder).await
    }

    /// DELETE; the response body, if any, is ignored.
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let _: Value = self
            .send(Method::DELETE, path, self.request(Method::DELETE, path))
            .await?;
        Ok(())
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> ApiResult<T> {
        let builder = self.request(Method::POST, path).multipart(form);
        self.send(Method::POST, path, builder).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> ApiResult<T> {
        debug!(%method, path, "request");

        let response = builder.send().await.map_err(|e| {
            warn!(%method, path, "request failed: {e}");
            ApiError::from_reqwest(&e)
        })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        debug!(%method, path, status = status.as_u16(), "response");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!(%method, path, "backend rejected credentials; clearing session");
            self.store.clear(ClearReason::Unauthorized);
        }

        if !status.is_success() {
            return Err(ApiError::http_status(status.as_u16(), parse_body(&text)));
        }

        let body = if text.trim().is_empty() { "null" } else { &text };
        serde_json::from_str(body).map_err(|e| {
            let mut err = ApiError::parse(format!("Unexpected response from {path}: {e}"));
            err.status = Some(status.as_u16());
            err.body = parse_body(&text);
            err
        })
    }
}

/// JSON body if it parses, the raw text otherwise, `None` when empty.
fn parse_body(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string())))
}

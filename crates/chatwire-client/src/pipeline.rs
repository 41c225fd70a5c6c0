//! Authenticated request pipeline.
//!
//! Every call goes through here: the token store supplies headers (refreshing
//! first when needed), the transport carries the request, and the response is
//! decoded into either a typed value, a typed [`ApiError`], or a
//! [`ChatStream`] for streaming endpoints.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chatwire_auth::{TokenGrant, TokenStore};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ApiError, Error, Result, ValidationError};
use crate::stream::{ChatStream, StreamConfig, TokenMapper};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// API path prefix under the base URL.
pub const API_PREFIX: &str = "v1/";

/// Most bytes read from a rejected streaming response to build its error.
pub const MAX_ERROR_BODY: usize = 64 * 1024;

/// Shared transport handle.
pub type SharedTransport = Arc<dyn Transport>;

/// Composes auth headers onto requests and decodes responses.
#[derive(Debug)]
pub struct RequestPipeline {
    transport: SharedTransport,
    tokens: TokenStore,
    base_url: Url,
    timeout: Duration,
    stream_timeout: Duration,
    stream_config: StreamConfig,
}

impl RequestPipeline {
    pub fn new(transport: SharedTransport, tokens: TokenStore, base_url: Url) -> Self {
        Self {
            transport,
            tokens,
            base_url,
            timeout: crate::client::DEFAULT_TIMEOUT,
            stream_timeout: crate::client::DEFAULT_STREAM_TIMEOUT,
            stream_config: StreamConfig::default(),
        }
    }

    pub fn with_timeouts(mut self, timeout: Duration, stream_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.stream_timeout = stream_timeout;
        self
    }

    pub fn with_stream_config(mut self, config: StreamConfig) -> Self {
        self.stream_config = config;
        self
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL for an API path.
    pub fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        Ok(self.base_url.join(&format!("{}{}", API_PREFIX, path))?)
    }

    /// URL for a path outside the API prefix (e.g. `health`).
    pub fn root_url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request construction
    // ─────────────────────────────────────────────────────────────────────────

    /// Request carrying the current auth headers.
    pub async fn authorized(&self, method: Method, url: Url) -> Result<HttpRequest> {
        let headers = self.tokens.current_headers().await?;
        Ok(self.unauthenticated(method, url).headers(headers))
    }

    /// Request without auth headers (health, sign-in).
    pub fn unauthenticated(&self, method: Method, url: Url) -> HttpRequest {
        HttpRequest::new(method, url)
            .header("Accept", "application/json")
            .timeout(self.timeout)
    }

    fn with_json<B: Serialize + ?Sized>(request: HttpRequest, body: &B) -> Result<HttpRequest> {
        let body = serde_json::to_vec(body)
            .map_err(|e| ValidationError::InvalidPayload(e.to_string()))?;
        Ok(request
            .header("Content-Type", "application/json")
            .body(body))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Typed request/response path
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a request and return the raw response, mapping error statuses.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method.clone();
        let path = request.url.path().to_string();
        let response = self.transport.send(request).await.inspect_err(|e| {
            tracing::debug!(%method, path, error = %e, "Request failed before a response");
        })?;

        tracing::debug!(%method, path, status = response.status, "Request completed");
        if response.is_success() {
            Ok(response)
        } else {
            Err(api_error(&response).into())
        }
    }

    /// Send a request and decode a JSON body.
    pub async fn execute<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let response = self.send(request).await?;
        decode(&response.body)
    }

    /// Make a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.authorized(Method::GET, self.url(path)?).await?;
        self.execute(request).await
    }

    /// Make a GET request with query parameters.
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        let request = self.authorized(Method::GET, url).await?;
        self.execute(request).await
    }

    /// Make a POST request.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.authorized(Method::POST, self.url(path)?).await?;
        self.execute(Self::with_json(request, body)?).await
    }

    /// Make a PATCH request.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.authorized(Method::PATCH, self.url(path)?).await?;
        self.execute(Self::with_json(request, body)?).await
    }

    /// Make a DELETE request.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let request = self.authorized(Method::DELETE, self.url(path)?).await?;
        self.send(request).await?;
        Ok(())
    }

    /// POST raw bytes (e.g. a file upload).
    pub async fn post_bytes<T: DeserializeOwned>(
        &self,
        url: Url,
        content_type: &str,
        body: Bytes,
    ) -> Result<T> {
        let request = self
            .authorized(Method::POST, url)
            .await?
            .header("Content-Type", content_type)
            .body(body);
        self.execute(request).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Streaming path
    // ─────────────────────────────────────────────────────────────────────────

    /// POST a JSON body and attach the response body to a new [`ChatStream`].
    ///
    /// Returns once response headers arrive; tokens are read lazily.
    pub async fn post_stream<B>(
        &self,
        path: &str,
        body: &B,
        mapper: Option<TokenMapper>,
    ) -> Result<ChatStream>
    where
        B: Serialize + ?Sized,
    {
        let request = self.authorized(Method::POST, self.url(path)?).await?;
        let request = Self::with_json(request, body)?
            .header("Accept", "text/event-stream")
            .timeout(self.stream_timeout);

        let response = self.transport.stream(request).await?;
        if !response.is_success() {
            let response = response.collect_limited(MAX_ERROR_BODY).await?;
            tracing::debug!(path, status = response.status, "Streaming request rejected");
            return Err(api_error(&response).into());
        }

        if let Some(content_type) = response.headers.get("content-type")
            && !content_type.starts_with("text/event-stream")
        {
            tracing::debug!(path, content_type, "Streaming response is not text/event-stream");
        }

        tracing::debug!(path, "Stream opened");
        let mut config = self.stream_config.clone();
        if mapper.is_some() {
            config.mapper = mapper;
        }
        Ok(ChatStream::spawn(response.body, config))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication calls
    // ─────────────────────────────────────────────────────────────────────────

    /// POST to an auth endpoint without auth headers and push the returned
    /// tokens into the token store.
    pub async fn authenticate<B>(&self, path: &str, body: &B) -> Result<TokenGrant>
    where
        B: Serialize + ?Sized,
    {
        let request = self.unauthenticated(Method::POST, self.url(path)?);
        let grant: TokenGrant = self.execute(Self::with_json(request, body)?).await?;

        self.tokens.apply_grant(grant.clone()).await?;
        tracing::info!(path, "Signed in");
        Ok(grant)
    }
}

/// Decode a success body.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "Failed to decode response body");
        Error::Decoding(e.to_string())
    })
}

pub(crate) fn api_error(response: &HttpResponse) -> ApiError {
    ApiError::from_response(
        response.status,
        &response.body,
        response.header("retry-after"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_unencodable_body_is_validation_error() {
        let request = HttpRequest::new(Method::POST, Url::parse("http://localhost/v1/x").unwrap());
        let body = BTreeMap::from([(vec![1u8, 2], "sequence keys are not JSON")]);
        let err = RequestPipeline::with_json(request, &body).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_url_joins_api_prefix() {
        let pipeline = RequestPipeline::new(
            Arc::new(crate::transport::ReqwestTransport::new(reqwest::Client::new())),
            TokenStore::default(),
            Url::parse("https://chat.example.com/").unwrap(),
        );
        assert_eq!(
            pipeline.url("/models").unwrap().as_str(),
            "https://chat.example.com/v1/models"
        );
        assert_eq!(
            pipeline.root_url("health").unwrap().as_str(),
            "https://chat.example.com/health"
        );
    }
}

//! HTTP transport seam.
//!
//! The pipeline talks to the network only through [`Transport`]. Non-success
//! statuses come back as ordinary responses so the pipeline can tell HTTP
//! errors apart from connection failures.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Method;
use url::Url;

use crate::error::NetworkError;

/// Incremental response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, NetworkError>> + Send + 'static>>;

/// An outgoing request.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Bytes>,
    /// Deadline for the whole exchange, enforced by the transport.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Header values may carry credentials.
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A response whose body is still arriving.
pub struct StreamingResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Dropping the body cancels the underlying request.
    pub body: ByteStream,
}

impl StreamingResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Buffer at most `limit` bytes of the body, e.g. to decode an error
    /// payload. Anything past the limit is dropped unread.
    pub async fn collect_limited(self, limit: usize) -> Result<HttpResponse, NetworkError> {
        let mut body = Vec::new();
        let mut chunks = self.body;
        while body.len() < limit
            && let Some(chunk) = chunks.next().await
        {
            let chunk = chunk?;
            let take = chunk.len().min(limit - body.len());
            body.extend_from_slice(&chunk[..take]);
        }
        Ok(HttpResponse {
            status: self.status,
            headers: self.headers,
            body: body.into(),
        })
    }
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Issues requests on behalf of the pipeline.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send a request and buffer the whole response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError>;

    /// Send a request and return as soon as the response headers arrive.
    async fn stream(&self, request: HttpRequest) -> Result<StreamingResponse, NetworkError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// reqwest
// ─────────────────────────────────────────────────────────────────────────────

/// [`Transport`] over a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn build(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

fn lowercase_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        let response = self.build(request).send().await?;
        let status = response.status().as_u16();
        let headers = lowercase_headers(response.headers());
        let body = response.bytes().await?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn stream(&self, request: HttpRequest) -> Result<StreamingResponse, NetworkError> {
        let response = self.build(request).send().await?;
        let status = response.status().as_u16();
        let headers = lowercase_headers(response.headers());
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(NetworkError::from));
        Ok(StreamingResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_debug_hides_header_values() {
        let request = HttpRequest::new(Method::GET, Url::parse("http://localhost/x").unwrap())
            .header("Authorization", "Bearer secret");
        let debug = format!("{:?}", request);
        assert!(debug.contains("Authorization"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_response_header_lookup_is_case_insensitive() {
        let mut headers = BTreeMap::new();
        headers.insert("retry-after".to_string(), "3".to_string());
        let response = HttpResponse {
            status: 429,
            headers,
            body: Bytes::new(),
        };
        assert_eq!(response.header("Retry-After"), Some("3"));
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_streaming_response_collect() {
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let response = StreamingResponse {
            status: 500,
            headers: BTreeMap::new(),
            body: Box::pin(futures::stream::iter(chunks)),
        };
        let collected = response.collect_limited(1024).await.unwrap();
        assert_eq!(&collected.body[..], b"abcd");
        assert_eq!(collected.status, 500);
    }

    #[tokio::test]
    async fn test_collect_limited_stops_reading_endless_body() {
        let response = StreamingResponse {
            status: 503,
            headers: BTreeMap::new(),
            body: Box::pin(futures::stream::repeat_with(|| {
                Ok(Bytes::from_static(b"0123456789"))
            })),
        };
        let collected = response.collect_limited(25).await.unwrap();
        assert_eq!(&collected.body[..], b"0123456789012345678901234");
    }
}

//! Refresh through the service's own auth endpoint.

use std::time::Duration;

use async_trait::async_trait;
use chatwire_auth::{AuthError, TokenGrant, TokenRefresher};
use reqwest::Method;
use url::Url;

use crate::error::{ApiError, Error};
use crate::pipeline::{self, API_PREFIX, SharedTransport};
use crate::transport::HttpRequest;
use crate::types::RefreshRequest;

/// Path of the refresh endpoint under the API prefix.
pub const REFRESH_PATH: &str = "auth/refresh";

/// [`TokenRefresher`] that posts to `v1/auth/refresh`.
///
/// Goes straight to the transport without auth headers, so a refresh never
/// waits on the token store it is refreshing.
#[derive(Debug)]
pub struct ApiRefresher {
    transport: SharedTransport,
    url: Url,
    timeout: Duration,
}

impl ApiRefresher {
    pub fn new(transport: SharedTransport, base_url: &Url, timeout: Duration) -> Result<Self, Error> {
        let url = base_url.join(&format!("{}{}", API_PREFIX, REFRESH_PATH))?;
        Ok(Self {
            transport,
            url,
            timeout,
        })
    }
}

#[async_trait]
impl TokenRefresher for ApiRefresher {
    async fn refresh(&self, refresh_token: &str) -> chatwire_auth::Result<TokenGrant> {
        let body = serde_json::to_vec(&RefreshRequest { refresh_token })
            .map_err(|e| AuthError::Serialization(e.to_string()))?;
        let request = HttpRequest::new(Method::POST, self.url.clone())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .body(body)
            .timeout(self.timeout);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.is_success() {
            return Err(match pipeline::api_error(&response) {
                ApiError::BadRequest { message }
                | ApiError::Unauthorized { message }
                | ApiError::Forbidden { message } => AuthError::Unauthorized(message),
                other => AuthError::Backend(other.to_string()),
            });
        }

        pipeline::decode(&response.body).map_err(|e| AuthError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpResponse, StreamingResponse, Transport};
    use crate::error::NetworkError;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Canned {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
            self.seen.lock().push(request);
            Ok(HttpResponse {
                status: self.status,
                headers: BTreeMap::new(),
                body: Bytes::from_static(self.body.as_bytes()),
            })
        }

        async fn stream(&self, _request: HttpRequest) -> Result<StreamingResponse, NetworkError> {
            Err(NetworkError::NoConnection)
        }
    }

    fn refresher(status: u16, body: &'static str) -> (Arc<Canned>, ApiRefresher) {
        let transport = Arc::new(Canned {
            status,
            body,
            seen: Mutex::new(Vec::new()),
        });
        let base = Url::parse("https://chat.example.com/").unwrap();
        let refresher =
            ApiRefresher::new(transport.clone(), &base, Duration::from_secs(5)).unwrap();
        (transport, refresher)
    }

    #[tokio::test]
    async fn test_refresh_posts_token_without_auth_header() {
        let (transport, refresher) = refresher(
            200,
            r#"{"accessToken":"new","refreshToken":"r2","expiresIn":3600}"#,
        );

        let grant = refresher.refresh("r1").await.unwrap();
        assert_eq!(grant.access_token, "new");
        assert_eq!(grant.refresh_token.as_deref(), Some("r2"));

        let seen = transport.seen.lock();
        assert_eq!(seen[0].url.as_str(), "https://chat.example.com/v1/auth/refresh");
        assert!(!seen[0].headers.contains_key("Authorization"));
        let body: serde_json::Value = serde_json::from_slice(seen[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["refreshToken"], "r1");
    }

    #[tokio::test]
    async fn test_rejected_refresh_is_unauthorized() {
        let (_, refresher) = refresher(401, r#"{"message":"refresh token revoked"}"#);
        let err = refresher.refresh("r1").await.unwrap_err();
        assert_eq!(err, AuthError::Unauthorized("refresh token revoked".to_string()));
    }

    #[tokio::test]
    async fn test_server_error_is_backend() {
        let (_, refresher) = refresher(503, "");
        assert!(matches!(
            refresher.refresh("r1").await.unwrap_err(),
            AuthError::Backend(_)
        ));
    }
}

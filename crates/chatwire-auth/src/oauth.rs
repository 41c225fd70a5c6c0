//! OAuth 2.0 PKCE helpers for browser-based sign-in.
//!
//! The browser round-trip itself is driven by the caller; this module builds
//! the authorization URL, validates the pasted `code#state` and talks to the
//! token endpoint.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::credential::TokenGrant;
use crate::error::{AuthError, Result};
use crate::token_store::TokenRefresher;

/// OAuth endpoints and client registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl OAuthConfig {
    /// Config for a chat service rooted at `base_url`, using its conventional
    /// `/oauth/authorize` and `/oauth/token` endpoints.
    pub fn for_service(base_url: &str, client_id: impl Into<String>) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            client_id: client_id.into(),
            authorize_url: format!("{}/oauth/authorize", base),
            token_url: format!("{}/oauth/token", base),
            redirect_uri: format!("{}/oauth/code/callback", base),
            scope: "chat offline_access".to_string(),
        }
    }
}

/// PKCE code verifier and challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge pair.
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));

        Self {
            verifier,
            challenge,
        }
    }
}

/// Generate a random state string for CSRF protection.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Build the authorization URL for the OAuth flow.
pub fn build_authorization_url(config: &OAuthConfig, challenge: &str, state: &str) -> String {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", &config.redirect_uri),
        ("response_type", "code"),
        ("scope", &config.scope),
        ("code_challenge", challenge),
        ("code_challenge_method", "S256"),
        ("state", state),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.authorize_url, query)
}

/// Parse the `code#state` value shown by the callback page.
pub fn parse_code_state(input: &str) -> Result<(String, String)> {
    let Some((code, state)) = input.trim().split_once('#') else {
        return Err(AuthError::InvalidRequest(
            "Invalid format. Expected: code#state".to_string(),
        ));
    };

    if code.is_empty() || state.is_empty() {
        return Err(AuthError::InvalidRequest(
            "Missing code or state".to_string(),
        ));
    }

    Ok((code.to_string(), state.to_string()))
}

#[derive(Debug, Serialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
enum TokenRequest<'a> {
    AuthorizationCode {
        code: &'a str,
        state: &'a str,
        client_id: &'a str,
        redirect_uri: &'a str,
        code_verifier: &'a str,
    },
    RefreshToken {
        client_id: &'a str,
        refresh_token: &'a str,
    },
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
    verifier: &str,
    state: &str,
) -> Result<TokenGrant> {
    let request = TokenRequest::AuthorizationCode {
        code,
        state,
        client_id: &config.client_id,
        redirect_uri: &config.redirect_uri,
        code_verifier: verifier,
    };
    post_token_request(http, &config.token_url, &request, "Token exchange").await
}

async fn post_token_request(
    http: &reqwest::Client,
    token_url: &str,
    request: &TokenRequest<'_>,
    what: &str,
) -> Result<TokenGrant> {
    let response = http
        .post(token_url)
        .json(request)
        .send()
        .await
        .map_err(|e| AuthError::Network(format!("{} request failed: {}", what, e)))?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::BAD_REQUEST {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Unauthorized(format!("{} rejected: {}", what, body)));
    }
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AuthError::Backend(format!(
            "{} failed ({}): {}",
            what,
            status.as_u16(),
            body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AuthError::Backend(format!("Failed to parse token response: {}", e)))
}

/// [`TokenRefresher`] backed by an OAuth token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthRefresher {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthRefresher {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Exchange an authorization code using this refresher's client.
    pub async fn exchange_code(&self, code: &str, verifier: &str, state: &str) -> Result<TokenGrant> {
        exchange_code(&self.http, &self.config, code, verifier, state).await
    }
}

#[async_trait]
impl TokenRefresher for OAuthRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let request = TokenRequest::RefreshToken {
            client_id: &self.config.client_id,
            refresh_token,
        };
        post_token_request(&self.http, &self.config.token_url, &request, "Token refresh").await
    }
}

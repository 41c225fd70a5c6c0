//! Credential kinds and the headers they produce.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header name used for bearer and session tokens.
pub const AUTHORIZATION: &str = "Authorization";

/// Headers attached to an outgoing request.
pub type AuthHeaders = BTreeMap<String, String>;

/// The credential held by a [`TokenStore`](crate::TokenStore).
///
/// `Bearer::expires_at` is only ever set from a successful sign-in or refresh
/// response; `None` means the token is treated as non-expiring.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credential {
    /// Static API key headers sent verbatim.
    ApiKeys { headers: BTreeMap<String, String> },
    /// Long-lived session token.
    SessionToken { token: String },
    /// Short-lived access token with optional refresh token.
    Bearer {
        access_token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        refresh_token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expires_at: Option<DateTime<Utc>>,
    },
}

impl Credential {
    /// Single API key sent under `header`.
    pub fn api_key(header: impl Into<String>, key: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(header.into(), key.into());
        Credential::ApiKeys { headers }
    }

    pub fn session_token(token: impl Into<String>) -> Self {
        Credential::SessionToken {
            token: token.into(),
        }
    }

    /// Bearer token set directly by the caller; never proactively refreshed.
    pub fn bearer(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Credential::Bearer {
            access_token: access_token.into(),
            refresh_token,
            expires_at: None,
        }
    }

    /// Short name of the variant, safe to log.
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::ApiKeys { .. } => "api_keys",
            Credential::SessionToken { .. } => "session_token",
            Credential::Bearer { .. } => "bearer",
        }
    }

    /// Headers this credential contributes to a request.
    pub fn headers(&self) -> AuthHeaders {
        match self {
            Credential::ApiKeys { headers } => headers.clone(),
            Credential::SessionToken { token } => bearer_header(token),
            Credential::Bearer { access_token, .. } => bearer_header(access_token),
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            Credential::Bearer { refresh_token, .. } => refresh_token.as_deref(),
            _ => None,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Credential::Bearer { expires_at, .. } => *expires_at,
            _ => None,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ApiKeys { headers } => f
                .debug_struct("ApiKeys")
                .field("headers", &headers.keys().collect::<Vec<_>>())
                .finish(),
            Credential::SessionToken { .. } => f
                .debug_struct("SessionToken")
                .field("token", &"<redacted>")
                .finish(),
            Credential::Bearer {
                refresh_token,
                expires_at,
                ..
            } => f
                .debug_struct("Bearer")
                .field("access_token", &"<redacted>")
                .field("has_refresh_token", &refresh_token.is_some())
                .field("expires_at", expires_at)
                .finish(),
        }
    }
}

fn bearer_header(token: &str) -> AuthHeaders {
    let mut headers = AuthHeaders::new();
    headers.insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
    headers
}

/// Token payload returned by sign-in and refresh endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenGrant {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(alias = "expiresIn")]
    pub expires_in: u64,
    #[serde(default, alias = "tokenType")]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Persisted form of a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub credential: Credential,
    pub saved_at: DateTime<Utc>,
}

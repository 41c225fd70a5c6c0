//! Error types for credential handling.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while resolving, refreshing or persisting credentials.
///
/// Cloneable so one refresh outcome can be handed to every caller that
/// joined the same in-flight refresh.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    /// No credential is configured.
    #[error("no credential configured; sign in or set an API key first")]
    MissingToken,

    /// The bearer credential has no refresh token to mint a new access token.
    #[error("no refresh token available; sign in again")]
    MissingRefreshToken,

    /// The held token was rejected as malformed.
    #[error("invalid token")]
    InvalidToken,

    /// The held token is expired and could not be renewed.
    #[error("token expired")]
    TokenExpired,

    /// The credential kind cannot be refreshed.
    #[error("refresh is not supported for {0} credentials")]
    RefreshNotSupported(&'static str),

    /// The server rejected the credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Network/HTTP error during an auth call.
    #[error("network error: {0}")]
    Network(String),

    /// The auth endpoint returned an error.
    #[error("auth backend error: {0}")]
    Backend(String),

    /// Caller-supplied sign-in input was malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The credential store failed.
    #[error("credential storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Network(e.to_string())
    }
}

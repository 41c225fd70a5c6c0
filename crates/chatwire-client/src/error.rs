//! Client error types.
//!
//! Every failure reaching a caller is one of the kinds below, specific enough
//! to pick a recovery action (retry, re-authenticate, shrink the payload, back
//! off).

use std::time::Duration;

use chatwire_auth::AuthError;
use thiserror::Error;

/// Client error type.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Credential missing, rejected, or could not be refreshed.
    #[error("authentication error: {0}")]
    Authentication(#[from] AuthError),

    /// Server answered with a non-success status.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Success status, but the body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decoding(String),

    /// A streaming response failed or ended abnormally.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// A caller-supplied parameter violates a documented constraint.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Upload/download failure.
    #[error("file operation failed: {0}")]
    FileOperation(#[from] FileOperationError),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decoding(e.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Network(NetworkError::InvalidUrl(e.to_string()))
    }
}

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api(ApiError::NotFound { .. }))
            || matches!(self, Error::FileOperation(FileOperationError::NotFound(_)))
    }

    /// Check if the caller should re-authenticate.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Authentication(_))
            || matches!(self, Error::Api(ApiError::Unauthorized { .. }))
    }

    /// Check if this is a rate limit error.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::Api(ApiError::RateLimited { .. }))
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Error::Api(ApiError::ServerError { .. } | ApiError::ServiceUnavailable { .. })
        )
    }

    /// Check if the same request may succeed when retried later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api(api) => api.is_retryable(),
            Error::Network(net) => !matches!(
                net,
                NetworkError::InvalidUrl(_) | NetworkError::Cancelled
            ),
            Error::Stream(StreamError::ConnectionLost(_) | StreamError::TimedOut) => true,
            _ => false,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

// ─────────────────────────────────────────────────────────────────────────────
// API errors
// ─────────────────────────────────────────────────────────────────────────────

/// One variant per documented HTTP error status.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("payment required: balance {balance}, estimated cost {cost}")]
    PaymentRequired { balance: f64, cost: f64 },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("server error: {message}")]
    ServerError { message: String },

    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("undocumented status code {status}: {message}")]
    Undocumented { status: u16, message: String },
}

impl ApiError {
    /// Decode an error response from its status, body and `Retry-After` header.
    pub fn from_response(status: u16, body: &[u8], retry_after: Option<&str>) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();
        let message = parsed
            .as_ref()
            .and_then(ErrorBody::message)
            .unwrap_or_else(|| fallback_message(status, body));

        match status {
            400 => ApiError::BadRequest { message },
            401 => ApiError::Unauthorized { message },
            402 => match parsed.as_ref().and_then(ErrorBody::balance_and_cost) {
                Some((balance, cost)) => ApiError::PaymentRequired { balance, cost },
                None => ApiError::Undocumented { status, message },
            },
            403 => ApiError::Forbidden { message },
            404 => ApiError::NotFound { message },
            429 => ApiError::RateLimited {
                message,
                retry_after: retry_after.and_then(parse_retry_after),
            },
            500 => ApiError::ServerError { message },
            503 => ApiError::ServiceUnavailable { message },
            _ => ApiError::Undocumented { status, message },
        }
    }

    /// HTTP status this error was decoded from.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest { .. } => 400,
            ApiError::Unauthorized { .. } => 401,
            ApiError::PaymentRequired { .. } => 402,
            ApiError::Forbidden { .. } => 403,
            ApiError::NotFound { .. } => 404,
            ApiError::RateLimited { .. } => 429,
            ApiError::ServerError { .. } => 500,
            ApiError::ServiceUnavailable { .. } => 503,
            ApiError::Undocumented { status, .. } => *status,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited { .. }
                | ApiError::ServerError { .. }
                | ApiError::ServiceUnavailable { .. }
        )
    }
}

/// Error body shapes seen from the service.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    message: Option<String>,
    error: Option<ErrorDetail>,
    current_balance: Option<f64>,
    estimated_cost: Option<f64>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Object { message: Option<String> },
}

impl ErrorBody {
    fn message(&self) -> Option<String> {
        self.message.clone().or_else(|| match &self.error {
            Some(ErrorDetail::Text(text)) => Some(text.clone()),
            Some(ErrorDetail::Object { message }) => message.clone(),
            None => None,
        })
    }

    fn balance_and_cost(&self) -> Option<(f64, f64)> {
        Some((self.current_balance?, self.estimated_cost?))
    }
}

fn fallback_message(status: u16, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        format!("HTTP {}", status)
    } else {
        text.chars().take(512).collect()
    }
}

/// Parse a Retry-After header value given in seconds.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

// ─────────────────────────────────────────────────────────────────────────────
// Network errors
// ─────────────────────────────────────────────────────────────────────────────

/// The request could not be completed at the connection level.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timed out")]
    Timeout,

    #[error("no network connectivity")]
    NoConnection,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for NetworkError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            NetworkError::Timeout
        } else if e.is_builder() {
            NetworkError::InvalidUrl(e.to_string())
        } else {
            NetworkError::ConnectionFailed(e.to_string())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream errors
// ─────────────────────────────────────────────────────────────────────────────

/// Terminal error of a streaming response.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    #[error("invalid SSE format: {0}")]
    InvalidFormat(String),

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("stream closed unexpectedly")]
    ClosedUnexpectedly,

    #[error("stream timed out")]
    TimedOut,

    #[error("incomplete message at end of stream")]
    IncompleteMessage,

    #[error("unparsed stream buffer exceeded {limit} bytes")]
    BufferOverflow { limit: usize },
}

impl From<NetworkError> for StreamError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::Timeout => StreamError::TimedOut,
            other => StreamError::ConnectionLost(other.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation and file errors
// ─────────────────────────────────────────────────────────────────────────────

/// A request parameter violates a documented constraint.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("file is {size} bytes; the limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("'{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("'{field}' is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error("request body could not be encoded: {0}")]
    InvalidPayload(String),
}

/// Failure specific to file upload or download.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FileOperationError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("server rejected the upload as too large: {0}")]
    PayloadTooLarge(String),

    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("local I/O error: {0}")]
    Io(String),
}

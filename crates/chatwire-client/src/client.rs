//! The chatwire client handle and its builder.

use std::sync::Arc;
use std::time::Duration;

use chatwire_auth::{
    Credential, SharedClock, SharedCredentialStore, SharedRefresher, TokenStore,
};
use url::Url;

use crate::api::{
    AccountApi, AuthApi, ChatApi, ConversationsApi, FilesApi, HealthApi, ModelsApi,
};
use crate::error::{Error, Result};
use crate::pipeline::{RequestPipeline, SharedTransport};
use crate::refresh::ApiRefresher;
use crate::stream::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_BUFFER, StreamConfig};
use crate::transport::ReqwestTransport;

/// Default timeout for requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for streaming requests.
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(300);

/// Chat service API client.
///
/// Cheap to clone; clones share the token store and connection pool.
///
/// # Example
///
/// ```no_run
/// use chatwire_client::ChatwireClient;
///
/// # async fn example() -> chatwire_client::Result<()> {
/// let client = ChatwireClient::builder()
///     .base_url("https://chat.example.com")
///     .api_key("X-API-Key", "secret")
///     .build()?;
///
/// let models = client.models().list().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChatwireClient {
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
#[derive(Debug)]
pub(crate) struct ClientInner {
    pub(crate) pipeline: RequestPipeline,
}

impl ChatwireClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client with default settings and no credential.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    pub(crate) fn pipeline(&self) -> &RequestPipeline {
        &self.inner.pipeline
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        self.inner.pipeline.base_url()
    }

    /// Token store holding this client's credential.
    pub fn tokens(&self) -> &TokenStore {
        self.inner.pipeline.tokens()
    }

    /// Build a URL for an API path.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.inner.pipeline.url(path)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the sign-in API.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Access the chat API.
    pub fn chat(&self) -> ChatApi {
        ChatApi::new(self.clone())
    }

    /// Access the conversations API.
    pub fn conversations(&self) -> ConversationsApi {
        ConversationsApi::new(self.clone())
    }

    /// Access the models API.
    pub fn models(&self) -> ModelsApi {
        ModelsApi::new(self.clone())
    }

    /// Access the account API.
    pub fn account(&self) -> AccountApi {
        AccountApi::new(self.clone())
    }

    /// Access the files API.
    pub fn files(&self) -> FilesApi {
        FilesApi::new(self.clone())
    }

    /// Access the health API.
    pub fn health(&self) -> HealthApi {
        HealthApi::new(self.clone())
    }
}

impl std::fmt::Debug for ChatwireClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatwireClient")
            .field("base_url", &self.base_url().as_str())
            .finish_non_exhaustive()
    }
}

/// Builder for creating a [`ChatwireClient`].
pub struct ClientBuilder {
    base_url: Option<String>,
    credential: Option<Credential>,
    tokens: Option<TokenStore>,
    credential_store: Option<SharedCredentialStore>,
    refresher: Option<SharedRefresher>,
    clock: Option<SharedClock>,
    transport: Option<SharedTransport>,
    timeout: Duration,
    stream_timeout: Duration,
    user_agent: Option<String>,
    channel_capacity: usize,
    max_buffer: usize,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            credential: None,
            tokens: None,
            credential_store: None,
            refresher: None,
            clock: None,
            transport: None,
            timeout: DEFAULT_TIMEOUT,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            user_agent: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_buffer: DEFAULT_MAX_BUFFER,
        }
    }

    /// Set the base URL for the service.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Authenticate with an API key sent under `header`.
    pub fn api_key(mut self, header: impl Into<String>, key: impl Into<String>) -> Self {
        self.credential = Some(Credential::api_key(header, key));
        self
    }

    /// Authenticate with a session token.
    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.credential = Some(Credential::session_token(token));
        self
    }

    /// Authenticate with a bearer token and optional refresh token.
    pub fn bearer(mut self, access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        self.credential = Some(Credential::bearer(access_token, refresh_token));
        self
    }

    /// Start from an explicit credential.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Use an existing token store. Credential, store, refresher and clock
    /// settings are ignored.
    pub fn token_store(mut self, tokens: TokenStore) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Persist credentials through `store`.
    pub fn credential_store(mut self, store: SharedCredentialStore) -> Self {
        self.credential_store = Some(store);
        self
    }

    /// Refresh bearer tokens through `refresher` instead of `v1/auth/refresh`.
    pub fn refresher(mut self, refresher: SharedRefresher) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Time source for expiry decisions.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the HTTP transport.
    pub fn transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the streaming request timeout.
    pub fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Tokens buffered between a stream's reader and its consumer.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Cap on bytes held while a stream frame is incomplete.
    pub fn max_stream_buffer(mut self, bytes: usize) -> Self {
        self.max_buffer = bytes;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ChatwireClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        if self.channel_capacity == 0 {
            return Err(Error::Config("channel capacity must be at least 1".to_string()));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let user_agent = self
                    .user_agent
                    .unwrap_or_else(|| format!("chatwire-client/{}", env!("CARGO_PKG_VERSION")));
                let http = reqwest::Client::builder()
                    .user_agent(user_agent)
                    .build()
                    .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
                Arc::new(ReqwestTransport::new(http)) as SharedTransport
            }
        };

        let tokens = match self.tokens {
            Some(tokens) => tokens,
            None => {
                let refresher = match self.refresher {
                    Some(refresher) => refresher,
                    None => Arc::new(ApiRefresher::new(
                        Arc::clone(&transport),
                        &base_url,
                        self.timeout,
                    )?),
                };
                let mut builder = TokenStore::builder().refresher(refresher);
                if let Some(credential) = self.credential {
                    builder = builder.credential(credential);
                }
                if let Some(store) = self.credential_store {
                    builder = builder.store(store);
                }
                if let Some(clock) = self.clock {
                    builder = builder.clock(clock);
                }
                builder.build()
            }
        };

        let stream_config = StreamConfig {
            channel_capacity: self.channel_capacity,
            max_buffer: self.max_buffer,
            mapper: None,
        };
        let pipeline = RequestPipeline::new(transport, tokens, base_url)
            .with_timeouts(self.timeout, self.stream_timeout)
            .with_stream_config(stream_config);

        Ok(ChatwireClient {
            inner: Arc::new(ClientInner { pipeline }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let result = ClientBuilder::new().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_with_base_url() {
        let client = ClientBuilder::new()
            .base_url("https://chat.example.com")
            .build()
            .unwrap();

        assert_eq!(client.base_url().as_str(), "https://chat.example.com/");
        assert!(!client.tokens().has_credential());
    }

    #[test]
    fn test_builder_normalizes_trailing_slash() {
        let client = ClientBuilder::new()
            .base_url("https://chat.example.com/")
            .build()
            .unwrap();

        assert_eq!(client.base_url().as_str(), "https://chat.example.com/");
    }

    #[test]
    fn test_builder_rejects_zero_channel_capacity() {
        let result = ClientBuilder::new()
            .base_url("https://chat.example.com")
            .channel_capacity(0)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_installs_credential() {
        let client = ClientBuilder::new()
            .base_url("https://chat.example.com")
            .session_token("s-1")
            .build()
            .unwrap();

        assert_eq!(client.tokens().status().unwrap().kind, "session_token");
    }

    #[test]
    fn test_url_building() {
        let client = ClientBuilder::new()
            .base_url("https://chat.example.com")
            .build()
            .unwrap();

        let url = client.url("models").unwrap();
        assert_eq!(url.as_str(), "https://chat.example.com/v1/models");

        let url = client.url("/models").unwrap();
        assert_eq!(url.as_str(), "https://chat.example.com/v1/models");
    }

    #[test]
    fn test_url_building_under_path_prefix() {
        let client = ClientBuilder::new()
            .base_url("https://chat.example.com/chat")
            .build()
            .unwrap();

        let url = client.url("models").unwrap();
        assert_eq!(url.as_str(), "https://chat.example.com/chat/v1/models");
    }
}

//! Client configuration for connecting to chat services.
//!
//! Implements a kubeconfig-style configuration with named contexts:
//!
//! ```yaml
//! api-version: v1
//! kind: ClientConfig
//!
//! current-context: prod
//!
//! contexts:
//!   - name: local
//!     server: http://localhost:8080
//!     auth:
//!       type: session-token
//!       token-env: CHATWIRE_SESSION
//!   - name: prod
//!     server: https://chat.example.com
//!     auth:
//!       type: api-key
//!       key-file: ~/.config/chatwire/keys/prod.key
//!     stream-timeout: 600
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chatwire_auth::{Credential, OAuthConfig};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Client Config
// ─────────────────────────────────────────────────────────────────────────────

/// API version for the client config file format.
pub const API_VERSION: &str = "v1";

/// Kind identifier for client config files.
pub const KIND: &str = "ClientConfig";

/// Header carrying API keys unless a context overrides it.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Default config filename.
const CLIENT_CONFIG_FILE: &str = "client.yaml";

/// Root client configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    /// API version (always "v1" currently).
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Config kind (always "ClientConfig").
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Name of the current/default context.
    #[serde(default)]
    pub current_context: Option<String>,

    /// Named connection contexts.
    #[serde(default)]
    pub contexts: Vec<Context>,

    /// Default settings applied to all contexts.
    #[serde(default)]
    pub defaults: ClientDefaults,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

impl ClientConfig {
    /// An empty config with no contexts.
    pub fn new() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            ..Default::default()
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseYaml(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// The context named by `current-context`, if it exists.
    pub fn current(&self) -> Option<&Context> {
        self.get_context(self.current_context.as_deref()?)
    }

    /// Resolve `name`, or the current context when `None`.
    pub fn select(&self, name: Option<&str>) -> Result<&Context> {
        let name = name
            .or(self.current_context.as_deref())
            .ok_or(ConfigError::NoCurrentContext)?;
        self.get_context(name)
            .ok_or_else(|| ConfigError::ContextNotFound(name.to_string()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.contexts.iter().position(|c| c.name == name)
    }

    pub fn get_context(&self, name: &str) -> Option<&Context> {
        self.position(name).map(|i| &self.contexts[i])
    }

    pub fn get_context_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.position(name).map(|i| &mut self.contexts[i])
    }

    /// Insert `context`, replacing any context with the same name in place.
    pub fn set_context(&mut self, context: Context) {
        match self.position(&context.name) {
            Some(i) => self.contexts[i] = context,
            None => self.contexts.push(context),
        }
    }

    /// Remove a context. Deselects it if it was current.
    pub fn remove_context(&mut self, name: &str) -> Option<Context> {
        let removed = self.contexts.remove(self.position(name)?);
        if self.current_context.as_deref() == Some(name) {
            self.current_context = None;
        }
        Some(removed)
    }

    /// Make `name` the current context. It must already exist.
    pub fn use_context(&mut self, name: &str) -> Result<()> {
        if self.position(name).is_none() {
            return Err(ConfigError::ContextNotFound(name.to_string()));
        }
        self.current_context = Some(name.to_string());
        Ok(())
    }

    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.name.as_str()).collect()
    }

    /// Request timeout for a context, falling back to the defaults.
    pub fn timeout(&self, context: &Context) -> Duration {
        Duration::from_secs(context.timeout.unwrap_or(self.defaults.timeout))
    }

    /// Streaming timeout for a context, falling back to the defaults.
    pub fn stream_timeout(&self, context: &Context) -> Duration {
        Duration::from_secs(
            context
                .stream_timeout
                .unwrap_or(self.defaults.stream_timeout),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// A named connection context (server + auth bundle).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Context {
    /// Unique name for this context.
    pub name: String,

    /// Service base URL (e.g. "https://chat.example.com").
    pub server: String,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: Option<AuthConfig>,

    /// Request timeout override (seconds).
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Streaming timeout override (seconds).
    #[serde(default)]
    pub stream_timeout: Option<u64>,
}

impl Context {
    /// Create a new context with just a name and server URL.
    pub fn new(name: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server: server.into(),
            auth: None,
            timeout: None,
            stream_timeout: None,
        }
    }

    /// Set the auth configuration.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the streaming timeout.
    pub fn with_stream_timeout(mut self, timeout: u64) -> Self {
        self.stream_timeout = Some(timeout);
        self
    }

    /// Static credential configured for this context.
    ///
    /// `Ok(None)` for no auth and for OAuth, whose tokens live in the
    /// credential store. Fails when auth is configured but no secret is found.
    pub fn credential(&self) -> Result<Option<Credential>> {
        let Some(auth) = &self.auth else {
            return Ok(None);
        };
        let secret = auth.resolve()?;
        let credential = match (auth, secret) {
            (AuthConfig::None | AuthConfig::Oauth { .. }, _) => return Ok(None),
            (AuthConfig::ApiKey { header, .. }, Some(key)) => Credential::api_key(header, key),
            (AuthConfig::SessionToken { .. }, Some(token)) => Credential::session_token(token),
            (AuthConfig::Bearer { .. }, Some(token)) => Credential::bearer(token, None),
            (_, None) => {
                return Err(ConfigError::CredentialNotFound {
                    context: self.name.clone(),
                    source_hint: auth.source_hint(),
                });
            }
        };
        Ok(Some(credential))
    }

    /// OAuth endpoints for this context, when it signs in through OAuth.
    pub fn oauth_config(&self) -> Option<OAuthConfig> {
        let Some(AuthConfig::Oauth {
            client_id,
            authorize_url,
            token_url,
            redirect_uri,
            scope,
        }) = &self.auth
        else {
            return None;
        };

        let mut config = OAuthConfig::for_service(&self.server, client_id.clone());
        if let Some(url) = authorize_url {
            config.authorize_url = url.clone();
        }
        if let Some(url) = token_url {
            config.token_url = url.clone();
        }
        if let Some(uri) = redirect_uri {
            config.redirect_uri = uri.clone();
        }
        if let Some(scope) = scope {
            config.scope = scope.clone();
        }
        Some(config)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication configuration for a context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthConfig {
    /// No authentication.
    None,

    /// API key sent in a custom header.
    #[serde(rename_all = "kebab-case")]
    ApiKey {
        /// Path to file containing the API key.
        #[serde(default)]
        key_file: Option<PathBuf>,
        /// Environment variable containing the API key.
        #[serde(default)]
        key_env: Option<String>,
        /// Header name.
        #[serde(default = "default_api_key_header")]
        header: String,
    },

    /// Opaque session token.
    #[serde(rename_all = "kebab-case")]
    SessionToken {
        #[serde(default)]
        token_file: Option<PathBuf>,
        #[serde(default)]
        token_env: Option<String>,
    },

    /// Bearer token without refresh.
    #[serde(rename_all = "kebab-case")]
    Bearer {
        #[serde(default)]
        token_file: Option<PathBuf>,
        #[serde(default)]
        token_env: Option<String>,
    },

    /// OAuth sign-in; tokens are kept in the credential store.
    #[serde(rename_all = "kebab-case")]
    Oauth {
        client_id: String,
        #[serde(default)]
        authorize_url: Option<String>,
        #[serde(default)]
        token_url: Option<String>,
        #[serde(default)]
        redirect_uri: Option<String>,
        #[serde(default)]
        scope: Option<String>,
    },
}

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

impl AuthConfig {
    /// Create API key auth referencing a file.
    pub fn api_key_file(path: impl Into<PathBuf>) -> Self {
        Self::ApiKey {
            key_file: Some(path.into()),
            key_env: None,
            header: default_api_key_header(),
        }
    }

    /// Create API key auth referencing an environment variable.
    pub fn api_key_env(var: impl Into<String>) -> Self {
        Self::ApiKey {
            key_file: None,
            key_env: Some(var.into()),
            header: default_api_key_header(),
        }
    }

    /// Create OAuth auth with endpoints derived from the server URL.
    pub fn oauth(client_id: impl Into<String>) -> Self {
        Self::Oauth {
            client_id: client_id.into(),
            authorize_url: None,
            token_url: None,
            redirect_uri: None,
            scope: None,
        }
    }

    /// Resolve the secret value.
    ///
    /// Reads the file first, then the environment variable.
    pub fn resolve(&self) -> Result<Option<String>> {
        match self {
            AuthConfig::None | AuthConfig::Oauth { .. } => Ok(None),
            AuthConfig::ApiKey {
                key_file, key_env, ..
            } => read_secret(key_file.as_deref(), key_env.as_deref()),
            AuthConfig::SessionToken {
                token_file,
                token_env,
            }
            | AuthConfig::Bearer {
                token_file,
                token_env,
            } => read_secret(token_file.as_deref(), token_env.as_deref()),
        }
    }

    /// Where the secret was expected, for error messages.
    fn source_hint(&self) -> String {
        let (file, env) = match self {
            AuthConfig::ApiKey {
                key_file, key_env, ..
            } => (key_file, key_env),
            AuthConfig::SessionToken {
                token_file,
                token_env,
            }
            | AuthConfig::Bearer {
                token_file,
                token_env,
            } => (token_file, token_env),
            AuthConfig::None | AuthConfig::Oauth { .. } => return "not applicable".to_string(),
        };
        let mut hints = Vec::new();
        if let Some(path) = file {
            hints.push(format!("file {}", path.display()));
        }
        if let Some(var) = env {
            hints.push(format!("env ${}", var));
        }
        if hints.is_empty() {
            "no key-file or env configured".to_string()
        } else {
            hints.join(", ")
        }
    }
}

fn read_secret(file: Option<&Path>, env: Option<&str>) -> Result<Option<String>> {
    if let Some(path) = file {
        let expanded = expand_path(path);
        if expanded.exists() {
            let secret = std::fs::read_to_string(&expanded)
                .map_err(|e| ConfigError::ReadFile {
                    path: expanded.display().to_string(),
                    source: e,
                })?
                .trim()
                .to_string();
            if !secret.is_empty() {
                return Ok(Some(secret));
            }
        }
    }
    if let Some(var) = env
        && let Ok(secret) = std::env::var(var)
        && !secret.is_empty()
    {
        return Ok(Some(secret));
    }
    Ok(None)
}

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Default settings applied to all contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientDefaults {
    /// Default request timeout in seconds.
    pub timeout: u64,

    /// Default streaming timeout in seconds.
    pub stream_timeout: u64,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            timeout: 30,
            stream_timeout: 300,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading / Saving
// ─────────────────────────────────────────────────────────────────────────────

/// Get the path to the client config file.
pub fn client_config_path() -> Option<PathBuf> {
    crate::xdg_config_dir().map(|d| d.join(CLIENT_CONFIG_FILE))
}

/// Load the client configuration.
///
/// Returns a default config if the file doesn't exist.
pub fn load_client_config() -> Result<ClientConfig> {
    load_client_config_from(client_config_path().as_deref())
}

/// Load client config from a specific path.
pub fn load_client_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let Some(path) = path else {
        return Ok(ClientConfig::new());
    };

    if !path.exists() {
        tracing::debug!(path = %path.display(), "No client config file; using defaults");
        return Ok(ClientConfig::new());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;

    ClientConfig::from_yaml(&contents)
}

/// Save the client configuration.
pub fn save_client_config(config: &ClientConfig) -> Result<()> {
    let path = client_config_path().ok_or(ConfigError::NoConfigDir)?;
    save_client_config_to(config, &path)
}

/// Save client config to a specific path.
pub fn save_client_config_to(config: &ClientConfig, path: &Path) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_yaml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    tracing::debug!(path = %path.display(), "Saved client config");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Expand ~ to home directory in paths.
fn expand_path(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/"))
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

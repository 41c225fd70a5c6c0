//! Connection setup shared by commands.
//!
//! Resolves the target context from `client.yaml` and the global flags, then
//! builds a [`ChatwireClient`] whose token store persists to the context's
//! credential directory.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use chatwire_auth::{FileCredentialStore, OAuthConfig, OAuthRefresher};
use chatwire_client::ChatwireClient;
use chatwire_config::{ClientConfig, ConfigError, Context};

use crate::commands;

/// Name used when `--server` is given without any configured context.
const ADHOC_CONTEXT: &str = "default";

/// A resolved context and its client.
pub struct Connection {
    pub client: ChatwireClient,
    pub context: Context,
}

impl Connection {
    /// OAuth endpoints, when the context signs in through OAuth.
    pub fn oauth(&self) -> Option<OAuthConfig> {
        self.context.oauth_config()
    }
}

/// Pick the context named by the flags or the config file.
pub fn resolve_context(config: &ClientConfig, ctx: &commands::Context) -> Result<Context> {
    let mut context = match config.select(ctx.context_name.as_deref()) {
        Ok(context) => context.clone(),
        Err(ConfigError::NoCurrentContext) if ctx.server_override.is_some() => {
            Context::new(ADHOC_CONTEXT, "")
        }
        Err(e) => return Err(e.into()),
    };
    if let Some(server) = &ctx.server_override {
        context.server = server.clone();
    }
    Ok(context)
}

/// Build a client for the selected context.
///
/// A static credential from the context's auth config wins; otherwise the
/// credential persisted by `auth login` / `auth set-key` is loaded.
pub async fn connect(ctx: &commands::Context) -> Result<Connection> {
    let config = chatwire_config::load_client_config()?;
    let context = resolve_context(&config, ctx)?;

    let credentials_dir = chatwire_config::credentials_dir(&context.name)
        .context("could not determine config directory")?;
    let store = Arc::new(FileCredentialStore::new(&credentials_dir));

    let static_credential = match context.credential() {
        Ok(credential) => credential,
        Err(e @ ConfigError::CredentialNotFound { .. }) => {
            tracing::debug!(error = %e, "Falling back to stored credential");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let mut builder = ChatwireClient::builder()
        .base_url(&context.server)
        .timeout(config.timeout(&context))
        .stream_timeout(config.stream_timeout(&context))
        .credential_store(store);
    if let Some(oauth) = context.oauth_config() {
        builder = builder.refresher(Arc::new(OAuthRefresher::new(oauth)));
    }
    let has_static = static_credential.is_some();
    if let Some(credential) = static_credential {
        builder = builder.credential(credential);
    }

    let client = builder
        .build()
        .with_context(|| format!("invalid server URL for context '{}'", context.name))?;
    if !has_static {
        let found = client.tokens().load().await?;
        tracing::debug!(context = %context.name, found, "Loaded stored credential");
    }

    Ok(Connection { client, context })
}

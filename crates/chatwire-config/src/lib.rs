//! Client configuration for chatwire (kubeconfig-style).
//!
//! - Named connection contexts (server + auth + timeouts)
//! - `current-context` for default selection
//! - Auth methods: API key, session token, bearer token, OAuth sign-in
//! - Secrets referenced by file or environment variable, never inlined

pub mod client;
pub mod error;
pub mod paths;

pub use client::{
    AuthConfig, ClientConfig, ClientDefaults, Context, DEFAULT_API_KEY_HEADER,
    client_config_path, load_client_config, load_client_config_from, save_client_config,
    save_client_config_to,
};
pub use error::{ConfigError, Result};
pub use paths::{CONFIG_DIR_ENV, credentials_dir, log_dir, xdg_config_dir};

//! Config command - connection context management.

use std::path::PathBuf;

use anyhow::Result;
use chatwire_config::{AuthConfig, ClientConfig, Context as ClientContext};
use clap::{Args, Subcommand};
use console::Style;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show configuration file path
    Path,

    /// Show the current context name
    CurrentContext,

    /// List available contexts
    GetContexts,

    /// Switch to a different context
    UseContext {
        /// Context name to switch to
        name: String,
    },

    /// Create or update a context
    SetContext {
        /// Context name
        name: String,

        /// Server URL (e.g., https://chat.example.com)
        #[arg(long)]
        server: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Streaming timeout in seconds
        #[arg(long)]
        stream_timeout: Option<u64>,

        /// Read the API key from this environment variable
        #[arg(long, conflicts_with_all = ["api_key_file", "oauth_client_id"])]
        api_key_env: Option<String>,

        /// Read the API key from this file
        #[arg(long, conflicts_with = "oauth_client_id")]
        api_key_file: Option<PathBuf>,

        /// Sign in through OAuth with this client ID
        #[arg(long)]
        oauth_client_id: Option<String>,
    },

    /// Delete a context
    DeleteContext {
        /// Context name to delete
        name: String,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Path => cmd_path(),
        ConfigCommand::CurrentContext => cmd_current_context(),
        ConfigCommand::GetContexts => cmd_get_contexts(ctx),
        ConfigCommand::UseContext { name } => cmd_use_context(&name),
        ConfigCommand::SetContext {
            name,
            server,
            timeout,
            stream_timeout,
            api_key_env,
            api_key_file,
            oauth_client_id,
        } => {
            let auth = match (api_key_env, api_key_file, oauth_client_id) {
                (Some(var), _, _) => Some(AuthConfig::api_key_env(var)),
                (_, Some(path), _) => Some(AuthConfig::api_key_file(path)),
                (_, _, Some(client_id)) => Some(AuthConfig::oauth(client_id)),
                _ => None,
            };
            cmd_set_context(
                &name,
                ContextUpdate {
                    server,
                    timeout,
                    stream_timeout,
                    auth,
                },
            )
        }
        ConfigCommand::DeleteContext { name } => cmd_delete_context(&name),
    }
}

fn cmd_path() -> Result<()> {
    let path = chatwire_config::client_config_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_current_context() -> Result<()> {
    let config = chatwire_config::load_client_config()?;
    match &config.current_context {
        Some(name) => println!("{}", name),
        None => {
            println!("No current context set. Use 'chatwire config use-context <name>' to set one.")
        }
    }
    Ok(())
}

fn cmd_get_contexts(ctx: &Context) -> Result<()> {
    let config = chatwire_config::load_client_config()?;

    if ctx.json_output {
        let contexts: Vec<_> = config
            .contexts
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name,
                    "server": c.server,
                    "auth": auth_label(c.auth.as_ref()),
                    "current": config.current_context.as_deref() == Some(c.name.as_str()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&contexts)?);
        return Ok(());
    }

    if config.contexts.is_empty() {
        println!("No contexts configured.");
        println!();
        println!("Create one with:");
        println!("  chatwire config set-context prod --server=https://chat.example.com");
        return Ok(());
    }

    let current = config.current_context.as_deref();
    let bold = Style::new().bold();
    println!(
        "{}",
        bold.apply_to(format!("CURRENT   {:<15} {:<14} SERVER", "NAME", "AUTH"))
    );
    for c in &config.contexts {
        let marker = if current == Some(c.name.as_str()) { "*" } else { " " };
        println!(
            "{}         {:<15} {:<14} {}",
            marker,
            c.name,
            auth_label(c.auth.as_ref()),
            c.server
        );
    }
    Ok(())
}

fn cmd_use_context(name: &str) -> Result<()> {
    let mut config = chatwire_config::load_client_config()?;
    config.use_context(name)?;
    chatwire_config::save_client_config(&config)?;
    println!("Switched to context \"{}\".", name);
    Ok(())
}

/// Fields given to `set-context`.
#[derive(Debug, Default)]
struct ContextUpdate {
    server: Option<String>,
    timeout: Option<u64>,
    stream_timeout: Option<u64>,
    auth: Option<AuthConfig>,
}

fn cmd_set_context(name: &str, update: ContextUpdate) -> Result<()> {
    let mut config = chatwire_config::load_client_config()?;
    let had_current = config.current_context.is_some();
    let created = apply_update(&mut config, name, update)?;
    chatwire_config::save_client_config(&config)?;

    if created {
        println!("Context \"{}\" created.", name);
    } else {
        println!("Context \"{}\" modified.", name);
    }
    if !had_current && config.current_context.as_deref() == Some(name) {
        println!("Context \"{}\" set as current context.", name);
    }
    Ok(())
}

/// Create or modify a context. Returns whether it was created.
///
/// The first context created becomes current.
fn apply_update(config: &mut ClientConfig, name: &str, update: ContextUpdate) -> Result<bool> {
    let created = match config.get_context_mut(name) {
        Some(existing) => {
            if let Some(server) = update.server {
                existing.server = server;
            }
            if let Some(timeout) = update.timeout {
                existing.timeout = Some(timeout);
            }
            if let Some(timeout) = update.stream_timeout {
                existing.stream_timeout = Some(timeout);
            }
            if let Some(auth) = update.auth {
                existing.auth = Some(auth);
            }
            false
        }
        None => {
            let server = update
                .server
                .ok_or_else(|| anyhow::anyhow!("--server is required when creating a new context"))?;
            let mut context = ClientContext::new(name, server);
            context.timeout = update.timeout;
            context.stream_timeout = update.stream_timeout;
            context.auth = update.auth;
            config.set_context(context);
            true
        }
    };

    if config.current_context.is_none() && config.contexts.len() == 1 {
        config.current_context = Some(name.to_string());
    }
    Ok(created)
}

fn cmd_delete_context(name: &str) -> Result<()> {
    let mut config = chatwire_config::load_client_config()?;
    match config.remove_context(name) {
        Some(_) => {
            chatwire_config::save_client_config(&config)?;
            println!("Context \"{}\" deleted.", name);
            if config.current_context.is_none() {
                println!(
                    "Note: No current context. Use 'chatwire config use-context <name>' to set one."
                );
            }
        }
        None => anyhow::bail!("context '{}' not found", name),
    }
    Ok(())
}

fn auth_label(auth: Option<&AuthConfig>) -> &'static str {
    match auth {
        None | Some(AuthConfig::None) => "none",
        Some(AuthConfig::ApiKey { .. }) => "api-key",
        Some(AuthConfig::SessionToken { .. }) => "session-token",
        Some(AuthConfig::Bearer { .. }) => "bearer",
        Some(AuthConfig::Oauth { .. }) => "oauth",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_context_becomes_current() {
        let mut config = ClientConfig::new();
        let update = ContextUpdate {
            server: Some("https://chat.example.com".to_string()),
            ..Default::default()
        };
        assert!(apply_update(&mut config, "prod", update).unwrap());
        assert_eq!(config.current_context.as_deref(), Some("prod"));

        let update = ContextUpdate {
            server: Some("http://localhost:8080".to_string()),
            ..Default::default()
        };
        assert!(apply_update(&mut config, "local", update).unwrap());
        assert_eq!(config.current_context.as_deref(), Some("prod"));
    }

    #[test]
    fn test_new_context_requires_server() {
        let mut config = ClientConfig::new();
        let err = apply_update(&mut config, "prod", ContextUpdate::default()).unwrap_err();
        assert!(err.to_string().contains("--server"));
        assert!(config.contexts.is_empty());
    }

    #[test]
    fn test_update_keeps_unset_fields() {
        let mut config = ClientConfig::new();
        config.set_context(
            ClientContext::new("prod", "https://chat.example.com")
                .with_auth(AuthConfig::api_key_env("CHAT_KEY"))
                .with_timeout(10),
        );

        let update = ContextUpdate {
            stream_timeout: Some(600),
            ..Default::default()
        };
        assert!(!apply_update(&mut config, "prod", update).unwrap());

        let context = config.get_context("prod").unwrap();
        assert_eq!(context.server, "https://chat.example.com");
        assert_eq!(context.timeout, Some(10));
        assert_eq!(context.stream_timeout, Some(600));
        assert_eq!(auth_label(context.auth.as_ref()), "api-key");
    }
}

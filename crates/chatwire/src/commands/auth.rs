//! Auth command - sign-in and credential management.

use std::io::Write;

use anyhow::Result;
use chatwire_auth::{Credential, OAuthConfig, OAuthRefresher, PkceChallenge, oauth};
use chatwire_config::DEFAULT_API_KEY_HEADER;
use clap::{Args, Subcommand};
use console::Style;

use super::Context;
use crate::client::{self, Connection};

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Sign in (browser flow for OAuth contexts, email/password otherwise)
    Login {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// Show the credential held for the current context
    Status,

    /// Sign out and remove stored credentials
    Logout,

    /// Store an API key for the current context
    SetKey {
        /// The API key
        key: String,

        /// Header the key is sent in
        #[arg(long, default_value = DEFAULT_API_KEY_HEADER)]
        header: String,
    },
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    let conn = client::connect(ctx).await?;
    match args.command {
        AuthCommand::Login { email } => cmd_login(&conn, email).await,
        AuthCommand::Status => cmd_status(&conn, ctx),
        AuthCommand::Logout => cmd_logout(&conn).await,
        AuthCommand::SetKey { key, header } => cmd_set_key(&conn, header, key).await,
    }
}

async fn cmd_login(conn: &Connection, email: Option<String>) -> Result<()> {
    if let Some(status) = conn.client.auth().status()
        && !status.is_expired
    {
        println!(
            "Already signed in to '{}' ({}, expires in {})",
            conn.context.name,
            status.kind,
            status.expires_in_display()
        );
        println!("Run 'chatwire auth logout' first to sign in again.");
        return Ok(());
    }

    match conn.oauth() {
        Some(config) => login_oauth(conn, config).await,
        None => login_password(conn, email).await,
    }
}

async fn login_password(conn: &Connection, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => {
            let email = prompt("Email: ")?;
            if email.is_empty() {
                println!("No email provided, aborting.");
                return Ok(());
            }
            email
        }
    };
    let password = rpassword::prompt_password("Password: ")?;

    let grant = conn
        .client
        .auth()
        .sign_in(&email, password)
        .await
        .map_err(|e| anyhow::anyhow!("Sign-in failed: {}", e))?;

    println!();
    println!(
        "{} Signed in to '{}' as {}",
        Style::new().green().apply_to("✓"),
        conn.context.name,
        email
    );
    println!("Token expires in: {} seconds", grant.expires_in);
    Ok(())
}

async fn login_oauth(conn: &Connection, config: OAuthConfig) -> Result<()> {
    let pkce = PkceChallenge::generate();
    let state = oauth::generate_state();
    let auth_url = oauth::build_authorization_url(&config, &pkce.challenge, &state);

    println!("Sign in to '{}'", conn.context.name);
    println!();
    println!("Open this URL in your browser:");
    println!();
    println!("  {}", auth_url);
    println!();
    println!("After signing in, copy the code#state value and paste it here:");
    println!();

    if open_url(&auth_url).is_err() {
        println!("(Could not open browser automatically)");
        println!();
    }

    let input = prompt("code#state> ")?;
    if input.is_empty() {
        println!("No input provided, aborting.");
        return Ok(());
    }

    let (code, received_state) = oauth::parse_code_state(&input)
        .map_err(|e| anyhow::anyhow!("Failed to parse response: {}", e))?;
    if received_state != state {
        anyhow::bail!("State mismatch: the pasted value is not from this sign-in attempt");
    }

    println!("Exchanging code for tokens...");
    let grant = OAuthRefresher::new(config)
        .exchange_code(&code, &pkce.verifier, &state)
        .await
        .map_err(|e| anyhow::anyhow!("Token exchange failed: {}", e))?;
    let expires_in = grant.expires_in;
    conn.client.tokens().apply_grant(grant).await?;

    println!();
    println!("{} Signed in", Style::new().green().apply_to("✓"));
    println!("Token expires in: {} seconds", expires_in);
    Ok(())
}

fn cmd_status(conn: &Connection, ctx: &Context) -> Result<()> {
    let status = conn.client.auth().status();

    if ctx.json_output {
        let json = match &status {
            Some(status) => serde_json::json!({
                "context": conn.context.name,
                "server": conn.context.server,
                "signedIn": true,
                "kind": status.kind,
                "expiresAt": status.expires_at.map(|at| at.to_rfc3339()),
                "isExpired": status.is_expired,
                "hasRefreshToken": status.has_refresh_token,
            }),
            None => serde_json::json!({
                "context": conn.context.name,
                "server": conn.context.server,
                "signedIn": false,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("Context: {} {}", conn.context.name, dim.apply_to(&conn.context.server));
    match status {
        Some(status) => {
            println!("Credential: {}", status.kind);
            println!("  Expires: {}", status.expires_in_display());
            if status.kind == "bearer" {
                let refresh = if status.has_refresh_token { "yes" } else { "no" };
                println!("  Refresh token: {}", refresh);
            }
        }
        None => {
            println!("Not signed in");
            println!("  Run 'chatwire auth login' or 'chatwire auth set-key <KEY>'");
        }
    }
    Ok(())
}

async fn cmd_logout(conn: &Connection) -> Result<()> {
    if !conn.client.tokens().has_credential() {
        println!("No credentials found for '{}'.", conn.context.name);
        return Ok(());
    }
    conn.client
        .auth()
        .sign_out()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to remove credentials: {}", e))?;
    println!("Signed out of '{}'.", conn.context.name);
    Ok(())
}

async fn cmd_set_key(conn: &Connection, header: String, key: String) -> Result<()> {
    if key.trim().is_empty() {
        anyhow::bail!("API key must not be empty");
    }
    conn.client
        .tokens()
        .set_credential(Credential::api_key(header, key.trim()))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to save API key: {}", e))?;
    println!("API key stored for '{}'.", conn.context.name);
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Try to open a URL in the default browser.
fn open_url(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).status()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).status()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .status()?;
    }
    Ok(())
}

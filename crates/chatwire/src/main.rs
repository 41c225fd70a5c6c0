//! chatwire - command-line client for chat services.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod commands;

use commands::{auth, chat, config, models};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// chatwire - talk to a chat service from the terminal
#[derive(Parser)]
#[command(name = "chatwire")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Service URL (overrides the context's server)
    #[arg(long, global = true, env = "CHATWIRE_SERVER_URL")]
    pub server: Option<String>,

    /// Context from client.yaml to use instead of current-context
    #[arg(long, global = true, env = "CHATWIRE_CONTEXT")]
    pub context: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a prompt and stream the reply
    Chat(chat::ChatArgs),

    /// Sign in, sign out and inspect credentials
    Auth(auth::AuthArgs),

    /// List available models
    Models(models::ModelsArgs),

    /// Manage connection contexts
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

const CRATES: [&str; 4] = ["chatwire", "chatwire_client", "chatwire_auth", "chatwire_config"];

fn filter_for(level: &str, fallback: &str) -> String {
    let mut directives: Vec<String> = CRATES.iter().map(|c| format!("{}={}", c, level)).collect();
    directives.push(fallback.to_string());
    directives.join(",")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let console_filter = if cli.verbose {
        filter_for("debug", "info")
    } else {
        filter_for("warn", "warn")
    };

    let log_dir = chatwire_config::log_dir().unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "chatwire.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(console_filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(filter_for("debug", "info"))),
        )
        .init();

    let ctx = commands::Context {
        server_override: cli.server,
        context_name: cli.context,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Chat(args) => chat::run(args, &ctx).await,
        Commands::Auth(args) => auth::run(args, &ctx).await,
        Commands::Models(args) => models::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

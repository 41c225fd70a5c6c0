//! CLI command handlers.

pub mod auth;
pub mod chat;
pub mod config;
pub mod models;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Service URL overriding the selected context's server.
    pub server_override: Option<String>,
    /// Context name overriding `current-context`.
    pub context_name: Option<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

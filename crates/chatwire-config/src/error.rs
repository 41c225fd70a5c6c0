//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading or resolving client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config or secret file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a config file.
    #[error("failed to write config file '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse YAML.
    #[error("failed to parse YAML config: {0}")]
    ParseYaml(String),

    /// Failed to serialize YAML.
    #[error("failed to serialize config: {0}")]
    Serialize(String),

    /// Context not found.
    #[error("context '{0}' not found")]
    ContextNotFound(String),

    /// No context selected and none given.
    #[error("no current context set; pass --context or run `chatwire config use-context`")]
    NoCurrentContext,

    /// Auth is configured but its secret could not be found.
    #[error("credential for context '{context}' not found ({source_hint})")]
    CredentialNotFound {
        context: String,
        source_hint: String,
    },

    /// Could not determine the config directory.
    #[error("could not determine config directory")]
    NoConfigDir,
}

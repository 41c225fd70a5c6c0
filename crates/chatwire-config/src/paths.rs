//! Well-known locations under the config directory.

use std::path::PathBuf;

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "CHATWIRE_CONFIG_DIR";

/// Application directory name under the platform config dir.
const APP_NAME: &str = "chatwire";

/// Config directory: `$CHATWIRE_CONFIG_DIR`, else `<platform config>/chatwire`.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Directory holding persisted credentials for one context.
pub fn credentials_dir(context: &str) -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join("credentials").join(context))
}

/// Directory for rolling log files.
pub fn log_dir() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join("logs"))
}

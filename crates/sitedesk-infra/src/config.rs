//! Console configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.sitedesk/` in production)
//! and deserializes it into [`ConsoleConfig`]. Falls back to defaults when
//! the file is missing, malformed, or fails validation.

use std::path::Path;

use sitedesk_types::config::ConsoleConfig;

/// Load console configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`ConsoleConfig::default()`].
/// - If the file exists but fails to parse or validate, logs a warning and
///   returns the default.
/// - Otherwise returns the parsed config.
pub async fn load_console_config(data_dir: &Path) -> ConsoleConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ConsoleConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ConsoleConfig::default();
        }
    };

    let config = match toml::from_str::<ConsoleConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            return ConsoleConfig::default();
        }
    };

    if let Err(err) = config.validate() {
        tracing::warn!("Invalid {}: {err}, using defaults", config_path.display());
        return ConsoleConfig::default();
    }
    config
}

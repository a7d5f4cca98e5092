//! Console configuration types.
//!
//! `ConsoleConfig` represents `config.toml` in the data directory: where the
//! console API lives, which paths the gate guards, and which dashboard sources
//! to load and poll.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::source::{Criticality, Refresh, SourceId};

/// Top-level configuration. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the console API (no trailing slash).
    pub api_base_url: String,
    /// Paths at or under this prefix are protected.
    pub protected_prefix: String,
    /// The public entry page.
    pub entry_path: String,
    /// Where denied navigations are sent.
    pub login_path: String,
    /// Where live sessions visiting the entry page are sent.
    pub protected_home: String,
    /// Name of the cookie that carries the credential.
    pub cookie_name: String,
    /// Logout endpoint (POST).
    pub logout_path: String,
    /// Per-fetch timeout for data sources.
    pub request_timeout_ms: u64,
    /// Bounded wait for the logout call before the local redirect proceeds.
    pub logout_timeout_ms: u64,
    /// Directory of the built console pages served by `sdesk serve`.
    pub web_dir: Option<String>,
    /// Dashboard sources.
    pub sources: Vec<SourceConfig>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            protected_prefix: "/admin".to_string(),
            entry_path: "/".to_string(),
            login_path: "/".to_string(),
            protected_home: "/admin/dashboard".to_string(),
            cookie_name: "token".to_string(),
            logout_path: "/api/auth/logout".to_string(),
            request_timeout_ms: 10_000,
            logout_timeout_ms: 3_000,
            web_dir: None,
            sources: default_sources(),
        }
    }
}

impl ConsoleConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn logout_timeout(&self) -> Duration {
        Duration::from_millis(self.logout_timeout_ms)
    }

    /// Check route settings and source ids.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.protected_prefix.starts_with('/') || self.protected_prefix == "/" {
            return Err(ConfigError::InvalidRoute(format!(
                "protected_prefix must be a non-root absolute path, got '{}'",
                self.protected_prefix
            )));
        }
        for (name, path) in [
            ("entry_path", &self.entry_path),
            ("login_path", &self.login_path),
            ("protected_home", &self.protected_home),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidRoute(format!(
                    "{name} must be an absolute path, got '{path}'"
                )));
            }
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.id.as_str()) {
                return Err(ConfigError::DuplicateSource(source.id.clone()));
            }
        }
        Ok(())
    }
}

/// One dashboard data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    /// Collection endpoint path, relative to `api_base_url`.
    pub path: String,
    /// Poll period in seconds. Absent or 0 means fetch once.
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    /// Whether an initial-load failure degrades the whole view.
    #[serde(default)]
    pub critical: bool,
}

impl SourceConfig {
    pub fn source_id(&self) -> SourceId {
        SourceId::new(self.id.clone())
    }

    pub fn refresh(&self) -> Refresh {
        Refresh::from_secs(self.poll_interval_secs)
    }

    pub fn criticality(&self) -> Criticality {
        if self.critical {
            Criticality::Critical
        } else {
            Criticality::Optional
        }
    }
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            id: "visitor-stats".to_string(),
            path: "/api/analytics/stats".to_string(),
            poll_interval_secs: None,
            critical: true,
        },
        SourceConfig {
            id: "active-visitors".to_string(),
            path: "/api/analytics/active".to_string(),
            poll_interval_secs: Some(15),
            critical: false,
        },
        SourceConfig {
            id: "messages".to_string(),
            path: "/api/messages".to_string(),
            poll_interval_secs: Some(30),
            critical: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ConsoleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cookie_name, "token");
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[0].refresh(), Refresh::Once);
        assert_eq!(config.sources[0].criticality(), Criticality::Critical);
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: ConsoleConfig = toml::from_str("").unwrap();
        assert_eq!(config.protected_prefix, "/admin");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.sources.len(), 3);
    }

    #[test]
    fn test_deserialize_with_sources() {
        let toml_str = r#"
api_base_url = "https://api.example.com"
protected_prefix = "/console"

[[sources]]
id = "bookings"
path = "/api/bookings"
poll_interval_secs = 60

[[sources]]
id = "stats"
path = "/api/analytics/stats"
critical = true
"#;
        let config: ConsoleConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.protected_prefix, "/console");
        assert_eq!(config.login_path, "/");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(
            config.sources[0].refresh(),
            Refresh::every(Duration::from_secs(60))
        );
        assert!(!config.sources[0].critical);
        assert!(config.sources[1].critical);
    }

    #[test]
    fn test_validate_rejects_root_prefix() {
        let config = ConsoleConfig {
            protected_prefix: "/".to_string(),
            ..ConsoleConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRoute(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_sources() {
        let mut config = ConsoleConfig::default();
        config.sources.push(config.sources[0].clone());
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateSource("visitor-stats".to_string()))
        );
    }
}

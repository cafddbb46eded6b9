//! actionwire configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::coordinator::CoordinatorConfig;

/// Main actionwire configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Coordinator naming, retry and timeout defaults
    pub coordinator: CoordinatorConfig,

    /// HTTP transport settings
    pub http: HttpConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// An explicit path must load. Otherwise `./.actionwire.yml`, then
    /// `<config_dir>/actionwire/actionwire.yml`, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .actionwire.yml
        let local_config = PathBuf::from(".actionwire.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/actionwire/actionwire.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("actionwire").join("actionwire.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Client-wide timeout in milliseconds (0 disables)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Base URL that relative request URLs are resolved against
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        debug!("HttpConfig::default: called");
        Self {
            timeout_ms: 0,
            user_agent: format!("actionwire/{}", env!("CARGO_PKG_VERSION")),
            base_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querystring::ArrayFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.coordinator.request_suffix, "REQUEST");
        assert_eq!(config.http.timeout_ms, 0);
        assert!(config.http.user_agent.starts_with("actionwire/"));
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
log-level: debug
coordinator:
  success-suffix: DONE
  default-timeout-ms: 15000
  default-retries:
    GET: 1
  array-format: brackets
http:
  base-url: http://localhost:3000
"#
        )
        .unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.coordinator.success_suffix, "DONE");
        assert_eq!(config.coordinator.failure_suffix, "FAILURE");
        assert_eq!(config.coordinator.default_timeout_ms, 15_000);
        assert_eq!(config.coordinator.retries_for("GET"), 1);
        assert_eq!(config.coordinator.array_format, ArrayFormat::Brackets);
        assert_eq!(config.http.base_url.as_deref(), Some("http://localhost:3000"));
        assert!(config.http.user_agent.starts_with("actionwire/"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let path = PathBuf::from("/definitely/not/here/actionwire.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "coordinator: [not, a, map]").unwrap();
        assert!(Config::load(Some(&file.path().to_path_buf())).is_err());
    }
}

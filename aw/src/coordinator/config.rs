//! Coordinator configuration

use std::collections::HashMap;
use std::time::Duration;

use querystring::{ArrayFormat, EncodeOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::DEFAULT_CHANNEL_CAPACITY;
use crate::request::{QueryEncoder, RequestBuilder};

/// Coordinator configuration
///
/// Captured once per coordinator instance and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Suffix stripped from request action types when naming outcomes
    #[serde(default = "default_request_suffix", rename = "request-suffix")]
    pub request_suffix: String,

    #[serde(default = "default_success_suffix", rename = "success-suffix")]
    pub success_suffix: String,

    #[serde(default = "default_failure_suffix", rename = "failure-suffix")]
    pub failure_suffix: String,

    /// How arrays in GET data are encoded into the query string
    #[serde(default, rename = "array-format")]
    pub array_format: ArrayFormat,

    /// Timeout applied when a request declares none (0 disables)
    #[serde(default, rename = "default-timeout-ms")]
    pub default_timeout_ms: u64,

    /// Retry count per HTTP method when a request declares none
    #[serde(default, rename = "default-retries")]
    pub default_retries: HashMap<String, u32>,

    /// Capacity of the action bus created by the coordinator
    #[serde(default = "default_bus_capacity", rename = "bus-capacity")]
    pub bus_capacity: usize,

    /// Channel buffer size for control requests
    #[serde(default = "default_channel_buffer", rename = "channel-buffer")]
    pub channel_buffer: usize,

    #[serde(skip)]
    pub query_encoder: QueryEncoder,
}

fn default_request_suffix() -> String {
    debug!("default_request_suffix: called");
    "REQUEST".to_string()
}

fn default_success_suffix() -> String {
    debug!("default_success_suffix: called");
    "SUCCESS".to_string()
}

fn default_failure_suffix() -> String {
    debug!("default_failure_suffix: called");
    "FAILURE".to_string()
}

fn default_bus_capacity() -> usize {
    debug!("default_bus_capacity: called");
    DEFAULT_CHANNEL_CAPACITY
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    100
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        debug!("CoordinatorConfig::default: called");
        Self {
            request_suffix: default_request_suffix(),
            success_suffix: default_success_suffix(),
            failure_suffix: default_failure_suffix(),
            array_format: ArrayFormat::default(),
            default_timeout_ms: 0,
            default_retries: HashMap::new(),
            bus_capacity: default_bus_capacity(),
            channel_buffer: default_channel_buffer(),
            query_encoder: QueryEncoder::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Default retry count for a method (keys compared case-insensitively)
    pub fn retries_for(&self, method: &str) -> u32 {
        let retries = self
            .default_retries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(method))
            .map(|(_, count)| *count)
            .unwrap_or(0);
        debug!(%method, retries, "CoordinatorConfig::retries_for: called");
        retries
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        (self.default_timeout_ms > 0).then(|| Duration::from_millis(self.default_timeout_ms))
    }

    /// Request builder bound to this configuration
    pub fn request_builder(&self) -> RequestBuilder {
        RequestBuilder::new(
            self.query_encoder.clone(),
            EncodeOptions::new(self.array_format),
            self.default_timeout_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.request_suffix, "REQUEST");
        assert_eq!(config.success_suffix, "SUCCESS");
        assert_eq!(config.failure_suffix, "FAILURE");
        assert_eq!(config.array_format, ArrayFormat::Indices);
        assert_eq!(config.default_timeout(), None);
        assert_eq!(config.bus_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_deserialize_kebab_case() {
        let yaml = r#"
request-suffix: ""
default-timeout-ms: 15000
default-retries:
  GET: 1
array-format: comma
"#;
        let config: CoordinatorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.request_suffix, "");
        assert_eq!(config.success_suffix, "SUCCESS");
        assert_eq!(config.default_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.array_format, ArrayFormat::Comma);
    }

    #[test]
    fn test_retries_for_is_case_insensitive() {
        let config = CoordinatorConfig {
            default_retries: HashMap::from([("GET".to_string(), 2)]),
            ..Default::default()
        };
        assert_eq!(config.retries_for("get"), 2);
        assert_eq!(config.retries_for("POST"), 0);
    }
}

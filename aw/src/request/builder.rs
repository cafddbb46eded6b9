//! Normalizes request descriptors into transport-ready requests

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use querystring::EncodeOptions;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::action::{RequestSpec, ResponseType};

/// Header name written when the caller did not set one
pub const CONTENT_TYPE: &str = "Content-Type";

/// Default body encoding advertised to the server
pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Errors raised while normalizing a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Request descriptor has no url")]
    MissingUrl,

    #[error("Request descriptor sets both groupKey ({key}) and groupScope ({scope})")]
    ConflictingGroups { key: String, scope: String },
}

/// A fully normalized request, ready for a transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Milliseconds, 0 means no timeout
    pub timeout: u64,
    #[serde(rename = "responseType")]
    pub response_type: ResponseType,
    #[serde(rename = "withCredentials")]
    pub with_credentials: bool,
    #[serde(rename = "crossDomain")]
    pub cross_domain: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl Request {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_millis(self.timeout))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Pluggable query-string encoder for GET data
#[derive(Clone)]
pub struct QueryEncoder(Arc<dyn Fn(&Value, &EncodeOptions) -> String + Send + Sync>);

impl QueryEncoder {
    pub fn new<F>(encode: F) -> Self
    where
        F: Fn(&Value, &EncodeOptions) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(encode))
    }

    pub fn encode(&self, data: &Value, options: &EncodeOptions) -> String {
        (self.0)(data, options)
    }
}

impl Default for QueryEncoder {
    fn default() -> Self {
        Self::new(querystring::stringify)
    }
}

impl fmt::Debug for QueryEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueryEncoder")
    }
}

/// Pure descriptor-to-request normalizer
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    encoder: QueryEncoder,
    options: EncodeOptions,
    default_timeout_ms: u64,
}

impl RequestBuilder {
    pub fn new(encoder: QueryEncoder, options: EncodeOptions, default_timeout_ms: u64) -> Self {
        Self {
            encoder,
            options,
            default_timeout_ms,
        }
    }

    /// Normalize a descriptor into a [`Request`]
    pub fn build(&self, spec: &RequestSpec) -> Result<Request, BuildError> {
        debug!(url = %spec.url, method = %spec.method, "RequestBuilder::build: called");
        if spec.url.is_empty() {
            return Err(BuildError::MissingUrl);
        }
        if let (Some(key), Some(scope)) = (&spec.meta.group_key, &spec.meta.group_scope) {
            return Err(BuildError::ConflictingGroups {
                key: key.clone(),
                scope: scope.clone(),
            });
        }

        let method = if spec.method.is_empty() {
            "GET".to_string()
        } else {
            spec.method.to_uppercase()
        };

        let mut url = spec.url.clone();
        let mut body = None;
        let data = spec.data.as_ref().filter(|data| !data.is_null());
        if method == "GET" {
            if let Some(data) = data {
                let query = self.encoder.encode(data, &self.options);
                if !query.is_empty() {
                    url.push(if url.contains('?') { '&' } else { '?' });
                    url.push_str(&query);
                }
            }
        } else {
            body = data.cloned();
        }

        let mut headers = spec.headers.clone();
        if !headers.keys().any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE)) {
            headers.insert(CONTENT_TYPE.to_string(), DEFAULT_CONTENT_TYPE.to_string());
        }

        let timeout = spec.meta.timeout.unwrap_or(self.default_timeout_ms);
        debug!(%method, %url, timeout, "RequestBuilder::build: normalized");

        Ok(Request {
            method,
            url,
            headers,
            body,
            timeout,
            response_type: spec.response_type,
            with_credentials: spec.with_credentials,
            cross_domain: spec.cross_domain,
            user: spec.username.clone(),
            password: spec.password.clone(),
        })
    }
}

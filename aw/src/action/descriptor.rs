//! Request descriptors carried by actions
//!
//! A descriptor keeps the wire-safe request fields ([`RequestSpec`]) apart from
//! the in-process callbacks ([`RequestHooks`]) and the follow-up chain, so the
//! serializable part can be echoed into outcome metadata without touching
//! caller-owned data.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Action;

/// Transforms a successful response body before it becomes the outcome payload
pub type ResponseTransform = Arc<dyn Fn(Value) -> eyre::Result<Value> + Send + Sync>;

/// Side-effect callback invoked with the final outcome payload
pub type OutcomeCallback = Arc<dyn Fn(&Value) -> eyre::Result<()> + Send + Sync>;

/// Builds the next action of a chain from the prior success payload
pub type ChainLink = Arc<dyn Fn(&Value) -> eyre::Result<Action> + Send + Sync>;

/// Concurrency policy applied within a correlation group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResolvePolicy {
    /// Cancel any earlier in-flight call when a newer one launches
    Latest,
    /// Run every call to completion
    #[default]
    #[serde(alias = "MERGE")]
    All,
}

/// How the transport should decode the response body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Json,
    Text,
}

impl ResponseType {
    fn is_default(&self) -> bool {
        *self == ResponseType::Json
    }
}

/// Scheduling options nested under the descriptor's `meta`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// Per-request timeout in milliseconds (0 disables)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Additional attempts after a failure
    #[serde(default, alias = "retry", alias = "retries", skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,

    /// Action type that aborts this call when seen on the bus
    #[serde(default, alias = "cancelType", skip_serializing_if = "Option::is_none")]
    pub cancel_on_type: Option<String>,

    /// Debounce window in milliseconds
    #[serde(default, alias = "debounce", skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,

    /// Cross-type correlation id, used verbatim as the group key
    #[serde(default, alias = "groupUid", skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,

    /// Within-type correlation id, combined with the action type
    #[serde(default, alias = "group", skip_serializing_if = "Option::is_none")]
    pub group_scope: Option<String>,

    #[serde(default, alias = "resolve", skip_serializing_if = "Option::is_none")]
    pub resolve_policy: Option<ResolvePolicy>,
}

impl RequestOptions {
    fn is_empty(&self) -> bool {
        *self == RequestOptions::default()
    }

    /// Debounce window, if one was declared (zero means none)
    pub fn debounce(&self) -> Option<Duration> {
        self.debounce_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }

    pub fn policy(&self) -> ResolvePolicy {
        self.resolve_policy.unwrap_or_default()
    }
}

/// Wire-safe part of a request descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, rename = "withCredentials", skip_serializing_if = "is_false")]
    pub with_credentials: bool,

    #[serde(default, rename = "crossDomain", skip_serializing_if = "is_false")]
    pub cross_domain: bool,

    #[serde(default, rename = "responseType", skip_serializing_if = "ResponseType::is_default")]
    pub response_type: ResponseType,

    #[serde(default, skip_serializing_if = "RequestOptions::is_empty")]
    pub meta: RequestOptions,
}

fn default_method() -> String {
    "GET".to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl RequestSpec {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: BTreeMap::new(),
            data: None,
            username: None,
            password: None,
            with_credentials: false,
            cross_domain: false,
            response_type: ResponseType::default(),
            meta: RequestOptions::default(),
        }
    }
}

impl From<&str> for RequestSpec {
    fn from(url: &str) -> Self {
        RequestSpec::new(default_method(), url)
    }
}

/// Callbacks that never leave the process
#[derive(Clone, Default)]
pub struct RequestHooks {
    pub response_transform: Option<ResponseTransform>,
    pub on_complete: Option<OutcomeCallback>,
    pub on_error: Option<OutcomeCallback>,
}

impl fmt::Debug for RequestHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHooks")
            .field("response_transform", &self.response_transform.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Everything needed to issue a request on behalf of an action
///
/// Serializes as its [`RequestSpec`] only. Deserializes from either a full
/// spec object or a bare URL string.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "DescriptorRepr", into = "RequestSpec")]
pub struct RequestDescriptor {
    pub spec: RequestSpec,
    pub hooks: RequestHooks,
    pub chain: Vec<ChainLink>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorRepr {
    Url(String),
    Spec(RequestSpec),
}

impl From<DescriptorRepr> for RequestDescriptor {
    fn from(repr: DescriptorRepr) -> Self {
        match repr {
            DescriptorRepr::Url(url) => RequestSpec::from(url.as_str()).into(),
            DescriptorRepr::Spec(spec) => spec.into(),
        }
    }
}

impl From<RequestSpec> for RequestDescriptor {
    fn from(spec: RequestSpec) -> Self {
        Self {
            spec,
            hooks: RequestHooks::default(),
            chain: Vec::new(),
        }
    }
}

impl From<RequestDescriptor> for RequestSpec {
    fn from(descriptor: RequestDescriptor) -> Self {
        descriptor.spec
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("spec", &self.spec)
            .field("hooks", &self.hooks)
            .field("chain_len", &self.chain.len())
            .finish()
    }
}

impl RequestDescriptor {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        RequestSpec::new(method, url).into()
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new("PUT", url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new("PATCH", url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new("DELETE", url)
    }

    pub fn options(&self) -> &RequestOptions {
        &self.spec.meta
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.spec.data = Some(data);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.spec.username = Some(username.into());
        self.spec.password = Some(password.into());
        self
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.spec.response_type = response_type;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.spec.meta.timeout = Some(timeout_ms);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.spec.meta.retry_count = Some(retries);
        self
    }

    pub fn cancel_on(mut self, action_type: impl Into<String>) -> Self {
        self.spec.meta.cancel_on_type = Some(action_type.into());
        self
    }

    pub fn debounce(mut self, debounce_ms: u64) -> Self {
        self.spec.meta.debounce_ms = Some(debounce_ms);
        self
    }

    pub fn group_key(mut self, key: impl Into<String>) -> Self {
        self.spec.meta.group_key = Some(key.into());
        self
    }

    pub fn group_scope(mut self, scope: impl Into<String>) -> Self {
        self.spec.meta.group_scope = Some(scope.into());
        self
    }

    pub fn resolve(mut self, policy: ResolvePolicy) -> Self {
        self.spec.meta.resolve_policy = Some(policy);
        self
    }

    pub fn on_response<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> eyre::Result<Value> + Send + Sync + 'static,
    {
        self.hooks.response_transform = Some(Arc::new(transform));
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Value) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.hooks.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Value) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.hooks.on_error = Some(Arc::new(callback));
        self
    }

    /// Append a follow-up request built from this request's success payload
    pub fn then<F>(mut self, link: F) -> Self
    where
        F: Fn(&Value) -> eyre::Result<Action> + Send + Sync + 'static,
    {
        self.chain.push(Arc::new(link));
        self
    }
}

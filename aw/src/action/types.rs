//! The action type flowing through the bus

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::descriptor::{RequestDescriptor, ResolvePolicy};

/// A discrete application event
///
/// Only actions carrying a `request` are acted on by the coordinator; every
/// other action is observed but never altered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,

    #[serde(default, alias = "ajax", skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestDescriptor>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Action {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: None,
            error: false,
            meta: Map::new(),
            request: None,
        }
    }

    /// Create an action carrying a request descriptor
    pub fn request(action_type: impl Into<String>, request: RequestDescriptor) -> Self {
        Self::new(action_type).with_request(request)
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_request(mut self, request: RequestDescriptor) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn is_request(&self) -> bool {
        self.request.is_some()
    }

    /// Resolve policy declared by the request, if any
    pub fn policy(&self) -> ResolvePolicy {
        self.request
            .as_ref()
            .map(|request| request.options().policy())
            .unwrap_or_default()
    }
}

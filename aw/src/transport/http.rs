//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::debug;

use super::{Response, Transport, TransportError};
use crate::action::ResponseType;
use crate::config::HttpConfig;
use crate::request::Request;

/// Transport that performs requests over HTTP
pub struct HttpTransport {
    http: Client,
    base_url: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        debug!(?config, "HttpTransport::new: called");
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if config.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.timeout_ms));
        }
        let http = builder.build().map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        match &self.base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/')),
            None => url.to_string(),
        }
    }
}

fn decode_body(response_type: ResponseType, text: String) -> Value {
    match response_type {
        ResponseType::Text => Value::String(text),
        ResponseType::Json => {
            if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        let url = self.resolve_url(&request.url);
        debug!(method = %request.method, %url, "HttpTransport::execute: called");

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransportError::Network(format!("Invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(user) = &request.user {
            builder = builder.basic_auth(user, request.password.as_ref());
        }
        if let Some(limit) = request.timeout() {
            builder = builder.timeout(limit);
        }
        builder = match &request.body {
            Some(Value::String(raw)) => builder.body(raw.clone()),
            Some(body) => {
                let bytes = serde_json::to_vec(body).map_err(|e| TransportError::Network(e.to_string()))?;
                builder.body(bytes)
            }
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(request.timeout().unwrap_or_default())
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| TransportError::Network(e.to_string()))?;
        debug!(status, bytes = text.len(), "HttpTransport::execute: response received");

        Ok(Response::new(status, decode_body(request.response_type, text)))
    }
}

//! Transport adapter boundary
//!
//! A [`Transport`] performs exactly one request. Retries, timeouts and
//! cancellation live above it: the coordinator wraps every attempt with
//! [`attempt`], and aborts a call by dropping its future.

mod http;
pub mod mock;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::request::Request;

pub use http::HttpTransport;
pub use mock::MockTransport;

/// Raw response returned by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Errors produced by a single transport attempt
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("HTTP {status}")]
    Status { status: u16, body: Value },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),
}

impl TransportError {
    /// Status reported in failure outcomes, 0 when no response was received
    pub fn status(&self) -> u16 {
        match self {
            TransportError::Status { status, .. } => *status,
            TransportError::Timeout(_) | TransportError::Network(_) => 0,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

/// Executes one normalized request
///
/// Implementations must be cancel-safe: dropping the returned future aborts the
/// underlying request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &Request) -> Result<Response, TransportError>;
}

/// Run one attempt with the request's timeout and treat non-2xx as failure
pub async fn attempt(transport: &dyn Transport, request: &Request) -> Result<Response, TransportError> {
    debug!(method = %request.method, url = %request.url, "attempt: called");
    let response = match request.timeout() {
        Some(limit) => tokio::time::timeout(limit, transport.execute(request))
            .await
            .map_err(|_| TransportError::Timeout(limit))??,
        None => transport.execute(request).await?,
    };

    if response.is_success() {
        Ok(response)
    } else {
        debug!(status = response.status, "attempt: non-success status");
        Err(TransportError::Status {
            status: response.status,
            body: response.body,
        })
    }
}

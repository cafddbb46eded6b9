//! actionwire - request coordination over an action bus
//!
//! Applications publish actions onto an [`ActionBus`]. Actions that carry a
//! [`RequestDescriptor`] are picked up by the [`Coordinator`], which builds a
//! normalized request, performs it through a [`Transport`] and publishes a
//! `*_SUCCESS` or `*_FAILURE` outcome action back onto the same bus.
//!
//! # Core Concepts
//!
//! - **Correlation groups**: requests are partitioned by `groupKey`,
//!   `type/groupScope` or type; each group runs in its own task
//! - **Resolve policy**: `LATEST` cancels the previous in-flight call of the
//!   group, `ALL` lets every call finish
//! - **Debounce, retry, timeout, cancellation**: declared per request
//! - **Chains**: a successful request can inject the next request action
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use actionwire::{Action, ActionBus, CoordinatorConfig, RequestDescriptor, spawn_coordinator};
//! use actionwire::transport::HttpTransport;
//!
//! let transport = Arc::new(HttpTransport::new(&Default::default())?);
//! let (handle, task) = spawn_coordinator(CoordinatorConfig::default(), transport, ActionBus::default());
//!
//! let mut rx = handle.subscribe();
//! handle.dispatch(Action::request("FOO_REQUEST", RequestDescriptor::get("/api/foos")))?;
//! // rx yields FOO_REQUEST, then FOO_SUCCESS or FOO_FAILURE
//! ```
//!
//! # Modules
//!
//! - [`action`] - actions and request descriptors
//! - [`request`] - descriptor normalization
//! - [`transport`] - transport trait, HTTP and mock implementations
//! - [`events`] - action bus and action log
//! - [`coordinator`] - routing, scheduling and outcome synthesis
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod action;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod request;
pub mod transport;

// Re-export commonly used types
pub use action::{Action, RequestDescriptor, RequestOptions, RequestSpec, ResolvePolicy, ResponseType};
pub use config::{Config, HttpConfig};
pub use coordinator::{
    Coordinator, CoordinatorConfig, CoordinatorError, CoordinatorHandle, CoordinatorMetrics, spawn_coordinator,
};
pub use events::{ActionBus, ActionFilter, ActionLogEntry, ActionLogger, read_action_log, spawn_action_logger};
pub use request::{BuildError, Request, RequestBuilder};
pub use transport::{HttpTransport, MockTransport, Response, Transport, TransportError};

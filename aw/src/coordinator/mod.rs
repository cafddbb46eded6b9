//! Request coordinator
//!
//! Watches the action bus for actions carrying a request descriptor, routes
//! them to per-key group tasks, performs the calls through a [`Transport`]
//! and publishes success or failure outcomes back onto the bus.
//!
//! [`Transport`]: crate::transport::Transport

mod call;
mod cancel;
mod chain;
mod config;
mod core;
mod error;
mod group;
mod handle;
mod messages;
mod outcome;
mod router;

pub use config::CoordinatorConfig;
pub use self::core::{Coordinator, join_result, spawn_coordinator};
pub use error::{CoordinatorError, Hook};
pub use handle::CoordinatorHandle;
pub use messages::{CoordRequest, CoordinatorMetrics};
pub use outcome::outcome_type;
pub use router::correlation_key;

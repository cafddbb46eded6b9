//! Action bus and action log
//!
//! Every action of an application flows through one [`ActionBus`]. The
//! coordinator taps it for request actions and publishes outcomes back into
//! it; the action log and the CLI printer tap it for everything. Other
//! observers subscribe to the bounded broadcast side.
//!
//! ```text
//!   dispatch ──▶ ┌──────────────────────────────┐ ─tap─▶ coordinator (router)
//!                │          ACTION BUS          │ ─tap─▶ cancellation watchers
//!   outcomes ──▶ │  taps: unbounded mpsc        │ ─tap─▶ action log (.jsonl)
//!   chains   ──▶ │  subscribers: broadcast      │ ─tap─▶ CLI printer
//!                └──────────────────────────────┘ ─sub─▶ observers
//! ```

mod bus;
mod logger;

pub use bus::{ActionBus, ActionFilter, DEFAULT_CHANNEL_CAPACITY};
pub use logger::{ActionLogEntry, ActionLogger, read_action_log, spawn_action_logger};

//! CoordinatorHandle - client interface for dispatching actions

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use super::core::FaultSlot;
use super::error::CoordinatorError;
use super::messages::{CoordRequest, CoordinatorMetrics};
use crate::action::Action;
use crate::events::ActionBus;
use crate::request::RequestBuilder;

/// Interval between metrics polls in [`CoordinatorHandle::settle`]
const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Handle for dispatching actions into a running Coordinator
///
/// Cheap to clone. Every clone observes the same fault state.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordRequest>,
    bus: ActionBus,
    builder: RequestBuilder,
    fault: FaultSlot,
}

impl CoordinatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<CoordRequest>, bus: ActionBus, builder: RequestBuilder, fault: FaultSlot) -> Self {
        debug!("CoordinatorHandle::new: called");
        Self {
            tx,
            bus,
            builder,
            fault,
        }
    }

    /// Validate and publish an action
    ///
    /// Request descriptors are built up front so malformed ones are rejected
    /// here instead of inside the coordinator. Fails once the coordinator has
    /// faulted or stopped.
    pub fn dispatch(&self, action: Action) -> Result<(), CoordinatorError> {
        debug!(action_type = %action.action_type, is_request = action.is_request(), "CoordinatorHandle::dispatch: called");
        if let Some(fault) = self.fault.get() {
            debug!(%fault, "CoordinatorHandle::dispatch: coordinator is down");
            return Err(fault.clone());
        }
        if let Some(request) = &action.request {
            self.builder.build(&request.spec)?;
        }
        self.bus.publish(action);
        Ok(())
    }

    /// Subscribe to the coordinator's bus
    ///
    /// A broadcast receiver: it skips the oldest actions if it falls behind.
    /// Use `bus().tap(..)` to receive every action.
    pub fn subscribe(&self) -> broadcast::Receiver<Action> {
        debug!("CoordinatorHandle::subscribe: called");
        self.bus.subscribe()
    }

    pub fn bus(&self) -> &ActionBus {
        &self.bus
    }

    /// The fault that stopped the coordinator, if any
    pub fn fault(&self) -> Option<&CoordinatorError> {
        self.fault.get()
    }

    /// Get current metrics
    pub async fn metrics(&self) -> Result<CoordinatorMetrics, CoordinatorError> {
        debug!("CoordinatorHandle::metrics: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CoordRequest::GetMetrics { reply_tx })
            .await
            .map_err(|_| self.closed())?;

        reply_rx.await.map_err(|_| self.closed())
    }

    /// Wait until `dispatched` request actions, and every follow-up they
    /// chained, have been routed and nothing is queued, debouncing or in flight
    pub async fn settle(&self, dispatched: u64) -> Result<CoordinatorMetrics, CoordinatorError> {
        debug!(dispatched, "CoordinatorHandle::settle: called");
        loop {
            let metrics = self.metrics().await?;
            if metrics.is_settled(dispatched) {
                debug!(?metrics, "CoordinatorHandle::settle: settled");
                return Ok(metrics);
            }
            tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
        }
    }

    /// Wait until `dispatched` request actions have all launched (or been
    /// discarded by debounce), without waiting for their calls to finish
    ///
    /// A cancellation action published after this returns reaches every call
    /// launched so far.
    pub async fn wait_launched(&self, dispatched: u64) -> Result<CoordinatorMetrics, CoordinatorError> {
        debug!(dispatched, "CoordinatorHandle::wait_launched: called");
        loop {
            let metrics = self.metrics().await?;
            if metrics.has_launched(dispatched) {
                return Ok(metrics);
            }
            tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
        }
    }

    /// Request shutdown of the Coordinator
    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        debug!("CoordinatorHandle::shutdown: called");
        self.tx
            .send(CoordRequest::Shutdown)
            .await
            .map_err(|_| self.closed())
    }

    fn closed(&self) -> CoordinatorError {
        self.fault.get().cloned().unwrap_or(CoordinatorError::ChannelClosed)
    }
}

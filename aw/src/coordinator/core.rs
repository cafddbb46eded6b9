//! Main Coordinator task implementation

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use eyre::eyre;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::config::CoordinatorConfig;
use super::error::CoordinatorError;
use super::group::{GroupContext, GroupWorker};
use super::handle::CoordinatorHandle;
use super::messages::{CoordRequest, CoordinatorMetrics, GroupReport};
use super::router::{self, Routed};
use crate::action::Action;
use crate::events::{ActionBus, ActionFilter};
use crate::transport::Transport;

/// Shared fault slot: set once when the coordinator faults or stops
pub(crate) type FaultSlot = Arc<OnceLock<CoordinatorError>>;

/// The Coordinator turns request actions on the bus into transport calls
/// and publishes their outcomes back onto the bus
pub struct Coordinator {
    ctx: Arc<GroupContext>,
    /// Lossless feed of every request action published on the bus
    intake: mpsc::UnboundedReceiver<Action>,
    tx: mpsc::Sender<CoordRequest>,
    rx: mpsc::Receiver<CoordRequest>,
    report_rx: mpsc::UnboundedReceiver<Vec<GroupReport>>,
    fault: FaultSlot,
}

impl Coordinator {
    /// Create a Coordinator attached to an existing bus
    ///
    /// Taps the bus immediately: every request action published after this
    /// call is handled once [`run`](Self::run) starts, however large the burst.
    pub fn new(config: CoordinatorConfig, transport: Arc<dyn Transport>, bus: ActionBus) -> Self {
        debug!(?config, "Coordinator::new: called");
        let (tx, rx) = mpsc::channel(config.channel_buffer.max(1));
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let intake = bus.tap(ActionFilter::Requests);
        let builder = config.request_builder();

        Self {
            ctx: Arc::new(GroupContext {
                config,
                builder,
                transport,
                bus,
                reports: report_tx,
            }),
            intake,
            tx,
            rx,
            report_rx,
            fault: Arc::new(OnceLock::new()),
        }
    }

    /// Create a Coordinator with its own bus sized from the configuration
    pub fn with_transport(config: CoordinatorConfig, transport: Arc<dyn Transport>) -> Self {
        let bus = ActionBus::new(config.bus_capacity);
        Self::new(config, transport, bus)
    }

    pub fn bus(&self) -> &ActionBus {
        &self.ctx.bus
    }

    /// Create a handle for dispatching and control
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle::new(
            self.tx.clone(),
            self.ctx.bus.clone(),
            self.ctx.builder.clone(),
            Arc::clone(&self.fault),
        )
    }

    /// Run the Coordinator task
    ///
    /// Consumes the Coordinator and runs until shutdown is requested or a
    /// callback faults. A fault is returned here and from every later dispatch.
    pub async fn run(mut self) -> Result<(), CoordinatorError> {
        let mut groups: HashMap<String, mpsc::UnboundedSender<Routed>> = HashMap::new();
        let mut workers = JoinSet::new();
        let mut metrics = CoordinatorMetrics::default();

        info!("Coordinator started");

        let result = loop {
            tokio::select! {
                biased;

                Some(batch) = self.report_rx.recv() => {
                    let fault = batch.into_iter().find_map(|report| {
                        metrics.apply(&report);
                        match report {
                            GroupReport::Faulted(error) => Some(error),
                            _ => None,
                        }
                    });
                    if let Some(error) = fault {
                        error!(%error, "Coordinator faulted");
                        break Err(error);
                    }
                }

                req = self.rx.recv() => match req {
                    Some(CoordRequest::GetMetrics { reply_tx }) => {
                        let _ = reply_tx.send(metrics.clone());
                    }
                    Some(CoordRequest::Shutdown) | None => {
                        info!("Coordinator shutting down");
                        break Ok(());
                    }
                },

                incoming = self.intake.recv() => {
                    let Some(action) = incoming else {
                        info!("Coordinator: bus closed");
                        break Ok(());
                    };
                    let Some((key, routed)) = router::route(action) else {
                        continue;
                    };
                    let queue = groups.entry(key.clone()).or_insert_with(|| {
                        debug!(%key, "Coordinator: creating group");
                        let (group_tx, group_rx) = mpsc::unbounded_channel();
                        let worker = GroupWorker::new(key.clone(), Arc::clone(&self.ctx), group_rx);
                        workers.spawn(worker.run());
                        metrics.groups += 1;
                        group_tx
                    });
                    if queue.send(routed).is_ok() {
                        metrics.routed += 1;
                        metrics.queued += 1;
                    } else {
                        warn!(%key, "Coordinator: group queue closed, dropping action");
                    }
                }
            }
        };

        let _ = self.fault.set(match &result {
            Ok(()) => CoordinatorError::Stopped,
            Err(error) => error.clone(),
        });

        drop(groups);
        workers.shutdown().await;
        info!(?metrics, "Coordinator stopped");
        result
    }
}

/// Spawn a Coordinator on the current runtime, returning its handle
pub fn spawn_coordinator(
    config: CoordinatorConfig,
    transport: Arc<dyn Transport>,
    bus: ActionBus,
) -> (CoordinatorHandle, tokio::task::JoinHandle<Result<(), CoordinatorError>>) {
    let coordinator = Coordinator::new(config, transport, bus);
    let handle = coordinator.handle();
    (handle, tokio::spawn(coordinator.run()))
}

/// Convert a coordinator task result into an application error
pub fn join_result(
    joined: Result<Result<(), CoordinatorError>, tokio::task::JoinError>,
) -> eyre::Result<()> {
    joined
        .map_err(|e| eyre!("Coordinator task panicked: {}", e))?
        .map_err(eyre::Report::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::RequestDescriptor;
    use crate::transport::MockTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_coordinator_shutdown() {
        let coordinator = Coordinator::with_transport(CoordinatorConfig::default(), Arc::new(MockTransport::new()));
        let handle = coordinator.handle();
        let task = tokio::spawn(coordinator.run());

        handle.shutdown().await.unwrap();
        assert!(task.await.unwrap().is_ok());

        let err = handle.dispatch(Action::new("AFTER")).unwrap_err();
        assert_eq!(err, CoordinatorError::Stopped);
    }

    #[tokio::test]
    async fn test_plain_actions_create_no_groups() {
        let bus = ActionBus::new(64);
        let (handle, _task) = spawn_coordinator(CoordinatorConfig::default(), Arc::new(MockTransport::new()), bus);

        handle.dispatch(Action::new("PLAIN")).unwrap();
        let metrics = handle.metrics().await.unwrap();
        assert_eq!(metrics.groups, 0);
        assert_eq!(metrics.routed, 0);
    }

    #[tokio::test]
    async fn test_groups_created_per_key() {
        let transport = Arc::new(MockTransport::new());
        transport.on("GET", "/a").reply(200, json!(1));
        transport.on("GET", "/b").reply(200, json!(2));
        transport.on("GET", "/a").reply(200, json!(3));

        let (handle, _task) = spawn_coordinator(CoordinatorConfig::default(), transport, ActionBus::new(64));
        handle.dispatch(Action::request("A_REQUEST", RequestDescriptor::get("/a"))).unwrap();
        handle.dispatch(Action::request("B_REQUEST", RequestDescriptor::get("/b"))).unwrap();
        handle.dispatch(Action::request("A_REQUEST", RequestDescriptor::get("/a"))).unwrap();

        let metrics = handle.settle(3).await.unwrap();
        assert_eq!(metrics.groups, 2);
        assert_eq!(metrics.routed, 3);
        assert_eq!(metrics.succeeded, 3);
    }

    #[tokio::test]
    async fn test_join_result_maps_fault() {
        let joined: Result<Result<(), CoordinatorError>, tokio::task::JoinError> = Ok(Err(CoordinatorError::Stopped));
        let err = join_result(joined).unwrap_err();
        assert!(err.to_string().contains("Coordinator stopped"));
    }
}

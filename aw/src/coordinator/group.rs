//! Per-group scheduler
//!
//! One task per correlation key. Actions arrive in order on an unbounded queue
//! and are split by resolve policy into two independent sub-pipelines, each
//! with its own debounce slot:
//!
//! - latest-wins: a single live call; launching a newer one drops the older
//!   future, which aborts its request and suppresses its outcome
//! - merge: every call runs to completion; outcomes are published in
//!   completion order
//!
//! All state is owned by the task; nothing here is shared or locked.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error};

use super::call::{Call, CallOutcome, Finished, InFlight};
use super::chain;
use super::config::CoordinatorConfig;
use super::error::CoordinatorError;
use super::messages::{GroupReport, Settlement};
use super::outcome;
use super::router::Routed;
use crate::action::ResolvePolicy;
use crate::events::ActionBus;
use crate::request::RequestBuilder;
use crate::transport::Transport;

/// Read-only environment shared by every group of one coordinator
pub(crate) struct GroupContext {
    pub config: CoordinatorConfig,
    pub builder: RequestBuilder,
    pub transport: Arc<dyn Transport>,
    pub bus: ActionBus,
    pub reports: mpsc::UnboundedSender<Vec<GroupReport>>,
}

impl GroupContext {
    /// Send a batch of reports; a batch is applied atomically by the coordinator
    pub fn send(&self, reports: Vec<GroupReport>) {
        if !reports.is_empty() {
            let _ = self.reports.send(reports);
        }
    }
}

struct Pending {
    routed: Routed,
    deadline: Instant,
}

/// Debounce slot holding at most one waiting action
#[derive(Default)]
struct Debounce {
    pending: Option<Pending>,
}

impl Debounce {
    /// Offer a new arrival; returns it when it should launch right away
    ///
    /// Any action still waiting is discarded.
    fn offer(&mut self, routed: Routed, delay: Option<Duration>, reports: &mut Vec<GroupReport>) -> Option<Routed> {
        let replaced = self.pending.take();
        if let Some(old) = &replaced {
            debug!(action_type = %old.routed.origin.action_type, "Debounce::offer: discarding pending action");
            reports.push(GroupReport::Discarded);
        }

        match delay {
            Some(delay) => {
                if replaced.is_none() {
                    reports.push(GroupReport::DebounceArmed);
                }
                self.pending = Some(Pending {
                    routed,
                    deadline: Instant::now() + delay,
                });
                None
            }
            None => {
                if replaced.is_some() {
                    reports.push(GroupReport::DebounceCleared);
                }
                Some(routed)
            }
        }
    }

    /// Resolves with the pending action once its window elapses
    ///
    /// Cancel-safe: the action is only taken after the sleep completes.
    async fn settled(&mut self) -> Routed {
        loop {
            let Some(deadline) = self.pending.as_ref().map(|pending| pending.deadline) else {
                return std::future::pending().await;
            };
            sleep_until(deadline).await;
            if let Some(pending) = self.pending.take() {
                return pending.routed;
            }
        }
    }
}

async fn next_live(live: &mut Option<InFlight>) -> Finished {
    match live {
        Some(call) => call.await,
        None => std::future::pending().await,
    }
}

/// Scheduler task for one correlation key
pub(crate) struct GroupWorker {
    key: String,
    ctx: Arc<GroupContext>,
    rx: mpsc::UnboundedReceiver<Routed>,
}

impl GroupWorker {
    pub fn new(key: String, ctx: Arc<GroupContext>, rx: mpsc::UnboundedReceiver<Routed>) -> Self {
        debug!(%key, "GroupWorker::new: called");
        Self { key, ctx, rx }
    }

    /// Run until the queue closes or a callback faults
    pub async fn run(self) {
        let key = self.key.clone();
        let ctx = Arc::clone(&self.ctx);
        if let Err(error) = self.process().await {
            error!(%key, %error, "Group faulted");
            ctx.send(vec![GroupReport::Faulted(error)]);
        }
    }

    async fn process(self) -> Result<(), CoordinatorError> {
        let GroupWorker { key, ctx, mut rx } = self;
        let mut latest = Debounce::default();
        let mut merge = Debounce::default();
        let mut live: Option<InFlight> = None;
        let mut merged: FuturesUnordered<InFlight> = FuturesUnordered::new();

        debug!(%key, "GroupWorker: started");

        loop {
            let mut reports = Vec::new();

            tokio::select! {
                biased;

                incoming = rx.recv() => {
                    let Some(routed) = incoming else {
                        debug!(%key, "GroupWorker: queue closed");
                        return Ok(());
                    };
                    reports.push(GroupReport::Accepted);
                    let policy = routed.policy();
                    let delay = routed.descriptor.options().debounce();
                    debug!(%key, action_type = %routed.origin.action_type, ?policy, ?delay, "GroupWorker: accepted");

                    let slot = match policy {
                        ResolvePolicy::Latest => &mut latest,
                        ResolvePolicy::All => &mut merge,
                    };
                    if let Some(ready) = slot.offer(routed, delay, &mut reports) {
                        match policy {
                            ResolvePolicy::Latest => launch_latest(&ctx, ready, &mut live, &mut reports),
                            ResolvePolicy::All => merged.extend(launch(&ctx, ready, &mut reports)),
                        }
                    }
                }

                ready = latest.settled() => {
                    reports.push(GroupReport::DebounceCleared);
                    launch_latest(&ctx, ready, &mut live, &mut reports);
                }

                ready = merge.settled() => {
                    reports.push(GroupReport::DebounceCleared);
                    merged.extend(launch(&ctx, ready, &mut reports));
                }

                finished = next_live(&mut live) => {
                    live = None;
                    settle(&ctx, finished, &mut reports)?;
                }

                Some(finished) = merged.next(), if !merged.is_empty() => {
                    settle(&ctx, finished, &mut reports)?;
                }
            }

            ctx.send(reports);
        }
    }
}

/// Build and start a call; an action that fails to build is dropped
fn launch(ctx: &Arc<GroupContext>, routed: Routed, reports: &mut Vec<GroupReport>) -> Option<InFlight> {
    let action_type = routed.origin.action_type.clone();
    match Call::prepare(ctx, routed) {
        Ok(call) => Some(call.launch(ctx, reports)),
        Err(error) => {
            error!(%action_type, %error, "GroupWorker: dropping unbuildable request");
            reports.push(GroupReport::Discarded);
            None
        }
    }
}

fn launch_latest(ctx: &Arc<GroupContext>, routed: Routed, live: &mut Option<InFlight>, reports: &mut Vec<GroupReport>) {
    if let Some(call) = launch(ctx, routed, reports)
        && live.replace(call).is_some()
    {
        debug!("GroupWorker: superseded in-flight call");
        reports.push(GroupReport::Settled(Settlement::Superseded));
    }
}

/// Publish the outcome of a finished call, then run its callbacks and chain
fn settle(ctx: &GroupContext, finished: Finished, reports: &mut Vec<GroupReport>) -> Result<(), CoordinatorError> {
    let Finished { call, outcome } = finished;
    let result = match outcome {
        CallOutcome::Cancelled => {
            debug!(call_id = %call.id, action_type = %call.origin.action_type, "GroupWorker: call cancelled");
            reports.push(GroupReport::Settled(Settlement::Cancelled));
            return Ok(());
        }
        CallOutcome::Completed(result) => result,
    };

    let outcome = outcome::synthesize(&ctx.config, &call.origin, &call.descriptor, result)?;
    let settlement = outcome.settlement;
    ctx.bus.publish(outcome.action.clone());
    outcome::notify(&call.origin, &call.descriptor, &outcome)?;

    if outcome.succeeded()
        && let Some(next) = chain::continuation(
            &ctx.builder,
            &call.origin.action_type,
            &call.descriptor,
            outcome.payload(),
        )?
    {
        debug!(call_id = %call.id, next = %next.action_type, "GroupWorker: injecting chained action");
        if next.is_request() {
            reports.push(GroupReport::Injected);
            // Counted before it can be routed
            ctx.send(std::mem::take(reports));
        }
        ctx.bus.publish(next);
    }

    reports.push(GroupReport::Settled(settlement));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, RequestDescriptor};
    use crate::coordinator::router;

    fn routed(action_type: &str) -> Routed {
        router::route(Action::request(action_type, RequestDescriptor::get("/x")))
            .unwrap()
            .1
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_replaces_pending() {
        let mut slot = Debounce::default();
        let mut reports = Vec::new();

        assert!(slot.offer(routed("A"), Some(Duration::from_millis(10)), &mut reports).is_none());
        assert!(slot.offer(routed("B"), Some(Duration::from_millis(10)), &mut reports).is_none());
        assert!(matches!(
            reports.as_slice(),
            [GroupReport::DebounceArmed, GroupReport::Discarded]
        ));

        let ready = slot.settled().await;
        assert_eq!(ready.origin.action_type, "B");
        assert!(slot.pending.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_release_discards_pending() {
        let mut slot = Debounce::default();
        let mut reports = Vec::new();

        slot.offer(routed("A"), Some(Duration::from_millis(10)), &mut reports);
        let ready = slot.offer(routed("B"), None, &mut reports).unwrap();

        assert_eq!(ready.origin.action_type, "B");
        assert!(slot.pending.is_none());
        assert!(matches!(
            reports.as_slice(),
            [GroupReport::DebounceArmed, GroupReport::Discarded, GroupReport::DebounceCleared]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_waits_for_deadline() {
        let mut slot = Debounce::default();
        let started = Instant::now();
        slot.offer(routed("A"), Some(Duration::from_millis(25)), &mut Vec::new());

        slot.settled().await;
        assert!(started.elapsed() >= Duration::from_millis(25));
    }
}

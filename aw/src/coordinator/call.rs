//! In-flight calls: retries, timeouts and cancellation for one launched request

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};
use uuid::Uuid;

use super::cancel::CancelWatcher;
use super::group::GroupContext;
use super::messages::GroupReport;
use super::router::Routed;
use crate::action::{Action, RequestDescriptor};
use crate::request::{BuildError, Request};
use crate::transport::{self, Response, TransportError};

/// A launched call; dropping it aborts the transport request
pub(crate) type InFlight = BoxFuture<'static, Finished>;

/// A normalized request owned by the group that launched it
pub(crate) struct Call {
    pub id: Uuid,
    pub origin: Action,
    pub descriptor: RequestDescriptor,
    pub request: Request,
    retries: u32,
}

pub(crate) enum CallOutcome {
    Completed(Result<Response, TransportError>),
    Cancelled,
}

pub(crate) struct Finished {
    pub call: Call,
    pub outcome: CallOutcome,
}

impl Call {
    pub fn prepare(ctx: &GroupContext, routed: Routed) -> Result<Self, BuildError> {
        let Routed { origin, descriptor } = routed;
        let request = ctx.builder.build(&descriptor.spec)?;
        let retries = descriptor
            .options()
            .retry_count
            .unwrap_or_else(|| ctx.config.retries_for(&request.method));

        Ok(Self {
            id: Uuid::now_v7(),
            origin,
            descriptor,
            request,
            retries,
        })
    }

    /// Start the call
    ///
    /// The cancellation watcher taps the bus here, before the returned future is
    /// first polled.
    pub fn launch(self, ctx: &Arc<GroupContext>, reports: &mut Vec<GroupReport>) -> InFlight {
        debug!(
            call_id = %self.id,
            action_type = %self.origin.action_type,
            method = %self.request.method,
            url = %self.request.url,
            retries = self.retries,
            "Call::launch: called"
        );
        let watcher = self
            .descriptor
            .options()
            .cancel_on_type
            .as_deref()
            .map(|action_type| CancelWatcher::new(action_type, &ctx.bus));
        let ctx = Arc::clone(ctx);
        reports.push(GroupReport::Launched);

        async move {
            let outcome = match watcher {
                Some(watcher) => tokio::select! {
                    biased;
                    _ = watcher.triggered() => CallOutcome::Cancelled,
                    result = self.perform(&ctx) => CallOutcome::Completed(result),
                },
                None => CallOutcome::Completed(self.perform(&ctx).await),
            };
            Finished { call: self, outcome }
        }
        .boxed()
    }

    async fn perform(&self, ctx: &GroupContext) -> Result<Response, TransportError> {
        let mut attempt = 0;
        loop {
            match transport::attempt(ctx.transport.as_ref(), &self.request).await {
                Ok(response) => {
                    debug!(call_id = %self.id, attempt, status = response.status, "Call::perform: succeeded");
                    return Ok(response);
                }
                Err(error) if attempt < self.retries => {
                    attempt += 1;
                    warn!(call_id = %self.id, attempt, retries = self.retries, %error, "Call::perform: retrying");
                    ctx.send(vec![GroupReport::Retried]);
                }
                Err(error) => {
                    debug!(call_id = %self.id, attempt, %error, "Call::perform: failed");
                    return Err(error);
                }
            }
        }
    }
}

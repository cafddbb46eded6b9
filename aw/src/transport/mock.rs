//! Scripted in-memory transport for tests and offline runs
//!
//! Routes are matched on method and the full normalized URL (query included).
//! Each route holds a queue of replies consumed in order; a route with no
//! replies left, or an unknown route, fails with a network error.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{Response, Transport, TransportError};
use crate::request::Request;

#[derive(Debug, Clone)]
enum Reply {
    Respond(Response),
    Fail(TransportError),
    Hang,
}

#[derive(Debug)]
struct Route {
    method: String,
    url: String,
    replies: VecDeque<(Duration, Reply)>,
}

/// Scripted transport returning canned replies
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<Request>>,
    call_count: AtomicUsize,
}

/// Builder for one scripted reply
pub struct MockReply<'a> {
    transport: &'a MockTransport,
    method: String,
    url: String,
    delay: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        debug!("MockTransport::new: called");
        Self::default()
    }

    /// Script the next reply for `method url`
    pub fn on(&self, method: &str, url: &str) -> MockReply<'_> {
        MockReply {
            transport: self,
            method: method.to_uppercase(),
            url: url.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Total number of executed requests
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Number of executed requests for `method url`
    pub fn calls_to(&self, method: &str, url: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.method.eq_ignore_ascii_case(method) && call.url == url)
            .count()
    }

    /// Every executed request, in call order
    pub fn calls(&self) -> Vec<Request> {
        lock(&self.calls).clone()
    }

    fn push(&self, method: String, url: String, delay: Duration, reply: Reply) {
        debug!(%method, %url, ?delay, "MockTransport::push: scripting reply");
        let mut routes = lock(&self.routes);
        match routes.iter_mut().find(|route| route.method == method && route.url == url) {
            Some(route) => route.replies.push_back((delay, reply)),
            None => routes.push(Route {
                method,
                url,
                replies: VecDeque::from([(delay, reply)]),
            }),
        }
    }

    fn next_reply(&self, request: &Request) -> Option<(Duration, Reply)> {
        lock(&self.routes)
            .iter_mut()
            .find(|route| route.method == request.method && route.url == request.url)
            .and_then(|route| route.replies.pop_front())
    }
}

impl MockReply<'_> {
    /// Wait this long before replying
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn reply(self, status: u16, body: Value) {
        self.transport
            .push(self.method, self.url, self.delay, Reply::Respond(Response::new(status, body)));
    }

    pub fn fail(self, error: TransportError) {
        self.transport.push(self.method, self.url, self.delay, Reply::Fail(error));
    }

    /// Never reply; only a timeout or cancellation ends the call
    pub fn hang(self) {
        self.transport.push(self.method, self.url, self.delay, Reply::Hang);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        debug!(%idx, method = %request.method, url = %request.url, "MockTransport::execute: called");
        lock(&self.calls).push(request.clone());

        let Some((delay, reply)) = self.next_reply(request) else {
            debug!("MockTransport::execute: no scripted reply");
            return Err(TransportError::Network(format!(
                "No mock reply for {} {}",
                request.method, request.url
            )));
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(error) => Err(error),
            Reply::Hang => std::future::pending().await,
        }
    }
}

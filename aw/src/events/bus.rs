//! Action Bus - central pub/sub channel for actions
//!
//! The ActionBus has two kinds of consumers. Observers `subscribe` to a tokio
//! broadcast channel: cheap, bounded, and lossy under bursts (a lagging
//! receiver skips the oldest actions). Consumers that must see every matching
//! action (the coordinator's router, cancellation watchers, the action log)
//! take a `tap` instead: an unbounded mpsc queue fed under the same lock as the
//! broadcast, so taps and subscribers observe one publish order.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::action::Action;

/// Default channel capacity (actions)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// Which actions a tap receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionFilter {
    All,
    /// Actions carrying a request descriptor
    Requests,
    /// Actions of exactly this type
    Type(String),
}

impl ActionFilter {
    pub fn matches(&self, action: &Action) -> bool {
        match self {
            ActionFilter::All => true,
            ActionFilter::Requests => action.is_request(),
            ActionFilter::Type(action_type) => action.action_type == *action_type,
        }
    }
}

struct Tap {
    filter: ActionFilter,
    tx: mpsc::UnboundedSender<Action>,
}

/// Broadcast bus carrying every action of an application
///
/// Cheap to clone; all clones publish into the same channel and taps. Taps
/// close once every clone is dropped.
#[derive(Clone)]
pub struct ActionBus {
    tx: broadcast::Sender<Action>,
    taps: Arc<Mutex<Vec<Tap>>>,
    channel_capacity: usize,
}

fn lock(taps: &Mutex<Vec<Tap>>) -> MutexGuard<'_, Vec<Tap>> {
    taps.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ActionBus {
    /// Create a new action bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "ActionBus::new: creating action bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            taps: Arc::new(Mutex::new(Vec::new())),
            channel_capacity: capacity.max(1),
        }
    }

    /// Create a new action bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Publish an action to all taps and subscribers
    ///
    /// Taps always receive their matching actions. Broadcast subscribers that
    /// fall more than `capacity` actions behind miss the oldest ones.
    pub fn publish(&self, action: Action) {
        debug!(action_type = %action.action_type, is_request = action.is_request(), "ActionBus::publish");
        let mut taps = lock(&self.taps);
        taps.retain(|tap| !tap.tx.is_closed());
        for tap in taps.iter().filter(|tap| tap.filter.matches(&action)) {
            let _ = tap.tx.send(action.clone());
        }
        let _ = self.tx.send(action);
    }

    /// Subscribe to actions published from now on (lossy under bursts)
    pub fn subscribe(&self) -> broadcast::Receiver<Action> {
        debug!("ActionBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Receive every matching action published from now on, without loss
    ///
    /// The queue is unbounded; drop the receiver to detach.
    pub fn tap(&self, filter: ActionFilter) -> mpsc::UnboundedReceiver<Action> {
        debug!(?filter, "ActionBus::tap: new tap");
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.taps).push(Tap { filter, tx });
        rx
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the number of attached taps
    pub fn tap_count(&self) -> usize {
        lock(&self.taps).iter().filter(|tap| !tap.tx.is_closed()).count()
    }

    pub fn capacity(&self) -> usize {
        self.channel_capacity
    }
}

impl Default for ActionBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::RequestDescriptor;
    use serde_json::json;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_action_bus_creation() {
        let bus = ActionBus::new(100);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 100);
    }

    #[test]
    fn test_action_bus_subscribe() {
        let bus = ActionBus::new(100);
        let _rx1 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        let _rx2 = bus.clone().subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_publish_receive_in_order() {
        let bus = ActionBus::new(100);
        let mut rx = bus.subscribe();

        bus.publish(Action::new("FIRST"));
        bus.publish(Action::new("SECOND").with_payload(json!(2)));

        assert_eq!(rx.recv().await.unwrap().action_type, "FIRST");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.action_type, "SECOND");
        assert_eq!(second.payload, Some(json!(2)));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = ActionBus::new(10);
        // This should not panic even with no subscribers
        bus.publish(Action::new("NOBODY_LISTENING"));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = ActionBus::new(100);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(Action::new("SHARED"));

        assert_eq!(rx1.recv().await.unwrap().action_type, "SHARED");
        assert_eq!(rx2.recv().await.unwrap().action_type, "SHARED");
    }

    #[test]
    fn test_filter_matches() {
        let plain = Action::new("FOO_CANCEL");
        let request = Action::request("FOO_REQUEST", RequestDescriptor::get("/api/foos"));

        assert!(ActionFilter::All.matches(&plain));
        assert!(ActionFilter::Requests.matches(&request));
        assert!(!ActionFilter::Requests.matches(&plain));
        assert!(ActionFilter::Type("FOO_CANCEL".to_string()).matches(&plain));
        assert!(!ActionFilter::Type("FOO_CANCEL".to_string()).matches(&request));
    }

    #[test]
    fn test_tap_is_lossless_beyond_capacity() {
        let bus = ActionBus::new(4);
        let mut lossy = bus.subscribe();
        let mut requests = bus.tap(ActionFilter::Requests);

        for i in 0..20 {
            bus.publish(Action::new(format!("NOISE_{}", i)));
            bus.publish(Action::request(format!("A{}_REQUEST", i), RequestDescriptor::get("/a")));
        }

        let mut received = Vec::new();
        while let Ok(action) = requests.try_recv() {
            received.push(action.action_type);
        }
        let expected: Vec<_> = (0..20).map(|i| format!("A{}_REQUEST", i)).collect();
        assert_eq!(received, expected);

        assert!(matches!(lossy.try_recv(), Err(TryRecvError::Lagged(_))));
    }

    #[test]
    fn test_dropped_tap_is_pruned() {
        let bus = ActionBus::new(4);
        let tap = bus.tap(ActionFilter::All);
        assert_eq!(bus.tap_count(), 1);

        drop(tap);
        bus.publish(Action::new("AFTER_DROP"));
        assert_eq!(bus.tap_count(), 0);
    }

    #[tokio::test]
    async fn test_tap_closes_with_last_bus_clone() {
        let bus = ActionBus::new(4);
        let mut tap = bus.tap(ActionFilter::All);
        let clone = bus.clone();

        bus.publish(Action::new("ONE"));
        drop(bus);
        clone.publish(Action::new("TWO"));
        drop(clone);

        assert_eq!(tap.recv().await.unwrap().action_type, "ONE");
        assert_eq!(tap.recv().await.unwrap().action_type, "TWO");
        assert!(tap.recv().await.is_none());
    }
}

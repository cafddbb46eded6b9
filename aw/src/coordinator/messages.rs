//! Message types for the Coordinator

use tokio::sync::oneshot;

use super::error::CoordinatorError;

/// Control requests to the Coordinator task
#[derive(Debug)]
pub enum CoordRequest {
    /// Get current metrics
    GetMetrics {
        reply_tx: oneshot::Sender<CoordinatorMetrics>,
    },

    /// Shutdown the coordinator
    Shutdown,
}

/// How an in-flight call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settlement {
    Succeeded,
    Failed,
    Cancelled,
    Superseded,
}

/// Progress reports sent from group tasks back to the Coordinator
#[derive(Debug)]
pub(crate) enum GroupReport {
    /// An action was taken off the group queue
    Accepted,
    /// An action started waiting in a debounce window
    DebounceArmed,
    /// A debounce window was emptied (released or discarded)
    DebounceCleared,
    /// A debounced action was replaced before it launched
    Discarded,
    Launched,
    Retried,
    Settled(Settlement),
    /// A chained follow-up is about to be published
    Injected,
    Faulted(CoordinatorError),
}

/// Coordinator metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorMetrics {
    pub groups: usize,
    /// Request actions handed to a group
    pub routed: u64,
    /// Chained follow-ups published by the coordinator
    pub injected: u64,
    pub launched: u64,
    pub in_flight: u64,
    pub debouncing: u64,
    /// Routed actions not yet picked up by their group
    pub queued: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub retried: u64,
    pub cancelled: u64,
    pub superseded: u64,
    pub discarded: u64,
}

impl CoordinatorMetrics {
    /// No queued, debouncing or in-flight work
    pub fn is_idle(&self) -> bool {
        self.queued == 0 && self.debouncing == 0 && self.in_flight == 0
    }

    /// Idle, and every externally dispatched request (plus every chained one)
    /// has been routed
    pub fn is_settled(&self, dispatched: u64) -> bool {
        self.is_idle() && self.routed >= dispatched + self.injected
    }

    /// Every dispatched request has been routed and has left its queue and
    /// debounce window: it is in flight, settled, or discarded
    pub fn has_launched(&self, dispatched: u64) -> bool {
        self.routed >= dispatched && self.queued == 0 && self.debouncing == 0
    }

    pub(crate) fn apply(&mut self, report: &GroupReport) {
        match report {
            GroupReport::Accepted => self.queued = self.queued.saturating_sub(1),
            GroupReport::DebounceArmed => self.debouncing += 1,
            GroupReport::DebounceCleared => self.debouncing = self.debouncing.saturating_sub(1),
            GroupReport::Discarded => self.discarded += 1,
            GroupReport::Launched => {
                self.launched += 1;
                self.in_flight += 1;
            }
            GroupReport::Retried => self.retried += 1,
            GroupReport::Settled(settlement) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match settlement {
                    Settlement::Succeeded => self.succeeded += 1,
                    Settlement::Failed => self.failed += 1,
                    Settlement::Cancelled => self.cancelled += 1,
                    Settlement::Superseded => self.superseded += 1,
                }
            }
            GroupReport::Injected => self.injected += 1,
            GroupReport::Faulted(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        let mut metrics = CoordinatorMetrics {
            routed: 1,
            queued: 1,
            ..Default::default()
        };
        assert!(!metrics.is_idle());

        metrics.apply(&GroupReport::Accepted);
        metrics.apply(&GroupReport::DebounceArmed);
        assert!(!metrics.is_idle());

        metrics.apply(&GroupReport::DebounceCleared);
        metrics.apply(&GroupReport::Launched);
        assert_eq!(metrics.in_flight, 1);

        metrics.apply(&GroupReport::Retried);
        metrics.apply(&GroupReport::Settled(Settlement::Succeeded));
        assert!(metrics.is_idle());
        assert!(metrics.is_settled(1));
        assert_eq!(metrics.launched, 1);
        assert_eq!(metrics.retried, 1);
        assert_eq!(metrics.succeeded, 1);
    }

    #[test]
    fn test_injected_delays_settling() {
        let mut metrics = CoordinatorMetrics {
            routed: 1,
            ..Default::default()
        };
        metrics.apply(&GroupReport::Injected);
        assert!(metrics.is_idle());
        assert!(!metrics.is_settled(1));
    }

    #[test]
    fn test_has_launched_ignores_in_flight() {
        let mut metrics = CoordinatorMetrics {
            routed: 1,
            queued: 1,
            ..Default::default()
        };
        assert!(!metrics.has_launched(1));

        metrics.apply(&GroupReport::Accepted);
        metrics.apply(&GroupReport::DebounceArmed);
        assert!(!metrics.has_launched(1));

        metrics.apply(&GroupReport::DebounceCleared);
        metrics.apply(&GroupReport::Launched);
        assert!(metrics.has_launched(1));
        assert!(!metrics.has_launched(2));
        assert!(!metrics.is_idle());
    }
}

//! Cancellation watcher

use tokio::sync::mpsc;
use tracing::debug;

use crate::action::Action;
use crate::events::{ActionBus, ActionFilter};

/// Watches the bus for one cancellation action type
///
/// Taps the bus on construction, so only actions published after the call
/// launched can cancel it, and no burst of other traffic can hide the one
/// that does.
pub(crate) struct CancelWatcher {
    action_type: String,
    rx: mpsc::UnboundedReceiver<Action>,
}

impl CancelWatcher {
    pub fn new(action_type: &str, bus: &ActionBus) -> Self {
        debug!(%action_type, "CancelWatcher::new: called");
        Self {
            action_type: action_type.to_string(),
            rx: bus.tap(ActionFilter::Type(action_type.to_string())),
        }
    }

    /// Resolves once the cancellation type is seen; pends forever otherwise
    pub async fn triggered(mut self) {
        match self.rx.recv().await {
            Some(_) => debug!(action_type = %self.action_type, "CancelWatcher: triggered"),
            None => {
                debug!("CancelWatcher: bus closed");
                std::future::pending::<()>().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_triggers_on_matching_type() {
        let bus = ActionBus::new(16);
        let watcher = CancelWatcher::new("FOO_CANCEL", &bus);

        bus.publish(Action::new("UNRELATED"));
        bus.publish(Action::new("FOO_CANCEL"));

        tokio::time::timeout(Duration::from_secs(1), watcher.triggered())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignores_earlier_actions() {
        let bus = ActionBus::new(16);
        bus.publish(Action::new("FOO_CANCEL"));
        let watcher = CancelWatcher::new("FOO_CANCEL", &bus);

        let result = tokio::time::timeout(Duration::from_millis(100), watcher.triggered()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_triggers_after_burst_beyond_capacity() {
        let bus = ActionBus::new(4);
        let watcher = CancelWatcher::new("FOO_CANCEL", &bus);

        for i in 0..100 {
            bus.publish(Action::new(format!("NOISE_{}", i)));
        }
        bus.publish(Action::new("FOO_CANCEL"));

        tokio::time::timeout(Duration::from_secs(1), watcher.triggered())
            .await
            .unwrap();
    }
}

//! Coordinator error types

use std::fmt;

use thiserror::Error;

use crate::request::BuildError;

/// Caller-supplied hook that can fault the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    ResponseTransform,
    OnComplete,
    OnError,
    Chain,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Hook::ResponseTransform => "responseTransform",
            Hook::OnComplete => "onComplete",
            Hook::OnError => "onError",
            Hook::Chain => "chain",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the coordinator
///
/// Build errors are returned to the dispatching caller. Every other variant is
/// a fault: it stops the coordinator and is returned from every later dispatch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    #[error("Invalid request: {0}")]
    Build(#[from] BuildError),

    #[error("{hook} callback failed for {action_type}: {message}")]
    Callback {
        hook: Hook,
        action_type: String,
        message: String,
    },

    #[error("Chained action {action_type} is invalid: {source}")]
    InvalidChain { action_type: String, source: BuildError },

    #[error("Failed to serialize request for {action_type}: {message}")]
    Serialization { action_type: String, message: String },

    #[error("Coordinator stopped")]
    Stopped,

    #[error("Coordinator channel closed")]
    ChannelClosed,
}

impl CoordinatorError {
    pub(crate) fn callback(hook: Hook, action_type: &str, error: eyre::Report) -> Self {
        CoordinatorError::Callback {
            hook,
            action_type: action_type.to_string(),
            message: format!("{:#}", error),
        }
    }

    /// Whether this error stopped the coordinator
    pub fn is_fault(&self) -> bool {
        !matches!(self, CoordinatorError::Build(_))
    }
}

//! Outcome synthesis: turns a finished call into a success or failure action

use serde_json::{Map, Value, json};
use tracing::debug;

use super::config::CoordinatorConfig;
use super::error::{CoordinatorError, Hook};
use super::messages::Settlement;
use crate::action::{Action, RequestDescriptor};
use crate::transport::{Response, TransportError};

/// A synthesized outcome action and how its call ended
#[derive(Debug)]
pub(crate) struct Outcome {
    pub action: Action,
    pub settlement: Settlement,
}

impl Outcome {
    pub fn succeeded(&self) -> bool {
        self.settlement == Settlement::Succeeded
    }

    pub fn payload(&self) -> &Value {
        self.action.payload.as_ref().unwrap_or(&Value::Null)
    }
}

/// Name the outcome of `action_type`
///
/// The configured request suffix is replaced by `suffix`. When no request
/// suffix is configured, or the type does not end with it, `_suffix` is
/// appended instead.
pub fn outcome_type(config: &CoordinatorConfig, action_type: &str, suffix: &str) -> String {
    match action_type.strip_suffix(config.request_suffix.as_str()) {
        Some(base) if !config.request_suffix.is_empty() => format!("{}{}", base, suffix),
        _ => format!("{}_{}", action_type, suffix),
    }
}

fn outcome_meta(origin: &Action, descriptor: &RequestDescriptor) -> Result<Map<String, Value>, CoordinatorError> {
    let request = serde_json::to_value(descriptor).map_err(|e| CoordinatorError::Serialization {
        action_type: origin.action_type.clone(),
        message: e.to_string(),
    })?;

    let mut meta = Map::new();
    meta.insert("request".to_string(), request);
    if let Some(args) = origin.payload.as_ref().filter(|payload| !payload.is_null()) {
        meta.insert("args".to_string(), args.clone());
    }
    Ok(meta)
}

/// Build the outcome action for a completed call
///
/// A failing response transform is a fault, not a request failure.
pub(crate) fn synthesize(
    config: &CoordinatorConfig,
    origin: &Action,
    descriptor: &RequestDescriptor,
    result: Result<Response, TransportError>,
) -> Result<Outcome, CoordinatorError> {
    let meta = outcome_meta(origin, descriptor)?;

    let outcome = match result {
        Ok(response) => {
            let payload = match &descriptor.hooks.response_transform {
                Some(transform) => transform(response.body)
                    .map_err(|e| CoordinatorError::callback(Hook::ResponseTransform, &origin.action_type, e))?,
                None => response.body,
            };
            let mut action = Action::new(outcome_type(config, &origin.action_type, &config.success_suffix));
            action.payload = Some(payload);
            action.meta = meta;
            Outcome {
                action,
                settlement: Settlement::Succeeded,
            }
        }
        Err(error) => {
            let mut action = Action::new(outcome_type(config, &origin.action_type, &config.failure_suffix));
            action.error = true;
            action.payload = Some(json!({ "status": error.status() }));
            action.meta = meta;
            Outcome {
                action,
                settlement: Settlement::Failed,
            }
        }
    };

    debug!(
        origin = %origin.action_type,
        outcome = %outcome.action.action_type,
        succeeded = outcome.succeeded(),
        "synthesize: outcome built"
    );
    Ok(outcome)
}

/// Run the completion or error callback for a published outcome
pub(crate) fn notify(origin: &Action, descriptor: &RequestDescriptor, outcome: &Outcome) -> Result<(), CoordinatorError> {
    let (hook, callback) = if outcome.succeeded() {
        (Hook::OnComplete, &descriptor.hooks.on_complete)
    } else {
        (Hook::OnError, &descriptor.hooks.on_error)
    };

    if let Some(callback) = callback {
        debug!(action_type = %origin.action_type, %hook, "notify: invoking callback");
        callback(outcome.payload()).map_err(|e| CoordinatorError::callback(hook, &origin.action_type, e))?;
    }
    Ok(())
}

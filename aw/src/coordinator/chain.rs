//! Chain continuation

use serde_json::Value;
use tracing::{debug, warn};

use super::error::{CoordinatorError, Hook};
use crate::action::{Action, RequestDescriptor};
use crate::request::RequestBuilder;

/// Build the next action of a request chain from a success payload
///
/// The first link produces the next action; the remaining links are appended
/// to that action's own chain so they run after it succeeds. Returns `None`
/// when the chain is empty.
pub(crate) fn continuation(
    builder: &RequestBuilder,
    origin_type: &str,
    descriptor: &RequestDescriptor,
    payload: &Value,
) -> Result<Option<Action>, CoordinatorError> {
    let Some((first, rest)) = descriptor.chain.split_first() else {
        return Ok(None);
    };
    debug!(%origin_type, remaining = rest.len(), "continuation: building next link");

    let mut next = first(payload).map_err(|e| CoordinatorError::callback(Hook::Chain, origin_type, e))?;

    match next.request.as_mut() {
        Some(request) => {
            request.chain.extend(rest.iter().cloned());
            builder
                .build(&request.spec)
                .map_err(|source| CoordinatorError::InvalidChain {
                    action_type: next.action_type.clone(),
                    source,
                })?;
        }
        None if !rest.is_empty() => {
            warn!(
                %origin_type,
                next = %next.action_type,
                dropped = rest.len(),
                "continuation: chained action carries no request, remaining links dropped"
            );
        }
        None => {}
    }

    Ok(Some(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::BuildError;
    use serde_json::json;

    #[test]
    fn test_empty_chain() {
        let descriptor = RequestDescriptor::get("/a");
        let next = continuation(&RequestBuilder::default(), "A_REQUEST", &descriptor, &json!(1)).unwrap();
        assert!(next.is_none());
    }

    #[test]
    fn test_remaining_links_move_to_next_action() {
        let descriptor = RequestDescriptor::get("/a")
            .then(|payload| {
                let id = payload["id"].as_i64().unwrap_or_default();
                Ok(Action::request("B_REQUEST", RequestDescriptor::get(format!("/b/{}", id))))
            })
            .then(|_| Ok(Action::request("C_REQUEST", RequestDescriptor::get("/c"))));

        let next = continuation(&RequestBuilder::default(), "A_REQUEST", &descriptor, &json!({"id": 3}))
            .unwrap()
            .unwrap();

        assert_eq!(next.action_type, "B_REQUEST");
        let request = next.request.unwrap();
        assert_eq!(request.spec.url, "/b/3");
        assert_eq!(request.chain.len(), 1);
    }

    #[test]
    fn test_failing_link_is_fault() {
        let descriptor = RequestDescriptor::get("/a").then(|_| Err(eyre::eyre!("no id")));
        let err = continuation(&RequestBuilder::default(), "A_REQUEST", &descriptor, &json!(null)).unwrap_err();
        assert!(matches!(err, CoordinatorError::Callback { hook: Hook::Chain, .. }));
    }

    #[test]
    fn test_invalid_next_request_is_fault() {
        let descriptor = RequestDescriptor::get("/a").then(|_| Ok(Action::request("B_REQUEST", RequestDescriptor::get(""))));
        let err = continuation(&RequestBuilder::default(), "A_REQUEST", &descriptor, &json!(null)).unwrap_err();
        assert_eq!(
            err,
            CoordinatorError::InvalidChain {
                action_type: "B_REQUEST".to_string(),
                source: BuildError::MissingUrl,
            }
        );
    }

    #[test]
    fn test_plain_action_link() {
        let descriptor = RequestDescriptor::get("/a").then(|_| Ok(Action::new("DONE")));
        let next = continuation(&RequestBuilder::default(), "A_REQUEST", &descriptor, &json!(null))
            .unwrap()
            .unwrap();
        assert!(!next.is_request());
    }
}

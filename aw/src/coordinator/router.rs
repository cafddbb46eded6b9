//! Correlation key derivation

use crate::action::{Action, RequestDescriptor, ResolvePolicy};

/// A request action split into its origin and descriptor, ready for a group
#[derive(Debug, Clone)]
pub(crate) struct Routed {
    /// The dispatched action, with its `request` moved into `descriptor`
    pub origin: Action,
    pub descriptor: RequestDescriptor,
}

impl Routed {
    pub fn policy(&self) -> ResolvePolicy {
        self.descriptor.options().policy()
    }
}

/// Correlation key for a request action, `None` for plain actions
///
/// Priority: `groupKey` verbatim, then `type/groupScope`, then the type alone.
pub fn correlation_key(action: &Action) -> Option<String> {
    let options = action.request.as_ref()?.options();
    let key = match (&options.group_key, &options.group_scope) {
        (Some(key), _) => key.clone(),
        (None, Some(scope)) => format!("{}/{}", action.action_type, scope),
        (None, None) => action.action_type.clone(),
    };
    Some(key)
}

/// Split a request action into its group key and routed form
pub(crate) fn route(mut action: Action) -> Option<(String, Routed)> {
    let key = correlation_key(&action)?;
    let descriptor = action.request.take()?;
    Some((
        key,
        Routed {
            origin: action,
            descriptor,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_action_has_no_key() {
        assert_eq!(correlation_key(&Action::new("FOO_REQUEST")), None);
        assert!(route(Action::new("FOO_REQUEST")).is_none());
    }

    #[test]
    fn test_type_is_default_key() {
        let action = Action::request("FOO_REQUEST", RequestDescriptor::get("/api/foos"));
        assert_eq!(correlation_key(&action).as_deref(), Some("FOO_REQUEST"));
    }

    #[test]
    fn test_group_scope_combines_with_type() {
        let action = Action::request("FOO_REQUEST", RequestDescriptor::get("/api/foos/7").group_scope("7"));
        assert_eq!(correlation_key(&action).as_deref(), Some("FOO_REQUEST/7"));
    }

    #[test]
    fn test_group_key_is_shared_across_types() {
        let load = Action::request("FOO_LOAD_REQUEST", RequestDescriptor::get("/a").group_key("foo-7"));
        let save = Action::request("FOO_SAVE_REQUEST", RequestDescriptor::put("/a").group_key("foo-7"));
        assert_eq!(correlation_key(&load), correlation_key(&save));
    }

    #[test]
    fn test_route_moves_descriptor() {
        let action = Action::request("FOO_REQUEST", RequestDescriptor::get("/api/foos"));
        let (key, routed) = route(action).unwrap();
        assert_eq!(key, "FOO_REQUEST");
        assert!(routed.origin.request.is_none());
        assert_eq!(routed.descriptor.spec.url, "/api/foos");
        assert_eq!(routed.policy(), ResolvePolicy::All);
    }
}

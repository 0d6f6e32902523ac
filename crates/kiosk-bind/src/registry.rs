use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use kiosk_common::{BindError, CallError};

use crate::handler::{Handler, Signature};
use crate::reply::Reply;

/// Check that `name` can be exposed as a global in the page.
///
/// Names must be non-empty JavaScript identifiers (`[A-Za-z_$][A-Za-z0-9_$]*`).
pub fn validate_name(name: &str) -> Result<(), BindError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(BindError::InvalidBinding("binding name is empty".into()));
    };
    let is_start = |c: char| c.is_ascii_alphabetic() || c == '_' || c == '$';
    if !is_start(first) || !chars.all(|c| is_start(c) || c.is_ascii_digit()) {
        return Err(BindError::InvalidBinding(format!(
            "{name:?} is not a valid identifier"
        )));
    }
    Ok(())
}

/// Thread-safe name → handler map. Cloning shares the same map.
#[derive(Clone, Default)]
pub struct Registry {
    bindings: Arc<RwLock<HashMap<String, Handler>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, returning the handler it replaced.
    pub fn insert(&self, name: impl Into<String>, handler: Handler) -> Option<Handler> {
        let name = name.into();
        let mut map = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        let previous = map.insert(name.clone(), handler);
        if previous.is_some() {
            debug!(name = %name, "binding replaced");
        }
        previous
    }

    pub fn remove(&self, name: &str) -> Option<Handler> {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Remove `name` only while it still maps to `handler`.
    pub fn remove_if_same(&self, name: &str, handler: &Handler) -> bool {
        let mut map = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        if map.get(name).is_some_and(|current| current.ptr_eq(handler)) {
            map.remove(name);
            return true;
        }
        false
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Call the handler bound to `name`. The map is not locked during the call.
    pub fn dispatch(&self, name: &str, args: Vec<Value>) -> Reply {
        match self.get(name) {
            Some(handler) => handler.call(args),
            None => Reply::failed(CallError::UnknownBinding(name.to_string())),
        }
    }

    /// Registered names with their signatures, sorted by name.
    pub fn signatures(&self) -> Vec<(String, Signature)> {
        let map = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<_> = map
            .iter()
            .map(|(name, handler)| (name.clone(), handler.signature().clone()))
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }

    pub fn len(&self) -> usize {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("bindings", &self.signatures())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_names() {
        for name in ["add", "_private", "$jq", "counterAdd", "a1"] {
            assert!(validate_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn invalid_names() {
        for name in ["", "1st", "with space", "dash-name", "dot.name", "ünï"] {
            let err = validate_name(name).unwrap_err();
            assert!(matches!(err, BindError::InvalidBinding(_)), "{name}");
        }
    }

    #[test]
    fn insert_and_dispatch() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        registry.insert("add", Handler::new(|a: i64, b: i64| a + b));

        let reply = registry.dispatch("add", vec![json!(2), json!(3)]);
        assert_eq!(reply.value, Some(json!(5)));
        assert!(registry.contains("add"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rebinding_replaces_handler() {
        let registry = Registry::new();
        assert!(registry.insert("answer", Handler::new(|| 1)).is_none());
        assert!(registry.insert("answer", Handler::new(|| 2)).is_some());

        let reply = registry.dispatch("answer", vec![]);
        assert_eq!(reply.value, Some(json!(2)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn removed_binding_is_unknown() {
        let registry = Registry::new();
        registry.insert("gone", Handler::new(|| ()));
        assert!(registry.remove("gone").is_some());
        assert!(registry.remove("gone").is_none());
        assert!(!registry.contains("gone"));
    }

    #[test]
    fn remove_if_same_spares_newer_handler() {
        let registry = Registry::new();
        let first = Handler::new(|| 1);
        let second = Handler::new(|| 2);
        registry.insert("f", first.clone());
        registry.insert("f", second.clone());

        assert!(!registry.remove_if_same("f", &first));
        assert_eq!(registry.dispatch("f", vec![]).value, Some(json!(2)));
        assert!(registry.remove_if_same("f", &second));
        assert!(!registry.contains("f"));
    }

    #[test]
    fn unknown_binding_fails() {
        let reply = Registry::new().dispatch("missing", vec![]);
        assert!(matches!(reply.error, Some(CallError::UnknownBinding(ref n)) if n == "missing"));
    }

    #[test]
    fn signatures_are_sorted() {
        let registry = Registry::new();
        registry.insert("zeta", Handler::new(|| ()));
        registry.insert("alpha", Handler::new(|s: String| s.len()));

        let names: Vec<_> = registry
            .signatures()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn concurrent_registration_and_dispatch() {
        let registry = Registry::new();
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let name = format!("f{i}");
                    registry.insert(name.clone(), Handler::new(move || i));
                    for _ in 0..100 {
                        let reply = registry.dispatch(&name, vec![]);
                        assert_eq!(reply.value, Some(json!(i)));
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(registry.len(), 8);
    }
}

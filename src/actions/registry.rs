//! Action registry
//!
//! Per-namespace catalog of callable operations. Namespace keys and action
//! ids are matched case-insensitively; descriptors are cloned on read and
//! write so callers can never mutate registry internals through a returned
//! reference. One registry instance lives per agent, never process-wide.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::actions::types::ActionDescriptor;

/// Namespace → ordered action descriptors.
pub struct ActionRegistry {
    namespaces: RwLock<HashMap<String, Vec<ActionDescriptor>>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Register an action in a namespace.
    ///
    /// Replaces an existing descriptor with the same id (case-insensitive)
    /// in place, preserving declaration order; otherwise appends.
    ///
    /// # Example
    /// ```
    /// use casement::actions::{ActionDescriptor, ActionRegistry};
    ///
    /// let registry = ActionRegistry::new();
    /// registry.register("mail", ActionDescriptor::new("reply", "Reply"));
    /// assert!(registry.find("MAIL", "Reply").is_some());
    /// ```
    pub fn register(&self, namespace: &str, descriptor: ActionDescriptor) {
        let key = namespace.to_ascii_lowercase();
        let mut namespaces = self.namespaces.write().expect("registry lock poisoned");
        let actions = namespaces.entry(key).or_default();
        match actions
            .iter_mut()
            .find(|a| a.id.eq_ignore_ascii_case(&descriptor.id))
        {
            Some(existing) => *existing = descriptor,
            None => actions.push(descriptor),
        }
    }

    /// Register several actions in one namespace, in order.
    pub fn register_all(&self, namespace: &str, descriptors: Vec<ActionDescriptor>) {
        for descriptor in descriptors {
            self.register(namespace, descriptor);
        }
    }

    /// Find an action by namespace and id (both case-insensitive).
    /// Returns a deep copy.
    pub fn find(&self, namespace: &str, action_id: &str) -> Option<ActionDescriptor> {
        let namespaces = self.namespaces.read().expect("registry lock poisoned");
        namespaces
            .get(&namespace.to_ascii_lowercase())
            .and_then(|actions| {
                actions
                    .iter()
                    .find(|a| a.id.eq_ignore_ascii_case(action_id))
                    .cloned()
            })
    }

    /// Whether a namespace exists.
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces
            .read()
            .expect("registry lock poisoned")
            .contains_key(&namespace.to_ascii_lowercase())
    }

    /// All actions of a namespace, in declaration order. Deep copies.
    pub fn namespace_actions(&self, namespace: &str) -> Vec<ActionDescriptor> {
        self.namespaces
            .read()
            .expect("registry lock poisoned")
            .get(&namespace.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// All namespace keys, sorted for deterministic iteration.
    pub fn namespaces(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .namespaces
            .read()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Prompt signatures of a namespace's actions, e.g.
    /// `mail.reply(body: string)`.
    pub fn signatures(&self, namespace: &str) -> Vec<String> {
        let key = namespace.to_ascii_lowercase();
        self.namespace_actions(&key)
            .iter()
            .map(|a| format!("{}.{}", key, a.signature()))
            .collect()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

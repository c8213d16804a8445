//! Action call resolution
//!
//! Maps a model-supplied, possibly-unqualified action reference to one
//! concrete namespace-qualified action. Qualified references (`ns.action`)
//! resolve directly against the window's visibility set; short names work
//! only when exactly one visible namespace declares the action.
//!
//! Resolution failures are values: the executor converts the message into a
//! failed action result for the model to read.

use crate::actions::registry::ActionRegistry;
use crate::actions::types::ActionDescriptor;
use crate::window::types::Window;

/// A successfully resolved action call.
#[derive(Debug, Clone)]
pub struct ResolvedAction {
    /// The namespace that owns the action (lowercase).
    pub namespace: String,
    /// Deep copy of the matched descriptor.
    pub descriptor: ActionDescriptor,
}

impl ResolvedAction {
    /// The fully qualified id, e.g. `mail.reply`.
    pub fn qualified_id(&self) -> String {
        format!("{}.{}", self.namespace, self.descriptor.id)
    }
}

/// Resolve `action_id` against a window's visible namespaces.
///
/// # Example
/// ```
/// use casement::actions::{resolve, ActionDescriptor, ActionRegistry};
/// use casement::window::Window;
///
/// let registry = ActionRegistry::new();
/// registry.register("mail", ActionDescriptor::new("reply", "Reply"));
/// let window = Window::new("inbox", "Inbox", "").with_namespace("mail");
///
/// let resolved = resolve(&window, &registry, "reply").unwrap();
/// assert_eq!(resolved.qualified_id(), "mail.reply");
/// ```
pub fn resolve(
    window: &Window,
    registry: &ActionRegistry,
    action_id: &str,
) -> Result<ResolvedAction, String> {
    if let Some((namespace, bare_id)) = action_id.split_once('.') {
        if !window.sees_namespace(namespace) {
            return Err(format!(
                "Namespace '{}' is not visible from window '{}'",
                namespace, window.id
            ));
        }
        return match registry.find(namespace, bare_id) {
            Some(descriptor) => Ok(ResolvedAction {
                namespace: namespace.to_ascii_lowercase(),
                descriptor,
            }),
            None => Err(format!("Action '{}' not found", action_id)),
        };
    }

    // Unqualified: search every visible namespace in declaration order.
    let mut matches: Vec<ResolvedAction> = Vec::new();
    for namespace in &window.namespaces {
        if let Some(descriptor) = registry.find(namespace, action_id) {
            matches.push(ResolvedAction {
                namespace: namespace.to_ascii_lowercase(),
                descriptor,
            });
        }
    }
    match matches.len() {
        0 => Err(format!(
            "Action '{}' is not visible from window '{}'",
            action_id, window.id
        )),
        1 => Ok(matches.remove(0)),
        _ => {
            let candidates: Vec<String> = matches.iter().map(|m| m.qualified_id()).collect();
            Err(format!(
                "Action '{}' is ambiguous: {}",
                action_id,
                candidates.join(", ")
            ))
        }
    }
}

//! Prompt rendering
//!
//! Turns the active context timeline into the ordered message list a model
//! bridge consumes. Window references render the *live* window at call time,
//! so an in-place refresh shows current content from the reference's
//! original timeline position. Rendering also recomputes and caches token
//! estimates, which is what the pruner's cost resolver reads.

use crate::actions::registry::ActionRegistry;
use crate::actions::CLOSE_ACTION;
use crate::agent::profile::AgentProfile;
use crate::context::item::{estimate_tokens, ContextItemKind};
use crate::context::pruner::WindowCost;
use crate::context::store::ContextStore;
use crate::model::{ModelMessage, ModelRole};
use crate::window::directory::WindowDirectory;
use crate::window::types::Window;

/// Render one window for the prompt.
///
/// Full form carries title, content, and the action signatures reachable
/// through the window's namespaces; compact form drops the content. The
/// reserved `close` action is listed only when the window is closable.
pub fn render_window(window: &Window, registry: &ActionRegistry) -> String {
    let mut signatures: Vec<String> = Vec::new();
    for namespace in &window.namespaces {
        signatures.extend(registry.signatures(namespace));
    }
    if window.options.closable {
        signatures.push(format!("{}(summary?: string)", CLOSE_ACTION));
    }

    let mut out = format!("[window {}] {}", window.id, window.title);
    if !window.options.compact && !window.content.is_empty() {
        out.push('\n');
        out.push_str(&window.content);
    }
    if !signatures.is_empty() {
        out.push('\n');
        out.push_str("actions: ");
        out.push_str(&signatures.join(", "));
    }
    out
}

/// Build the ordered message list for one completion.
///
/// The system preamble states the agent's identity, its role text, and the
/// action-call wire format. Active timeline entries follow in order;
/// obsolete entries are skipped, window references render the live window
/// (or nothing if it has meanwhile disappeared). Token estimates for
/// rendered windows are cached back into the store entry and the directory.
pub fn render_messages(
    profile: &AgentProfile,
    directory: &WindowDirectory,
    store: &ContextStore,
    registry: &ActionRegistry,
) -> Vec<ModelMessage> {
    let mut messages = vec![ModelMessage::system(&preamble(profile))];

    for item in store.active_items() {
        if item.obsolete {
            continue;
        }
        match item.kind {
            ContextItemKind::System => {
                messages.push(ModelMessage {
                    role: ModelRole::System,
                    content: item.content,
                });
            }
            ContextItemKind::User => {
                messages.push(ModelMessage {
                    role: ModelRole::User,
                    content: item.content,
                });
            }
            ContextItemKind::Assistant => {
                messages.push(ModelMessage {
                    role: ModelRole::Assistant,
                    content: item.content,
                });
            }
            ContextItemKind::WindowRef => {
                let window = match directory.get(&item.content) {
                    Some(w) => w,
                    None => continue,
                };
                let rendered = render_window(&window, registry);
                let tokens = estimate_tokens(&rendered);
                store.set_token_estimate(&item.id, tokens);
                directory.set_token_estimate(&window.id, tokens);
                messages.push(ModelMessage {
                    role: ModelRole::User,
                    content: rendered,
                });
            }
        }
    }

    messages
}

/// Pruner cost resolver backed by the live directory.
///
/// A reference to a window that no longer exists resolves to `None`; the
/// pruner sweeps such references in round one.
pub fn window_cost(directory: &WindowDirectory, window_id: &str) -> Option<WindowCost> {
    directory.get(window_id).map(|w| WindowCost {
        tokens: w.token_estimate,
        pinned: w.options.pinned,
        important: w.options.important,
    })
}

fn preamble(profile: &AgentProfile) -> String {
    let mut out = format!("You are {}.", profile.name);
    if let Some(role) = &profile.role {
        out.push('\n');
        out.push_str(role);
    }
    out.push_str(
        "\n\nWindows below show live state. To act on a window, respond with a JSON object:\n\
         {\"calls\":[{\"window_id\":\"...\",\"action_id\":\"...\",\"params\":{...}}]}\n\
         Use a namespace-qualified action_id (e.g. mail.reply) when two visible namespaces \
         declare the same action. Every window listing a close action can be dismissed with \
         {\"action_id\":\"close\",\"params\":{\"summary\":\"...\"}}.\n\
         Respond with plain text, and no call payload, to finish your turn.",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::actions::{ActionDescriptor, ParamSchema};
    use crate::clock::LogicalClock;
    use crate::context::ContextStore;
    use crate::window::WindowOptions;

    fn registry() -> ActionRegistry {
        let registry = ActionRegistry::new();
        registry.register(
            "mail",
            ActionDescriptor::new("reply", "Reply").with_schema(
                ParamSchema::object().property("body", ParamSchema::string().require()),
            ),
        );
        registry
    }

    #[test]
    fn test_render_window_full() {
        let registry = registry();
        let w = Window::new("inbox", "Inbox", "3 unread").with_namespace("mail");
        let rendered = render_window(&w, &registry);
        assert!(rendered.starts_with("[window inbox] Inbox\n3 unread"));
        assert!(rendered.contains("mail.reply(body: string)"));
        assert!(rendered.contains("close(summary?: string)"));
    }

    #[test]
    fn test_render_window_compact_drops_content() {
        let registry = registry();
        let w = Window::new("inbox", "Inbox", "3 unread")
            .with_namespace("mail")
            .with_options(WindowOptions::new().compact());
        let rendered = render_window(&w, &registry);
        assert!(!rendered.contains("3 unread"));
        assert!(rendered.contains("mail.reply"));
    }

    #[test]
    fn test_render_window_non_closable_omits_close() {
        let registry = registry();
        let w = Window::new("inbox", "Inbox", "x")
            .with_namespace("mail")
            .with_options(WindowOptions::new().non_closable());
        assert!(!render_window(&w, &registry).contains("close("));
    }

    #[test]
    fn test_render_messages_roles_and_order() {
        let clock = Arc::new(LogicalClock::new());
        let directory = WindowDirectory::new(Arc::clone(&clock));
        let store = ContextStore::new(Arc::clone(&clock));
        let registry = registry();

        store.add(ContextItemKind::User, "hello");
        store.add(ContextItemKind::Assistant, "hi there");
        directory.add(Window::new("inbox", "Inbox", "1 unread").with_namespace("mail"));
        store.add(ContextItemKind::WindowRef, "inbox");
        store.add(ContextItemKind::System, "note: inbox refreshed");

        let profile = AgentProfile::new("a", "Agent A").with_role("You triage mail.");
        let messages = render_messages(&profile, &directory, &store, &registry);

        assert_eq!(messages[0].role, ModelRole::System);
        assert!(messages[0].content.contains("You are Agent A."));
        assert!(messages[0].content.contains("You triage mail."));
        assert_eq!(messages[1].role, ModelRole::User);
        assert_eq!(messages[1].content, "hello");
        assert_eq!(messages[2].role, ModelRole::Assistant);
        assert_eq!(messages[3].role, ModelRole::User);
        assert!(messages[3].content.contains("[window inbox]"));
        assert_eq!(messages[4].role, ModelRole::System);
    }

    #[test]
    fn test_render_skips_obsolete_and_vanished_windows() {
        let clock = Arc::new(LogicalClock::new());
        let directory = WindowDirectory::new(Arc::clone(&clock));
        let store = ContextStore::new(Arc::clone(&clock));
        let registry = registry();

        store.add(ContextItemKind::WindowRef, "gone");
        store.add(ContextItemKind::WindowRef, "inbox");
        store.add(ContextItemKind::WindowRef, "inbox"); // retires the prior ref
        directory.add(Window::new("inbox", "Inbox", "x"));

        let profile = AgentProfile::new("a", "A");
        let messages = render_messages(&profile, &directory, &store, &registry);
        // Preamble plus exactly one live inbox render.
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("[window inbox]"));
    }

    #[test]
    fn test_render_caches_token_estimates() {
        let clock = Arc::new(LogicalClock::new());
        let directory = WindowDirectory::new(Arc::clone(&clock));
        let store = ContextStore::new(Arc::clone(&clock));
        let registry = registry();

        directory.add(Window::new("inbox", "Inbox", "some content here"));
        let item = store.add(ContextItemKind::WindowRef, "inbox");
        assert_eq!(item.token_estimate, 0);

        let profile = AgentProfile::new("a", "A");
        render_messages(&profile, &directory, &store, &registry);

        let cached = store
            .active_items()
            .into_iter()
            .find(|i| i.id == item.id)
            .unwrap();
        assert!(cached.token_estimate > 0);
        assert_eq!(
            directory.get("inbox").unwrap().token_estimate,
            cached.token_estimate
        );
    }

    #[test]
    fn test_window_cost_resolver() {
        let clock = Arc::new(LogicalClock::new());
        let directory = WindowDirectory::new(Arc::clone(&clock));
        directory.add(
            Window::new("w1", "T", "C").with_options(WindowOptions::new().important()),
        );
        directory.set_token_estimate("w1", 42);

        let cost = window_cost(&directory, "w1").unwrap();
        assert_eq!(cost.tokens, 42);
        assert!(cost.important);
        assert!(!cost.pinned);
        assert!(window_cost(&directory, "missing").is_none());
    }
}

//! Window types for Casement
//!
//! This module defines the [`Window`] struct, its display/eviction options,
//! and the [`WindowHandler`] trait that applications implement to service
//! action calls bound to a window.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::ActionOutcome;

/// How a window's content change is reflected in the context timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// A refresh appends a fresh window reference to the timeline, retiring
    /// the previous one. The window moves to the causal "now".
    #[default]
    Append,
    /// A refresh updates content in place; the existing timeline reference
    /// keeps its position and renders the live content.
    InPlace,
}

/// Display and lifecycle options for a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowOptions {
    /// Whether the model may close this window via the reserved `close` action.
    pub closable: bool,
    /// Remove the window automatically after any successful action call.
    pub auto_close_on_action: bool,
    /// Render a compact (title-only) form instead of full content.
    pub compact: bool,
    /// Pinned windows are never evicted by the pruner.
    pub pinned: bool,
    /// Important windows survive round one of pruning and are evicted only
    /// under sustained budget pressure.
    pub important: bool,
    /// How content refreshes are mirrored into the timeline.
    pub refresh_mode: RefreshMode,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            closable: true,
            auto_close_on_action: false,
            compact: false,
            pinned: false,
            important: false,
            refresh_mode: RefreshMode::default(),
        }
    }
}

impl WindowOptions {
    /// Create default options (closable, full render, evictable).
    pub fn new() -> Self {
        Self::default()
    }

    /// Disallow the reserved `close` action for this window.
    pub fn non_closable(mut self) -> Self {
        self.closable = false;
        self
    }

    /// Close the window automatically after any successful action.
    pub fn auto_close(mut self) -> Self {
        self.auto_close_on_action = true;
        self
    }

    /// Render the compact form.
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }

    /// Exempt the window from pruning entirely.
    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    /// Protect the window from round-one pruning.
    pub fn important(mut self) -> Self {
        self.important = true;
        self
    }

    /// Set the timeline refresh behavior.
    pub fn refresh(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }
}

/// Trait implemented by applications to service action calls on a window.
///
/// Handlers run inside the executor's failure boundary: a returned `Err` is
/// converted into a failed action result and never unwinds past the
/// executor.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use casement::actions::ActionOutcome;
/// use casement::window::WindowHandler;
///
/// struct Counter;
///
/// #[async_trait]
/// impl WindowHandler for Counter {
///     async fn handle(&self, action_id: &str, _params: &Value) -> anyhow::Result<ActionOutcome> {
///         match action_id {
///             "increment" => Ok(ActionOutcome::ok("counter incremented").refresh()),
///             other => anyhow::bail!("unsupported action: {}", other),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait WindowHandler: Send + Sync {
    /// Handle a validated action call.
    ///
    /// # Arguments
    /// * `action_id` - The resolved, namespace-unqualified action id
    /// * `params` - Validated parameters supplied by the model
    async fn handle(&self, action_id: &str, params: &Value) -> anyhow::Result<ActionOutcome>;
}

/// An agent-visible unit of state.
///
/// Windows are created by application logic, registered with the
/// [`super::WindowDirectory`], and destroyed by the reserved close action,
/// auto-close, or explicit removal. Metadata stamps (`created_seq`,
/// `updated_seq`) are assigned by the directory, not the constructor.
#[derive(Clone)]
pub struct Window {
    /// Unique identifier within the owning agent.
    pub id: String,
    /// Short human/model-readable title.
    pub title: String,
    /// Renderable content.
    pub content: String,
    /// Action namespaces visible through this window, in declaration order.
    pub namespaces: Vec<String>,
    /// Display and lifecycle options.
    pub options: WindowOptions,
    /// Clock value at creation (0 until registered).
    pub created_seq: u64,
    /// Clock value at last update (0 until registered).
    pub updated_seq: u64,
    /// Cached token estimate, recomputed at render time.
    pub token_estimate: u32,
    /// Optional bound handler servicing action calls.
    pub handler: Option<Arc<dyn WindowHandler>>,
}

impl Window {
    /// Create a new window with default options and no handler.
    ///
    /// # Example
    /// ```
    /// use casement::window::Window;
    ///
    /// let w = Window::new("inbox", "Inbox", "3 unread messages");
    /// assert_eq!(w.id, "inbox");
    /// assert!(w.options.closable);
    /// ```
    pub fn new(id: &str, title: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            namespaces: Vec::new(),
            options: WindowOptions::default(),
            created_seq: 0,
            updated_seq: 0,
            token_estimate: 0,
            handler: None,
        }
    }

    /// Make an action namespace visible through this window.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespaces.push(namespace.to_string());
        self
    }

    /// Replace the window options.
    pub fn with_options(mut self, options: WindowOptions) -> Self {
        self.options = options;
        self
    }

    /// Bind a handler to service action calls.
    pub fn with_handler(mut self, handler: Arc<dyn WindowHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Whether a namespace is visible through this window (case-insensitive).
    pub fn sees_namespace(&self, namespace: &str) -> bool {
        self.namespaces
            .iter()
            .any(|ns| ns.eq_ignore_ascii_case(namespace))
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("content", &self.content)
            .field("namespaces", &self.namespaces)
            .field("options", &self.options)
            .field("created_seq", &self.created_seq)
            .field("updated_seq", &self.updated_seq)
            .field("token_estimate", &self.token_estimate)
            .field("handler", &self.handler.as_ref().map(|_| "<handler>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_new() {
        let w = Window::new("w1", "Title", "Body");
        assert_eq!(w.id, "w1");
        assert_eq!(w.title, "Title");
        assert_eq!(w.content, "Body");
        assert!(w.namespaces.is_empty());
        assert!(w.handler.is_none());
        assert_eq!(w.created_seq, 0);
    }

    #[test]
    fn test_window_builder_chain() {
        let w = Window::new("w1", "T", "C")
            .with_namespace("mail")
            .with_namespace("search")
            .with_options(WindowOptions::new().pinned());

        assert_eq!(w.namespaces, vec!["mail", "search"]);
        assert!(w.options.pinned);
    }

    #[test]
    fn test_window_sees_namespace_case_insensitive() {
        let w = Window::new("w1", "T", "C").with_namespace("Mail");
        assert!(w.sees_namespace("mail"));
        assert!(w.sees_namespace("MAIL"));
        assert!(!w.sees_namespace("search"));
    }

    #[test]
    fn test_window_options_defaults() {
        let opts = WindowOptions::default();
        assert!(opts.closable);
        assert!(!opts.auto_close_on_action);
        assert!(!opts.compact);
        assert!(!opts.pinned);
        assert!(!opts.important);
        assert_eq!(opts.refresh_mode, RefreshMode::Append);
    }

    #[test]
    fn test_window_options_builders() {
        let opts = WindowOptions::new()
            .non_closable()
            .auto_close()
            .compact()
            .pinned()
            .important()
            .refresh(RefreshMode::InPlace);

        assert!(!opts.closable);
        assert!(opts.auto_close_on_action);
        assert!(opts.compact);
        assert!(opts.pinned);
        assert!(opts.important);
        assert_eq!(opts.refresh_mode, RefreshMode::InPlace);
    }

    #[test]
    fn test_window_options_serde_roundtrip() {
        let opts = WindowOptions::new().important().refresh(RefreshMode::InPlace);
        let json = serde_json::to_string(&opts).unwrap();
        assert!(json.contains("in_place"));
        let back: WindowOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);
    }

    #[test]
    fn test_window_debug_hides_handler() {
        let w = Window::new("w1", "T", "C");
        let dbg = format!("{:?}", w);
        assert!(dbg.contains("Window"));
        assert!(dbg.contains("w1"));
    }
}

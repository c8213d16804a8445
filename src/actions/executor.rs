//! Action executor
//!
//! Validates, dispatches, and applies the side effects of one action call
//! against a window. Everything the model can get wrong (unknown windows,
//! unknown actions, bad parameters, faulting handlers) comes back as a
//! failed [`ActionResult`]; nothing propagates past this boundary.
//!
//! The reserved `close` action is handled before generic dispatch and is the
//! only action id the executor interprets itself.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::actions::registry::ActionRegistry;
use crate::actions::resolver::resolve;
use crate::actions::types::{ActionMode, ActionResult};
use crate::clock::LogicalClock;
use crate::window::directory::WindowDirectory;

/// The reserved action id for closing a window.
pub const CLOSE_ACTION: &str = "close";

const EVENT_BUFFER: usize = 64;

/// Published once per executed action call (reserved close included).
#[derive(Debug, Clone)]
pub struct ActionEvent {
    /// The window the call targeted.
    pub window_id: String,
    /// Qualified action id, or `close` for the reserved path.
    pub action_id: String,
    /// Whether the call succeeded.
    pub success: bool,
    /// Optional summary (close action, handler-provided).
    pub summary: Option<String>,
    /// Clock value stamped on the execution.
    pub seq: u64,
}

/// Validates and dispatches action calls, applying close/refresh side
/// effects and publishing execution events.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use casement::actions::{ActionExecutor, ActionRegistry};
/// use casement::clock::LogicalClock;
/// use casement::window::{Window, WindowDirectory};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let clock = Arc::new(LogicalClock::new());
/// let directory = Arc::new(WindowDirectory::new(Arc::clone(&clock)));
/// let executor =
///     ActionExecutor::new(Arc::clone(&directory), Arc::new(ActionRegistry::new()), clock);
/// directory.add(Window::new("scratch", "Scratch", "notes"));
///
/// let result = executor.execute("scratch", "close", &json!({"summary": "done"})).await;
/// assert!(result.success);
/// assert!(!directory.contains("scratch"));
/// # });
/// ```
pub struct ActionExecutor {
    directory: Arc<WindowDirectory>,
    registry: Arc<ActionRegistry>,
    clock: Arc<LogicalClock>,
    events: broadcast::Sender<ActionEvent>,
}

impl ActionExecutor {
    /// Create an executor over one agent's directory and registry.
    pub fn new(
        directory: Arc<WindowDirectory>,
        registry: Arc<ActionRegistry>,
        clock: Arc<LogicalClock>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            directory,
            registry,
            clock,
            events,
        }
    }

    /// Subscribe to execution events.
    pub fn subscribe(&self) -> broadcast::Receiver<ActionEvent> {
        self.events.subscribe()
    }

    /// Declared mode of an action as seen from a window.
    ///
    /// Resolution failures default to `Blocking` so the failure surfaces
    /// through the ordinary execute path.
    pub fn action_mode(&self, window_id: &str, action_id: &str) -> ActionMode {
        if action_id.eq_ignore_ascii_case(CLOSE_ACTION) {
            return ActionMode::Blocking;
        }
        self.directory
            .get(window_id)
            .and_then(|window| resolve(&window, &self.registry, action_id).ok())
            .map(|resolved| resolved.descriptor.mode)
            .unwrap_or(ActionMode::Blocking)
    }

    /// Execute one action call.
    ///
    /// Failure order: window-not-found, reserved close handling, action
    /// resolution, parameter validation, handler invocation. Exactly one
    /// [`ActionEvent`] is published per executed call; calls refused before
    /// dispatch (including a refused close) publish nothing.
    pub async fn execute(&self, window_id: &str, action_id: &str, params: &Value) -> ActionResult {
        let window = match self.directory.get(window_id) {
            Some(w) => w,
            None => {
                return ActionResult::fail(
                    format!("Window '{}' not found", window_id),
                    self.clock.next(),
                );
            }
        };

        if action_id.eq_ignore_ascii_case(CLOSE_ACTION) {
            if !window.options.closable {
                return ActionResult::fail(
                    format!("Window '{}' cannot be closed", window_id),
                    self.clock.next(),
                );
            }
            let summary = params
                .get("summary")
                .and_then(Value::as_str)
                .map(str::to_string);
            self.directory.remove(window_id);
            let seq = self.clock.next();
            self.publish(ActionEvent {
                window_id: window_id.to_string(),
                action_id: CLOSE_ACTION.to_string(),
                success: true,
                summary: summary.clone(),
                seq,
            });
            debug!(window_id, "Window closed via reserved action");
            return ActionResult::ok(format!("Window '{}' closed", window_id), seq)
                .with_summary(summary);
        }

        let resolved = match resolve(&window, &self.registry, action_id) {
            Ok(r) => r,
            Err(message) => return ActionResult::fail(message, self.clock.next()),
        };

        // Absent params validate as an empty object so required-property
        // checks still apply.
        let empty = Value::Object(serde_json::Map::new());
        let params = if params.is_null() { &empty } else { params };
        if let Err(message) = resolved.descriptor.schema.validate(Some(params), "params") {
            return ActionResult::fail(message, self.clock.next());
        }

        let handler = match &window.handler {
            Some(h) => Arc::clone(h),
            None => {
                return ActionResult::fail(
                    format!("Window '{}' has no action handler", window_id),
                    self.clock.next(),
                );
            }
        };

        // Failure boundary: a faulting handler becomes a failed result.
        let outcome = match handler.handle(&resolved.descriptor.id, params).await {
            Ok(outcome) => outcome,
            Err(fault) => {
                warn!(
                    window_id,
                    action = %resolved.qualified_id(),
                    error = %fault,
                    "Action handler fault"
                );
                crate::actions::types::ActionOutcome::fail(format!("Action failed: {:#}", fault))
            }
        };

        let seq = self.clock.next();
        if outcome.success {
            // The handler may have replaced its own window through the
            // directory; side effects act on the current options, not the
            // pre-dispatch clone.
            let auto_close = self
                .directory
                .get(window_id)
                .map(|w| w.options.auto_close_on_action)
                .unwrap_or(false);
            if outcome.close_window || auto_close {
                self.directory.remove(window_id);
            } else if outcome.refresh_window {
                self.directory.notify_updated(window_id);
            }
        }

        self.publish(ActionEvent {
            window_id: window_id.to_string(),
            action_id: resolved.qualified_id(),
            success: outcome.success,
            summary: outcome.summary.clone(),
            seq,
        });
        debug!(
            window_id,
            action = %resolved.qualified_id(),
            success = outcome.success,
            seq,
            "Action executed"
        );

        ActionResult {
            success: outcome.success,
            message: outcome.message,
            summary: outcome.summary,
            seq,
        }
    }

    fn publish(&self, event: ActionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::types::{ActionDescriptor, ActionOutcome};
    use crate::actions::ParamSchema;
    use crate::window::types::{Window, WindowHandler, WindowOptions};
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl WindowHandler for EchoHandler {
        async fn handle(&self, action_id: &str, params: &Value) -> anyhow::Result<ActionOutcome> {
            match action_id {
                "echo" => Ok(ActionOutcome::ok(format!("echo: {}", params))),
                "refresh_me" => Ok(ActionOutcome::ok("refreshed").refresh()),
                "close_me" => Ok(ActionOutcome::ok("closing").close().with_summary("done")),
                "boom" => anyhow::bail!("handler exploded"),
                other => Ok(ActionOutcome::fail(format!("unknown: {}", other))),
            }
        }
    }

    fn fixture() -> (ActionExecutor, Arc<WindowDirectory>) {
        let clock = Arc::new(LogicalClock::new());
        let directory = Arc::new(WindowDirectory::new(Arc::clone(&clock)));
        let registry = Arc::new(ActionRegistry::new());
        registry.register_all(
            "demo",
            vec![
                ActionDescriptor::new("echo", "Echo").with_schema(
                    ParamSchema::object().property("text", ParamSchema::string().require()),
                ),
                ActionDescriptor::new("refresh_me", "Refresh"),
                ActionDescriptor::new("close_me", "Close"),
                ActionDescriptor::new("boom", "Fault"),
                ActionDescriptor::new("arm", "Arm auto close"),
                ActionDescriptor::new("slow", "Background job").background(),
            ],
        );
        let executor = ActionExecutor::new(Arc::clone(&directory), registry, clock);
        (executor, directory)
    }

    fn demo_window(id: &str) -> Window {
        Window::new(id, "Demo", "content")
            .with_namespace("demo")
            .with_handler(Arc::new(EchoHandler))
    }

    #[tokio::test]
    async fn test_window_not_found_fails_first() {
        let (executor, _) = fixture();
        let result = executor.execute("missing", "echo", &json!({})).await;
        assert!(!result.success);
        assert_eq!(result.message, "Window 'missing' not found");
    }

    #[tokio::test]
    async fn test_close_refused_for_non_closable() {
        let (executor, directory) = fixture();
        directory.add(demo_window("w1").with_options(WindowOptions::new().non_closable()));
        let mut events = executor.subscribe();

        let result = executor.execute("w1", "close", &json!({"summary": "x"})).await;
        assert!(!result.success);
        assert_eq!(result.message, "Window 'w1' cannot be closed");
        assert!(directory.contains("w1"));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_removes_window_and_publishes() {
        let (executor, directory) = fixture();
        directory.add(demo_window("w1"));
        let mut events = executor.subscribe();

        let result = executor.execute("w1", "close", &json!({"summary": "wrap"})).await;
        assert!(result.success);
        assert_eq!(result.summary.as_deref(), Some("wrap"));
        assert!(!directory.contains("w1"));

        let event = events.try_recv().unwrap();
        assert_eq!(event.action_id, "close");
        assert!(event.success);
        assert_eq!(event.summary.as_deref(), Some("wrap"));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_action_fails_as_value() {
        let (executor, directory) = fixture();
        directory.add(demo_window("w1"));
        let result = executor.execute("w1", "nonexistent", &json!({})).await;
        assert!(!result.success);
        assert_eq!(result.message, "Action 'nonexistent' is not visible from window 'w1'");
    }

    #[tokio::test]
    async fn test_validation_error_returned_verbatim() {
        let (executor, directory) = fixture();
        directory.add(demo_window("w1"));
        let result = executor.execute("w1", "echo", &json!({"text": 42})).await;
        assert!(!result.success);
        assert_eq!(result.message, "params.text: expected string, got number");
    }

    #[tokio::test]
    async fn test_handler_fault_becomes_failed_result() {
        let (executor, directory) = fixture();
        directory.add(demo_window("w1"));
        let mut events = executor.subscribe();

        let result = executor.execute("w1", "boom", &json!({})).await;
        assert!(!result.success);
        assert!(result.message.contains("handler exploded"));
        // Fault still publishes exactly one event, marked unsuccessful.
        let event = events.try_recv().unwrap();
        assert!(!event.success);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_successful_call_publishes_one_event() {
        let (executor, directory) = fixture();
        directory.add(demo_window("w1"));
        let mut events = executor.subscribe();

        let result = executor.execute("w1", "echo", &json!({"text": "hi"})).await;
        assert!(result.success);
        let event = events.try_recv().unwrap();
        assert_eq!(event.action_id, "demo.echo");
        assert!(event.success);
        assert_eq!(event.seq, result.seq);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_refresh_outcome_bumps_window() {
        let (executor, directory) = fixture();
        directory.add(demo_window("w1"));
        let before = directory.get("w1").unwrap().updated_seq;

        let result = executor.execute("w1", "refresh_me", &json!({})).await;
        assert!(result.success);
        assert!(directory.get("w1").unwrap().updated_seq > before);
    }

    #[tokio::test]
    async fn test_close_outcome_removes_window() {
        let (executor, directory) = fixture();
        directory.add(demo_window("w1"));
        let result = executor.execute("w1", "close_me", &json!({})).await;
        assert!(result.success);
        assert_eq!(result.summary.as_deref(), Some("done"));
        assert!(!directory.contains("w1"));
    }

    #[tokio::test]
    async fn test_auto_close_on_action() {
        let (executor, directory) = fixture();
        directory.add(demo_window("w1").with_options(WindowOptions::new().auto_close()));
        let result = executor.execute("w1", "echo", &json!({"text": "hi"})).await;
        assert!(result.success);
        assert!(!directory.contains("w1"));
    }

    /// Rewrites its own window with auto-close enabled while handling.
    struct ArmingHandler {
        directory: Arc<WindowDirectory>,
    }

    #[async_trait]
    impl WindowHandler for ArmingHandler {
        async fn handle(&self, action_id: &str, _params: &Value) -> anyhow::Result<ActionOutcome> {
            match action_id {
                "arm" => {
                    self.directory.add(
                        Window::new("w1", "Demo", "armed")
                            .with_namespace("demo")
                            .with_options(WindowOptions::new().auto_close()),
                    );
                    Ok(ActionOutcome::ok("armed"))
                }
                other => Ok(ActionOutcome::fail(format!("unknown: {}", other))),
            }
        }
    }

    #[tokio::test]
    async fn test_side_effects_read_current_options() {
        let (executor, directory) = fixture();
        directory.add(
            Window::new("w1", "Demo", "content")
                .with_namespace("demo")
                .with_handler(Arc::new(ArmingHandler {
                    directory: Arc::clone(&directory),
                })),
        );

        // The handler enables auto-close mid-call; the executor must honor
        // the options as they stand after the handler ran.
        let result = executor.execute("w1", "arm", &json!({})).await;
        assert!(result.success);
        assert!(!directory.contains("w1"));
    }

    #[tokio::test]
    async fn test_missing_handler_fails() {
        let (executor, directory) = fixture();
        directory.add(Window::new("w1", "T", "C").with_namespace("demo"));
        let result = executor.execute("w1", "echo", &json!({"text": "hi"})).await;
        assert!(!result.success);
        assert_eq!(result.message, "Window 'w1' has no action handler");
    }

    #[tokio::test]
    async fn test_action_mode_from_descriptor() {
        let (executor, directory) = fixture();
        directory.add(demo_window("w1"));
        assert_eq!(executor.action_mode("w1", "slow"), ActionMode::Background);
        assert_eq!(executor.action_mode("w1", "echo"), ActionMode::Blocking);
        assert_eq!(executor.action_mode("w1", "close"), ActionMode::Blocking);
        assert_eq!(executor.action_mode("w1", "missing"), ActionMode::Blocking);
    }

    #[tokio::test]
    async fn test_null_params_validate_as_missing() {
        let (executor, directory) = fixture();
        directory.add(demo_window("w1"));
        // refresh_me has an empty object schema; null params are fine.
        let result = executor.execute("w1", "refresh_me", &Value::Null).await;
        assert!(result.success);
        // echo requires text; null params fail the required check.
        let result = executor.execute("w1", "echo", &Value::Null).await;
        assert!(!result.success);
        assert_eq!(result.message, "params.text: missing required value");
    }
}

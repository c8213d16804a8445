//! Action types for Casement
//!
//! This module defines action descriptors (the catalog entries), handler
//! outcomes, and the execution results handed back to the orchestrator.

use serde::{Deserialize, Serialize};

use crate::actions::schema::ParamSchema;

/// How an action executes relative to the turn loop.
///
/// The mode is declared on the descriptor and is never taken from the
/// model's request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionMode {
    /// Executes inside the turn; the result feeds the next model call.
    #[default]
    Blocking,
    /// Fire-and-forget: dispatched to the task runner, the turn continues
    /// immediately with a "running" step.
    Background,
}

/// Catalog entry for one callable operation in a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Action id, unique within its namespace (matched case-insensitively).
    pub id: String,
    /// Human/model-readable description.
    pub description: String,
    /// Root parameter schema (an object contract).
    pub schema: ParamSchema,
    /// Declared execution mode.
    pub mode: ActionMode,
}

impl ActionDescriptor {
    /// Create a blocking action with an empty object schema.
    ///
    /// # Example
    /// ```
    /// use casement::actions::{ActionDescriptor, ParamSchema};
    ///
    /// let action = ActionDescriptor::new("archive", "Archive the message")
    ///     .with_schema(ParamSchema::object().property("reason", ParamSchema::string()));
    /// assert_eq!(action.id, "archive");
    /// ```
    pub fn new(id: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            schema: ParamSchema::object(),
            mode: ActionMode::Blocking,
        }
    }

    /// Replace the parameter schema.
    pub fn with_schema(mut self, schema: ParamSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Declare the action fire-and-forget.
    pub fn background(mut self) -> Self {
        self.mode = ActionMode::Background;
        self
    }

    /// Render the prompt signature, e.g. `search(query: string, limit?: integer)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .schema
            .properties
            .iter()
            .map(|(name, schema)| schema.signature_fragment(name))
            .collect();
        format!("{}({})", self.id, params.join(", "))
    }
}

/// What a window handler reports back from one action call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionOutcome {
    /// Whether the action succeeded.
    pub success: bool,
    /// Message surfaced to the model.
    pub message: String,
    /// Optional summary recorded with the execution event.
    pub summary: Option<String>,
    /// Request removal of the window.
    pub close_window: bool,
    /// Request a refresh notification for the window.
    pub refresh_window: bool,
}

impl ActionOutcome {
    /// Successful outcome with a message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Failed outcome with a message.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Request that the window be closed on success.
    pub fn close(mut self) -> Self {
        self.close_window = true;
        self
    }

    /// Request a refresh notification on success.
    pub fn refresh(mut self) -> Self {
        self.refresh_window = true;
        self
    }

    /// Attach a summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Result of one executed (or refused) action call, stamped with the clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the call succeeded.
    pub success: bool,
    /// Message surfaced to the model, verbatim for validator errors.
    pub message: String,
    /// Optional summary (close action, handler-provided).
    pub summary: Option<String>,
    /// Clock value stamped on the result.
    pub seq: u64,
}

impl ActionResult {
    /// Successful result.
    pub fn ok(message: impl Into<String>, seq: u64) -> Self {
        Self {
            success: true,
            message: message.into(),
            summary: None,
            seq,
        }
    }

    /// Failed result. Failures travel as values, never as `Err`.
    pub fn fail(message: impl Into<String>, seq: u64) -> Self {
        Self {
            success: false,
            message: message.into(),
            summary: None,
            seq,
        }
    }

    /// Attach a summary.
    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary;
        self
    }
}

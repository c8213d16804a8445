//! Model bridge
//!
//! The runtime talks to a language model through the [`ModelBridge`] trait:
//! an ordered list of role-tagged messages goes in, text and token usage
//! come out. The orchestrator never retries internally; retry and fallback
//! policy belongs to the bridge implementation (an HTTP client crate, a
//! router, a test fake).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The role of a message sent to the model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    /// System prompts and instructions
    System,
    /// User turns, window renders, action reports
    User,
    /// Prior assistant turns
    Assistant,
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelRole::System => write!(f, "system"),
            ModelRole::User => write!(f, "user"),
            ModelRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One role-tagged message in a model request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMessage {
    /// The role of the message sender
    pub role: ModelRole,
    /// The text content
    pub content: String,
}

impl ModelMessage {
    /// Create a system message.
    pub fn system(content: &str) -> Self {
        Self {
            role: ModelRole::System,
            content: content.to_string(),
        }
    }

    /// Create a user message.
    pub fn user(content: &str) -> Self {
        Self {
            role: ModelRole::User,
            content: content.to_string(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: &str) -> Self {
        Self {
            role: ModelRole::Assistant,
            content: content.to_string(),
        }
    }
}

/// Token usage counters from one completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Create usage counters.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A model completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Response text
    pub text: String,
    /// Usage counters, when the bridge reports them
    pub usage: Option<TokenUsage>,
}

impl ModelResponse {
    /// A plain text response without usage counters.
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            usage: None,
        }
    }

    /// Attach usage counters.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Trait for language model backends.
///
/// Implementations own their retry/fallback policy; a returned `Err` is
/// surfaced verbatim as the interaction's failure reason.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use casement::error::Result;
/// use casement::model::{ModelBridge, ModelMessage, ModelResponse};
///
/// struct Fixed;
///
/// #[async_trait]
/// impl ModelBridge for Fixed {
///     async fn complete(&self, _messages: Vec<ModelMessage>) -> Result<ModelResponse> {
///         Ok(ModelResponse::text("Hello!"))
///     }
///     fn name(&self) -> &str { "fixed" }
/// }
/// ```
#[async_trait]
pub trait ModelBridge: Send + Sync {
    /// Send an ordered list of role-tagged messages, get a completion.
    async fn complete(&self, messages: Vec<ModelMessage>) -> Result<ModelResponse>;

    /// The bridge name (for logs).
    fn name(&self) -> &str;
}

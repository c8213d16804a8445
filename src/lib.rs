//! Casement - window-driven agent interaction runtime
//!
//! Agents see their world through *windows*: titled, action-bearing blocks
//! of live state rendered into a token-budgeted context timeline. The model
//! acts by calling namespaced actions against windows; the orchestrator
//! bounds the loop, the pruner keeps the timeline within budget, and a
//! session bridges channel messages between multiple agents.

pub mod actions;
pub mod agent;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod session;
pub mod tasks;
pub mod window;

pub use actions::{
    ActionDescriptor, ActionExecutor, ActionMode, ActionOutcome, ActionRegistry, ActionResult,
    ParamSchema,
};
pub use agent::{AgentProfile, AgentRuntime, InteractionOutcome, InteractionStep};
pub use clock::LogicalClock;
pub use config::Config;
pub use context::{ContextItem, ContextItemKind, ContextStore};
pub use error::{CasementError, Result};
pub use model::{ModelBridge, ModelMessage, ModelResponse, ModelRole, TokenUsage};
pub use session::{AgentChannel, ChannelMessage, MessageScope, Session, SessionSnapshot};
pub use tasks::{TaskEvent, TaskEventKind, TaskRunner};
pub use window::{Window, WindowDirectory, WindowHandler, WindowOptions};

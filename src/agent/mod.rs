//! Agent runtime
//!
//! One [`AgentRuntime`] per agent composes the whole per-agent stack: clock,
//! window directory (with the timeline mirror installed), context store,
//! action registry, executor, background task runner, message channel, and
//! the model bridge. The orchestrator drives the render → complete → parse →
//! execute loop, bounded by a maximum number of consecutive tool-call turns.

pub mod orchestrator;
pub mod parser;
pub mod profile;
pub mod prompt;

pub use orchestrator::{AgentRuntime, InteractionOutcome, InteractionStep};
pub use parser::{parse_action_calls, ActionCall, ParsedCalls};
pub use profile::AgentProfile;

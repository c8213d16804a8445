//! Context timeline
//!
//! The context timeline is the append-mostly log of conversation and
//! window-reference entries that drives model input. Two views live under
//! one lock: `active` (the prunable subset rendered into the prompt) and
//! `archive` (the complete, id-indexed history kept for the agent's
//! lifetime).
//!
//! The [`pruner`] is a pure algorithm deciding which active entries to evict
//! under a token budget; [`TimelineMirror`] subscribes to window directory
//! events and mirrors every window lifecycle change into the timeline.

pub mod item;
pub mod mirror;
pub mod pruner;
pub mod store;

pub use item::{estimate_tokens, ContextItem, ContextItemKind};
pub use mirror::TimelineMirror;
pub use pruner::{prune_plan, PrunePlan, WindowCost};
pub use store::{ContextStore, PruneReport};

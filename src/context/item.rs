//! Context timeline entries

use serde::{Deserialize, Serialize};

/// The type of a timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextItemKind {
    /// System-originated note (wakeup triggers, action reports).
    System,
    /// A user turn.
    User,
    /// An assistant turn.
    Assistant,
    /// A reference to a live window; `content` holds the window id.
    WindowRef,
}

impl ContextItemKind {
    /// Whether this kind counts as conversation for pruning protection.
    pub fn is_conversation(&self) -> bool {
        matches!(self, ContextItemKind::User | ContextItemKind::Assistant)
    }
}

/// One entry in the context timeline.
///
/// The sequence number is assigned once by the store and never changes;
/// only the `obsolete` flag and the cached token estimate are mutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    /// Unique identifier, derived from the sequence number.
    pub id: String,
    /// Entry type.
    pub kind: ContextItemKind,
    /// Clock sequence, assigned once at insertion.
    pub seq: u64,
    /// Literal text, or a window id for window references.
    pub content: String,
    /// Retired entries render nothing but stay archived.
    pub obsolete: bool,
    /// Cached token estimate. Window references start at 0 and are
    /// recomputed at render time.
    pub token_estimate: u32,
}

impl ContextItem {
    /// Whether this entry references the given window.
    pub fn references_window(&self, window_id: &str) -> bool {
        self.kind == ContextItemKind::WindowRef && self.content == window_id
    }
}

/// Estimate the token cost of a piece of text.
///
/// Uses the heuristic of roughly 2.5 characters per token, rounded up.
///
/// # Example
/// ```
/// use casement::context::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("abcde"), 2);
/// assert_eq!(estimate_tokens("abcdef"), 3);
/// ```
pub fn estimate_tokens(text: &str) -> u32 {
    // ceil(len / 2.5) in integer arithmetic
    let len = text.len() as u64;
    ((len * 2 + 4) / 5) as u32
}

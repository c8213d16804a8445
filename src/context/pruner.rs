//! Context pruner
//!
//! A pure function deciding which active timeline entries to evict under a
//! token budget. The policy is two-round, oldest-first, conversation-
//! protected and importance-tiered:
//!
//! 1. Compute per-item cost. Window references are re-rendered through the
//!    caller-supplied resolver; everything else reuses its stored estimate.
//! 2. Stop if the total already fits the budget.
//! 3. Round one, oldest-first: evict conversation items only while the
//!    remaining conversation tokens stay at or above the protected minimum;
//!    evict window items only if neither important nor pinned. Stop once the
//!    total reaches the prune target.
//! 4. Round two, oldest-first, only if still above target: evict important
//!    non-pinned windows.
//!
//! Pinned windows and system notes are never evicted.

use crate::context::item::{ContextItem, ContextItemKind};

/// Live render cost and eviction flags for one window, as seen by the pruner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCost {
    /// Tokens the window currently renders to.
    pub tokens: u32,
    /// Pinned windows are never evicted.
    pub pinned: bool,
    /// Important windows are evicted only in round two.
    pub important: bool,
}

/// The pruner's decision for one invocation.
#[derive(Debug, Clone, Default)]
pub struct PrunePlan {
    /// Ids of active entries to evict, in eviction order.
    pub evict: Vec<String>,
    /// Total active tokens before eviction.
    pub total_before: i64,
    /// Total active tokens after applying the plan.
    pub total_after: i64,
}

impl PrunePlan {
    /// Whether the plan evicts nothing.
    pub fn is_empty(&self) -> bool {
        self.evict.is_empty()
    }
}

/// Compute an eviction plan for the given active view.
///
/// `items` must be in timeline order (oldest first). `resolve` maps a window
/// id to its live render cost; returning `None` (window gone) costs zero.
/// A `max_tokens <= 0` budget disables pruning. A `prune_target_tokens <= 0`
/// target defaults to `max(1, max_tokens / 2)`; `min_conversation_tokens` is
/// clamped to `[0, target]`.
pub fn prune_plan(
    items: &[ContextItem],
    resolve: impl Fn(&str) -> Option<WindowCost>,
    max_tokens: i64,
    min_conversation_tokens: i64,
    prune_target_tokens: i64,
) -> PrunePlan {
    if max_tokens <= 0 {
        return PrunePlan::default();
    }
    let target = if prune_target_tokens <= 0 {
        (max_tokens / 2).max(1)
    } else {
        prune_target_tokens
    };
    let min_conversation = min_conversation_tokens.clamp(0, target);

    // Per-item cost; obsolete entries render nothing.
    let costs: Vec<(i64, Option<WindowCost>)> = items
        .iter()
        .map(|item| {
            if item.obsolete {
                (0, None)
            } else if item.kind == ContextItemKind::WindowRef {
                let cost = resolve(&item.content);
                (cost.map(|c| c.tokens as i64).unwrap_or(0), cost)
            } else {
                (item.token_estimate as i64, None)
            }
        })
        .collect();

    let total_before: i64 = costs.iter().map(|(t, _)| t).sum();
    if total_before <= max_tokens {
        return PrunePlan {
            evict: Vec::new(),
            total_before,
            total_after: total_before,
        };
    }

    let mut conversation_tokens: i64 = items
        .iter()
        .zip(costs.iter())
        .filter(|(item, _)| item.kind.is_conversation())
        .map(|(_, (tokens, _))| tokens)
        .sum();

    let mut total = total_before;
    let mut evicted = vec![false; items.len()];
    let mut evict = Vec::new();

    // Round one: conversation above the protected floor, and windows that
    // are neither important nor pinned.
    for (idx, item) in items.iter().enumerate() {
        if total <= target {
            break;
        }
        let (tokens, window) = costs[idx];
        match item.kind {
            ContextItemKind::User | ContextItemKind::Assistant => {
                if conversation_tokens - tokens >= min_conversation {
                    conversation_tokens -= tokens;
                    total -= tokens;
                    evicted[idx] = true;
                    evict.push(item.id.clone());
                }
            }
            ContextItemKind::WindowRef => {
                let (important, pinned) = window
                    .map(|c| (c.important, c.pinned))
                    .unwrap_or((false, false));
                if !important && !pinned {
                    total -= tokens;
                    evicted[idx] = true;
                    evict.push(item.id.clone());
                }
            }
            ContextItemKind::System => {}
        }
    }

    // Round two: important windows, still oldest-first. Pinned stays.
    if total > target {
        for (idx, item) in items.iter().enumerate() {
            if total <= target {
                break;
            }
            if evicted[idx] || item.kind != ContextItemKind::WindowRef {
                continue;
            }
            let (tokens, window) = costs[idx];
            let (important, pinned) = window
                .map(|c| (c.important, c.pinned))
                .unwrap_or((false, false));
            if important && !pinned {
                total -= tokens;
                evicted[idx] = true;
                evict.push(item.id.clone());
            }
        }
    }

    PrunePlan {
        evict,
        total_before,
        total_after: total,
    }
}

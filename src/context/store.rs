//! Context timeline store
//!
//! Two views under one lock: `active` (prunable, rendered into the prompt)
//! and `archive` (complete, id-indexed, never deleted). Entries are assigned
//! a clock sequence on insertion and keep it forever; only the obsolete flag
//! and cached token estimate mutate afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::clock::LogicalClock;
use crate::context::item::{estimate_tokens, ContextItem, ContextItemKind};
use crate::context::pruner::{prune_plan, PrunePlan, WindowCost};

/// Result of one prune pass.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    /// Ids physically removed from the active view.
    pub evicted: Vec<String>,
    /// Active tokens before the pass.
    pub total_before: i64,
    /// Active tokens after the pass.
    pub total_after: i64,
}

struct StoreInner {
    /// Complete history in insertion order. Never shrinks.
    archive: Vec<ContextItem>,
    /// Id → archive index.
    index: HashMap<String, usize>,
    /// Ids of archive entries currently in the active view, in order.
    active: Vec<String>,
}

/// Append-mostly log of context entries tagged with clock sequence.
///
/// Uses a `std::sync::Mutex` internally; critical sections are short and
/// never held across an await point, so rendering paths may read while
/// gate-protected mutation runs elsewhere.
pub struct ContextStore {
    clock: Arc<LogicalClock>,
    inner: Mutex<StoreInner>,
}

impl ContextStore {
    /// Create a new empty store drawing sequence numbers from `clock`.
    pub fn new(clock: Arc<LogicalClock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(StoreInner {
                archive: Vec::new(),
                index: HashMap::new(),
                active: Vec::new(),
            }),
        }
    }

    /// Append an entry to both views, assigning the next clock value.
    ///
    /// Non-window entries get a token estimate from their content; window
    /// references start at 0 and are recomputed at render. Inserting a
    /// window reference retires (marks obsolete) any existing active
    /// reference to the same window; at most one stays live per window id.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use casement::clock::LogicalClock;
    /// use casement::context::{ContextItemKind, ContextStore};
    ///
    /// let store = ContextStore::new(Arc::new(LogicalClock::new()));
    /// let item = store.add(ContextItemKind::User, "hello");
    /// assert_eq!(item.seq, 1);
    /// assert!(item.token_estimate > 0);
    /// ```
    pub fn add(&self, kind: ContextItemKind, content: &str) -> ContextItem {
        let seq = self.clock.next();
        let item = ContextItem {
            id: format!("item-{}", seq),
            kind,
            seq,
            content: content.to_string(),
            obsolete: false,
            token_estimate: if kind == ContextItemKind::WindowRef {
                0
            } else {
                estimate_tokens(content)
            },
        };

        let mut inner = self.inner.lock().expect("context store lock poisoned");
        if kind == ContextItemKind::WindowRef {
            // Retire the prior live reference, if any. The invariant keeps
            // at most one non-obsolete reference per window id, so a single
            // match suffices.
            let prior = inner
                .active
                .iter()
                .filter_map(|id| inner.index.get(id).copied())
                .find(|&idx| {
                    let it = &inner.archive[idx];
                    !it.obsolete && it.references_window(content)
                });
            if let Some(idx) = prior {
                inner.archive[idx].obsolete = true;
            }
        }
        let idx = inner.archive.len();
        inner.index.insert(item.id.clone(), idx);
        inner.active.push(item.id.clone());
        inner.archive.push(item.clone());
        item
    }

    /// Flag every active entry referencing `window_id` as obsolete.
    pub fn mark_window_obsolete(&self, window_id: &str) {
        let mut inner = self.inner.lock().expect("context store lock poisoned");
        let indices: Vec<usize> = inner
            .active
            .iter()
            .filter_map(|id| inner.index.get(id).copied())
            .filter(|&idx| inner.archive[idx].references_window(window_id))
            .collect();
        for idx in indices {
            inner.archive[idx].obsolete = true;
        }
    }

    /// Snapshot of the active view, in timeline order.
    pub fn active_items(&self) -> Vec<ContextItem> {
        let inner = self.inner.lock().expect("context store lock poisoned");
        inner
            .active
            .iter()
            .filter_map(|id| inner.index.get(id).map(|&idx| inner.archive[idx].clone()))
            .collect()
    }

    /// Snapshot of the complete archive, in insertion order.
    pub fn archive_items(&self) -> Vec<ContextItem> {
        let inner = self.inner.lock().expect("context store lock poisoned");
        inner.archive.clone()
    }

    /// Ids currently in the active view.
    pub fn active_ids(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("context store lock poisoned");
        inner.active.clone()
    }

    /// Number of active entries.
    pub fn active_len(&self) -> usize {
        self.inner
            .lock()
            .expect("context store lock poisoned")
            .active
            .len()
    }

    /// Update the cached token estimate of an entry (both views share it).
    pub fn set_token_estimate(&self, id: &str, tokens: u32) {
        let mut inner = self.inner.lock().expect("context store lock poisoned");
        if let Some(&idx) = inner.index.get(id) {
            inner.archive[idx].token_estimate = tokens;
        }
    }

    /// Run the pruner and remove the chosen entries from the active view.
    ///
    /// The archive is untouched; pruned entries stay queryable forever.
    pub fn prune(
        &self,
        resolve: impl Fn(&str) -> Option<WindowCost>,
        max_tokens: i64,
        min_conversation_tokens: i64,
        prune_target_tokens: i64,
    ) -> PruneReport {
        let plan: PrunePlan = {
            let items = self.active_items();
            prune_plan(
                &items,
                resolve,
                max_tokens,
                min_conversation_tokens,
                prune_target_tokens,
            )
        };
        if !plan.is_empty() {
            let mut inner = self.inner.lock().expect("context store lock poisoned");
            inner.active.retain(|id| !plan.evict.contains(id));
            debug!(
                evicted = plan.evict.len(),
                before = plan.total_before,
                after = plan.total_after,
                "Pruned context timeline"
            );
        }
        PruneReport {
            evicted: plan.evict,
            total_before: plan.total_before,
            total_after: plan.total_after,
        }
    }

    /// Replace the store's contents during snapshot import.
    ///
    /// `archive` must be in insertion order; `active_ids` selects the active
    /// subset exactly as it was at export time. Pruned-but-archived entries
    /// never resurrect into the active view.
    pub fn restore(&self, archive: Vec<ContextItem>, active_ids: Vec<String>) {
        let mut inner = self.inner.lock().expect("context store lock poisoned");
        inner.index = archive
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.id.clone(), idx))
            .collect();
        let active: Vec<String> = active_ids
            .into_iter()
            .filter(|id| inner.index.contains_key(id))
            .collect();
        inner.active = active;
        inner.archive = archive;
    }
}

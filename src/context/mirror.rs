//! Directory-to-timeline mirroring
//!
//! [`TimelineMirror`] subscribes to window directory events and keeps the
//! context timeline in step with window lifecycle: creations and append-mode
//! refreshes insert window references (retiring stale ones), removals flag
//! every reference obsolete. In-place refreshes insert nothing; the live
//! content is re-rendered through the existing reference at prompt time.

use std::sync::Arc;

use crate::context::item::ContextItemKind;
use crate::context::store::ContextStore;
use crate::window::directory::{WindowEvent, WindowEventKind, WindowObserver};
use crate::window::types::RefreshMode;

/// The timeline store's subscription to window directory events.
pub struct TimelineMirror {
    store: Arc<ContextStore>,
}

impl TimelineMirror {
    /// Create a mirror feeding the given store.
    pub fn new(store: Arc<ContextStore>) -> Self {
        Self { store }
    }
}

impl WindowObserver for TimelineMirror {
    fn on_window_event(&self, event: &WindowEvent) {
        match event.kind {
            WindowEventKind::Created => {
                self.store.add(ContextItemKind::WindowRef, &event.window_id);
            }
            WindowEventKind::Updated => {
                if event.options.refresh_mode == RefreshMode::Append {
                    self.store.add(ContextItemKind::WindowRef, &event.window_id);
                }
            }
            WindowEventKind::Removed => {
                self.store.mark_window_obsolete(&event.window_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::LogicalClock;
    use crate::window::directory::WindowDirectory;
    use crate::window::types::{Window, WindowOptions};

    fn wired() -> (Arc<WindowDirectory>, Arc<ContextStore>) {
        let clock = Arc::new(LogicalClock::new());
        let directory = Arc::new(WindowDirectory::new(Arc::clone(&clock)));
        let store = Arc::new(ContextStore::new(clock));
        directory.add_observer(Arc::new(TimelineMirror::new(Arc::clone(&store))));
        (directory, store)
    }

    #[test]
    fn test_created_mirrors_window_ref() {
        let (directory, store) = wired();
        directory.add(Window::new("w1", "T", "C"));

        let active = store.active_items();
        assert_eq!(active.len(), 1);
        assert!(active[0].references_window("w1"));
        assert!(!active[0].obsolete);
    }

    #[test]
    fn test_append_refresh_retires_prior_ref() {
        let (directory, store) = wired();
        directory.add(Window::new("w1", "T", "C"));
        directory.notify_updated("w1");

        let active = store.active_items();
        assert_eq!(active.len(), 2);
        let live: Vec<_> = active.iter().filter(|i| !i.obsolete).collect();
        assert_eq!(live.len(), 1);
        assert!(live[0].seq > active[0].seq || !active[0].obsolete);
    }

    #[test]
    fn test_in_place_refresh_adds_nothing() {
        let (directory, store) = wired();
        directory.add(
            Window::new("w1", "T", "C")
                .with_options(WindowOptions::new().refresh(crate::window::RefreshMode::InPlace)),
        );
        directory.update_content("w1", "new content");

        let active = store.active_items();
        assert_eq!(active.len(), 1);
        assert!(!active[0].obsolete);
    }

    #[test]
    fn test_removed_marks_obsolete() {
        let (directory, store) = wired();
        directory.add(Window::new("w1", "T", "C"));
        directory.remove("w1");

        let active = store.active_items();
        assert_eq!(active.len(), 1);
        assert!(active[0].obsolete);
    }
}

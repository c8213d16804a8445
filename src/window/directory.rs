//! Window directory
//!
//! The [`WindowDirectory`] owns every live window for one agent. All
//! mutation flows through directory operations, which stamp metadata from
//! the logical clock and deliver a typed [`WindowEvent`] to every registered
//! observer after the map mutation completes. The context timeline mirror is
//! one such observer; applications may register others.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::clock::LogicalClock;
use crate::window::types::{Window, WindowOptions};

/// The kind of a window lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEventKind {
    /// The window was added to the directory.
    Created,
    /// The window's content or metadata changed.
    Updated,
    /// The window was removed from the directory.
    Removed,
}

/// A typed window lifecycle event.
///
/// Carries a snapshot of the window's options so observers can act on
/// refresh mode and eviction flags without re-reading the directory (the
/// window may already be gone for `Removed` events).
#[derive(Debug, Clone)]
pub struct WindowEvent {
    /// What happened.
    pub kind: WindowEventKind,
    /// The affected window id.
    pub window_id: String,
    /// Clock value stamped on the change.
    pub seq: u64,
    /// Options of the window at event time.
    pub options: WindowOptions,
}

/// Observer of window lifecycle events.
///
/// Observers are invoked synchronously, outside the directory's internal
/// lock, in registration order.
pub trait WindowObserver: Send + Sync {
    /// React to a window lifecycle event.
    fn on_window_event(&self, event: &WindowEvent);
}

/// Id-to-window map plus a change-notification stream.
///
/// Uses a `std::sync::RwLock` internally: critical sections are short and
/// never held across an await point, so rendering paths can read
/// concurrently with gate-protected mutation during a long-running task.
pub struct WindowDirectory {
    clock: Arc<LogicalClock>,
    windows: RwLock<HashMap<String, Window>>,
    observers: RwLock<Vec<Arc<dyn WindowObserver>>>,
}

impl WindowDirectory {
    /// Create a new empty directory stamping events from `clock`.
    pub fn new(clock: Arc<LogicalClock>) -> Self {
        Self {
            clock,
            windows: RwLock::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer for lifecycle events.
    pub fn add_observer(&self, observer: Arc<dyn WindowObserver>) {
        self.observers
            .write()
            .expect("window observer lock poisoned")
            .push(observer);
    }

    /// Add a window, stamping created/updated metadata with the current
    /// clock value and firing `Created`.
    ///
    /// Replaces any existing window with the same id; the timeline mirror's
    /// retire-on-insert rule keeps the context consistent in that case.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use casement::clock::LogicalClock;
    /// use casement::window::{Window, WindowDirectory};
    ///
    /// let dir = WindowDirectory::new(Arc::new(LogicalClock::new()));
    /// let seq = dir.add(Window::new("w1", "Title", "Body"));
    /// assert!(seq > 0);
    /// assert!(dir.contains("w1"));
    /// ```
    pub fn add(&self, mut window: Window) -> u64 {
        let seq = self.clock.next();
        window.created_seq = seq;
        window.updated_seq = seq;
        let event = WindowEvent {
            kind: WindowEventKind::Created,
            window_id: window.id.clone(),
            seq,
            options: window.options.clone(),
        };
        {
            let mut windows = self.windows.write().expect("window map lock poisoned");
            windows.insert(window.id.clone(), window);
        }
        debug!(window_id = %event.window_id, seq, "Window created");
        self.notify(&event);
        seq
    }

    /// Remove a window. Fires `Removed` only if it was present.
    pub fn remove(&self, id: &str) -> Option<Window> {
        let removed = {
            let mut windows = self.windows.write().expect("window map lock poisoned");
            windows.remove(id)
        };
        if let Some(window) = &removed {
            let event = WindowEvent {
                kind: WindowEventKind::Removed,
                window_id: id.to_string(),
                seq: self.clock.next(),
                options: window.options.clone(),
            };
            debug!(window_id = %id, "Window removed");
            self.notify(&event);
        }
        removed
    }

    /// Get a clone of a window by id.
    pub fn get(&self, id: &str) -> Option<Window> {
        self.windows
            .read()
            .expect("window map lock poisoned")
            .get(id)
            .cloned()
    }

    /// Whether a window with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.windows
            .read()
            .expect("window map lock poisoned")
            .contains_key(id)
    }

    /// Ids of all live windows, sorted for deterministic iteration.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .windows
            .read()
            .expect("window map lock poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Number of live windows.
    pub fn len(&self) -> usize {
        self.windows.read().expect("window map lock poisoned").len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bump the updated stamp and fire `Updated`.
    ///
    /// Used by explicit refresh and by the executor after a handler requests
    /// a refresh. Returns `false` if the window does not exist.
    pub fn notify_updated(&self, id: &str) -> bool {
        let event = {
            let mut windows = self.windows.write().expect("window map lock poisoned");
            match windows.get_mut(id) {
                Some(window) => {
                    let seq = self.clock.next();
                    window.updated_seq = seq;
                    Some(WindowEvent {
                        kind: WindowEventKind::Updated,
                        window_id: id.to_string(),
                        seq,
                        options: window.options.clone(),
                    })
                }
                None => None,
            }
        };
        match event {
            Some(event) => {
                self.notify(&event);
                true
            }
            None => false,
        }
    }

    /// Replace a window's content, bump its updated stamp and fire `Updated`.
    pub fn update_content(&self, id: &str, content: &str) -> bool {
        let event = {
            let mut windows = self.windows.write().expect("window map lock poisoned");
            match windows.get_mut(id) {
                Some(window) => {
                    let seq = self.clock.next();
                    window.content = content.to_string();
                    window.updated_seq = seq;
                    Some(WindowEvent {
                        kind: WindowEventKind::Updated,
                        window_id: id.to_string(),
                        seq,
                        options: window.options.clone(),
                    })
                }
                None => None,
            }
        };
        match event {
            Some(event) => {
                self.notify(&event);
                true
            }
            None => false,
        }
    }

    /// Snapshot of every live window, sorted by id.
    pub fn windows(&self) -> Vec<Window> {
        let mut windows: Vec<Window> = self
            .windows
            .read()
            .expect("window map lock poisoned")
            .values()
            .cloned()
            .collect();
        windows.sort_by(|a, b| a.id.cmp(&b.id));
        windows
    }

    /// Replace the directory's contents during snapshot import.
    ///
    /// Stamps are kept as given and no events fire; the restored timeline
    /// already carries the matching window references.
    pub fn restore(&self, windows: Vec<Window>) {
        let mut map = self.windows.write().expect("window map lock poisoned");
        map.clear();
        for window in windows {
            map.insert(window.id.clone(), window);
        }
    }

    /// Re-bind a handler after snapshot import (handlers do not serialize).
    /// Returns `false` if the window does not exist.
    pub fn bind_handler(&self, id: &str, handler: Arc<dyn crate::window::types::WindowHandler>) -> bool {
        let mut windows = self.windows.write().expect("window map lock poisoned");
        match windows.get_mut(id) {
            Some(window) => {
                window.handler = Some(handler);
                true
            }
            None => false,
        }
    }

    /// Cache a token estimate computed at render time. No event fires.
    pub fn set_token_estimate(&self, id: &str, tokens: u32) {
        let mut windows = self.windows.write().expect("window map lock poisoned");
        if let Some(window) = windows.get_mut(id) {
            window.token_estimate = tokens;
        }
    }

    fn notify(&self, event: &WindowEvent) {
        let observers: Vec<Arc<dyn WindowObserver>> = self
            .observers
            .read()
            .expect("window observer lock poisoned")
            .clone();
        for observer in observers {
            observer.on_window_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        events: Mutex<Vec<(WindowEventKind, String, u64)>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        fn events(&self) -> Vec<(WindowEventKind, String, u64)> {
            self.events.lock().unwrap().clone()
        }
    }

    impl WindowObserver for Recorder {
        fn on_window_event(&self, event: &WindowEvent) {
            self.events.lock().unwrap().push((
                event.kind,
                event.window_id.clone(),
                event.seq,
            ));
        }
    }

    fn directory() -> (WindowDirectory, Arc<Recorder>) {
        let dir = WindowDirectory::new(Arc::new(LogicalClock::new()));
        let recorder = Arc::new(Recorder::new());
        dir.add_observer(recorder.clone());
        (dir, recorder)
    }

    #[test]
    fn test_add_stamps_metadata_and_fires_created() {
        let (dir, recorder) = directory();
        let seq = dir.add(Window::new("w1", "T", "C"));

        let w = dir.get("w1").unwrap();
        assert_eq!(w.created_seq, seq);
        assert_eq!(w.updated_seq, seq);

        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], (WindowEventKind::Created, "w1".to_string(), seq));
    }

    #[test]
    fn test_remove_fires_only_if_present() {
        let (dir, recorder) = directory();
        dir.add(Window::new("w1", "T", "C"));

        assert!(dir.remove("w1").is_some());
        assert!(dir.remove("w1").is_none());
        assert!(dir.remove("missing").is_none());

        let kinds: Vec<WindowEventKind> = recorder.events().iter().map(|e| e.0).collect();
        assert_eq!(kinds, vec![WindowEventKind::Created, WindowEventKind::Removed]);
    }

    #[test]
    fn test_notify_updated_bumps_stamp() {
        let (dir, recorder) = directory();
        let created = dir.add(Window::new("w1", "T", "C"));

        assert!(dir.notify_updated("w1"));
        let w = dir.get("w1").unwrap();
        assert!(w.updated_seq > created);
        assert_eq!(w.created_seq, created);

        assert!(!dir.notify_updated("missing"));
        assert_eq!(recorder.events().len(), 2);
    }

    #[test]
    fn test_update_content() {
        let (dir, _) = directory();
        dir.add(Window::new("w1", "T", "old"));
        assert!(dir.update_content("w1", "new"));
        assert_eq!(dir.get("w1").unwrap().content, "new");
        assert!(!dir.update_content("missing", "x"));
    }

    #[test]
    fn test_ids_sorted_and_len() {
        let (dir, _) = directory();
        assert!(dir.is_empty());
        dir.add(Window::new("b", "T", "C"));
        dir.add(Window::new("a", "T", "C"));
        assert_eq!(dir.ids(), vec!["a", "b"]);
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn test_set_token_estimate_silent() {
        let (dir, recorder) = directory();
        dir.add(Window::new("w1", "T", "C"));
        dir.set_token_estimate("w1", 42);
        assert_eq!(dir.get("w1").unwrap().token_estimate, 42);
        // No Updated event for token caching.
        assert_eq!(recorder.events().len(), 1);
    }

    #[test]
    fn test_windows_sorted_and_restore_fires_nothing() {
        let (dir, recorder) = directory();
        dir.add(Window::new("b", "T", "C"));
        dir.add(Window::new("a", "T", "C"));
        let snapshot = dir.windows();
        assert_eq!(snapshot[0].id, "a");
        assert_eq!(snapshot[1].id, "b");
        assert!(snapshot[0].created_seq > 0);

        let other = WindowDirectory::new(Arc::new(LogicalClock::new()));
        let other_recorder = Arc::new(Recorder::new());
        other.add_observer(other_recorder.clone());
        other.restore(snapshot.clone());
        assert_eq!(other.len(), 2);
        assert_eq!(
            other.get("b").unwrap().created_seq,
            snapshot[1].created_seq
        );
        assert!(other_recorder.events().is_empty());
        // Restore replaced, not merged.
        let _ = recorder;
    }

    #[test]
    fn test_bind_handler_after_restore() {
        use crate::actions::ActionOutcome;
        use async_trait::async_trait;

        struct Nop;

        #[async_trait]
        impl crate::window::types::WindowHandler for Nop {
            async fn handle(
                &self,
                _action_id: &str,
                _params: &serde_json::Value,
            ) -> anyhow::Result<ActionOutcome> {
                Ok(ActionOutcome::ok("ok"))
            }
        }

        let (dir, _) = directory();
        dir.add(Window::new("w1", "T", "C"));
        assert!(dir.get("w1").unwrap().handler.is_none());
        assert!(dir.bind_handler("w1", Arc::new(Nop)));
        assert!(dir.get("w1").unwrap().handler.is_some());
        assert!(!dir.bind_handler("missing", Arc::new(Nop)));
    }

    #[test]
    fn test_add_replaces_existing() {
        let (dir, recorder) = directory();
        dir.add(Window::new("w1", "T", "first"));
        dir.add(Window::new("w1", "T", "second"));
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.get("w1").unwrap().content, "second");
        let kinds: Vec<WindowEventKind> = recorder.events().iter().map(|e| e.0).collect();
        assert_eq!(kinds, vec![WindowEventKind::Created, WindowEventKind::Created]);
    }
}

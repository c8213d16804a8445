//! Background task runner
//!
//! Fire-and-forget actions execute here, outside the turn loop. Each task
//! gets a [`CancellationToken`]; the runner publishes lifecycle events
//! (`Started`, then exactly one of `Completed`, `Canceled`, `Failed`) on a
//! broadcast channel. The registry entry is removed *before* the terminal
//! event publishes, so an event listener never observes a finished task as
//! still registered.
//!
//! Task bodies must re-acquire their owning agent's gate before touching
//! shared state; the runner itself imposes no ordering between tasks.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CasementError, Result};

const EVENT_BUFFER: usize = 64;

/// Lifecycle stage of a background task event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEventKind {
    /// The task was registered and its body spawned.
    Started,
    /// The body finished successfully.
    Completed,
    /// The body observed cancellation.
    Canceled,
    /// The body faulted; the message carries the fault text.
    Failed,
}

/// A background task lifecycle event.
#[derive(Debug, Clone)]
pub struct TaskEvent {
    /// Lifecycle stage.
    pub kind: TaskEventKind,
    /// The task id.
    pub task_id: String,
    /// The window the task was started for.
    pub window_id: String,
    /// Completion message or fault text, when applicable.
    pub message: Option<String>,
}

struct TaskHandle {
    window_id: String,
    token: CancellationToken,
}

/// Keyed registry of in-flight background tasks.
pub struct TaskRunner {
    tasks: Arc<Mutex<HashMap<String, TaskHandle>>>,
    events: broadcast::Sender<TaskEvent>,
}

impl TaskRunner {
    /// Create an empty runner.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Subscribe to task lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    /// Start a background task.
    ///
    /// Assigns a fresh task id when `task_id` is `None`; rejects duplicates.
    /// The body receives a [`CancellationToken`] and should check it at its
    /// own suspension points; the runner additionally races the body against
    /// the token so a stuck body still terminates as `Canceled`.
    ///
    /// Returns the task id immediately; only the runner awaits completion.
    pub fn start<F, Fut>(&self, task_id: Option<String>, window_id: &str, body: F) -> Result<String>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        let id = task_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let token = CancellationToken::new();
        {
            let mut tasks = self.tasks.lock().expect("task registry lock poisoned");
            if tasks.contains_key(&id) {
                return Err(CasementError::Task(format!(
                    "Task '{}' is already running",
                    id
                )));
            }
            tasks.insert(
                id.clone(),
                TaskHandle {
                    window_id: window_id.to_string(),
                    token: token.clone(),
                },
            );
        }

        self.publish(TaskEvent {
            kind: TaskEventKind::Started,
            task_id: id.clone(),
            window_id: window_id.to_string(),
            message: None,
        });
        debug!(task_id = %id, window_id, "Background task started");

        let fut = body(token.clone());
        let tasks = Arc::clone(&self.tasks);
        let events = self.events.clone();
        let task_id_owned = id.clone();
        let window_id_owned = window_id.to_string();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => None,
                result = fut => Some(result),
            };
            // Remove the registry entry before the terminal event publishes.
            tasks
                .lock()
                .expect("task registry lock poisoned")
                .remove(&task_id_owned);
            let event = match outcome {
                None => {
                    info!(task_id = %task_id_owned, "Background task canceled");
                    TaskEvent {
                        kind: TaskEventKind::Canceled,
                        task_id: task_id_owned,
                        window_id: window_id_owned,
                        message: None,
                    }
                }
                Some(Ok(message)) => TaskEvent {
                    kind: TaskEventKind::Completed,
                    task_id: task_id_owned,
                    window_id: window_id_owned,
                    message: Some(message),
                },
                Some(Err(fault)) => {
                    warn!(task_id = %task_id_owned, error = %fault, "Background task failed");
                    TaskEvent {
                        kind: TaskEventKind::Failed,
                        task_id: task_id_owned,
                        window_id: window_id_owned,
                        message: Some(format!("{:#}", fault)),
                    }
                }
            };
            let _ = events.send(event);
        });

        Ok(id)
    }

    /// Signal cancellation of a live task. Returns `false` if unknown.
    pub fn cancel(&self, task_id: &str) -> bool {
        let tasks = self.tasks.lock().expect("task registry lock poisoned");
        match tasks.get(task_id) {
            Some(handle) => {
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every outstanding task.
    pub fn cancel_all(&self) {
        let tasks = self.tasks.lock().expect("task registry lock poisoned");
        for handle in tasks.values() {
            handle.token.cancel();
        }
    }

    /// Whether a task is still registered.
    pub fn is_running(&self, task_id: &str) -> bool {
        self.tasks
            .lock()
            .expect("task registry lock poisoned")
            .contains_key(task_id)
    }

    /// Number of in-flight tasks.
    pub fn len(&self) -> usize {
        self.tasks.lock().expect("task registry lock poisoned").len()
    }

    /// Whether no tasks are in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The window a task was started for, if still in flight.
    pub fn window_of(&self, task_id: &str) -> Option<String> {
        self.tasks
            .lock()
            .expect("task registry lock poisoned")
            .get(task_id)
            .map(|h| h.window_id.clone())
    }

    fn publish(&self, event: TaskEvent) {
        let _ = self.events.send(event);
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

//! Session snapshots
//!
//! A snapshot captures everything serializable about a session's agents:
//! clock value, the full context archive with active membership, and the
//! live windows (minus their handlers, which are code). Import restores the
//! active view exactly as exported; pruned-but-archived entries never
//! resurrect. Handlers must be re-bound by the application afterwards via
//! [`crate::window::WindowDirectory::bind_handler`].

use serde::{Deserialize, Serialize};

use crate::context::ContextItem;
use crate::window::{Window, WindowOptions};

/// Serializable form of one window. Handlers are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSnapshot {
    /// Window id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Content at export time.
    pub content: String,
    /// Visible action namespaces, in declaration order.
    pub namespaces: Vec<String>,
    /// Display and lifecycle options.
    pub options: WindowOptions,
    /// Creation stamp.
    pub created_seq: u64,
    /// Last-update stamp.
    pub updated_seq: u64,
    /// Cached token estimate.
    pub token_estimate: u32,
}

impl From<&Window> for WindowSnapshot {
    fn from(window: &Window) -> Self {
        Self {
            id: window.id.clone(),
            title: window.title.clone(),
            content: window.content.clone(),
            namespaces: window.namespaces.clone(),
            options: window.options.clone(),
            created_seq: window.created_seq,
            updated_seq: window.updated_seq,
            token_estimate: window.token_estimate,
        }
    }
}

impl From<WindowSnapshot> for Window {
    fn from(snapshot: WindowSnapshot) -> Self {
        Window {
            id: snapshot.id,
            title: snapshot.title,
            content: snapshot.content,
            namespaces: snapshot.namespaces,
            options: snapshot.options,
            created_seq: snapshot.created_seq,
            updated_seq: snapshot.updated_seq,
            token_estimate: snapshot.token_estimate,
            handler: None,
        }
    }
}

/// Serializable state of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// The agent's id within the session.
    pub agent_id: String,
    /// Logical clock value at export time.
    pub clock: u64,
    /// Complete context archive, in insertion order.
    pub archive: Vec<ContextItem>,
    /// Ids of the entries that were active at export time.
    pub active_ids: Vec<String>,
    /// Live windows at export time.
    pub windows: Vec<WindowSnapshot>,
}

/// Serializable state of a whole session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// One snapshot per registered agent.
    pub agents: Vec<AgentSnapshot>,
}

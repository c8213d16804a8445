//! Scoped message channels
//!
//! Each agent owns one [`AgentChannel`]: a log of named-channel messages
//! plus a forwarder hook the session installs at registration. Agent-scoped
//! posts stay local; session-scoped posts additionally reach the forwarder,
//! which queues mailbox deliveries and wakeups for the other agents.

use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Visibility of a channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageScope {
    /// Visible only to the posting agent's own log.
    #[default]
    Agent,
    /// Bridged to other agents in the session.
    Session,
}

/// A message on a named channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Channel name, e.g. `"findings"`.
    pub channel: String,
    /// Message text.
    pub payload: String,
    /// Id of the posting agent.
    pub from_agent: String,
    /// Explicit recipients; empty means every other agent in the session.
    pub to_agents: Vec<String>,
    /// Wall-clock post time.
    pub timestamp: DateTime<Utc>,
    /// Whether the message is bridged across the session.
    pub scope: MessageScope,
}

impl ChannelMessage {
    /// Create an agent-scoped message.
    pub fn new(channel: &str, payload: &str, from_agent: &str) -> Self {
        Self {
            channel: channel.to_string(),
            payload: payload.to_string(),
            from_agent: from_agent.to_string(),
            to_agents: Vec::new(),
            timestamp: Utc::now(),
            scope: MessageScope::Agent,
        }
    }

    /// Mark the message session-scoped so the forwarder bridges it.
    pub fn session_scoped(mut self) -> Self {
        self.scope = MessageScope::Session;
        self
    }

    /// Address an explicit recipient. May be chained for several.
    pub fn to(mut self, agent_id: &str) -> Self {
        self.to_agents.push(agent_id.to_string());
        self
    }

    /// One-line rendering used in wakeup trigger notes.
    pub fn describe(&self) -> String {
        format!("[{}] {}: {}", self.channel, self.from_agent, self.payload)
    }
}

/// Hook invoked for every session-scoped post.
pub type Forwarder = dyn Fn(&ChannelMessage) + Send + Sync;

/// One agent's channel endpoint.
pub struct AgentChannel {
    agent_id: String,
    log: Mutex<Vec<ChannelMessage>>,
    forwarder: RwLock<Option<Arc<Forwarder>>>,
}

impl AgentChannel {
    /// Create a channel endpoint for an agent.
    pub fn new(agent_id: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            log: Mutex::new(Vec::new()),
            forwarder: RwLock::new(None),
        }
    }

    /// The owning agent's id.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Install the session forwarder. Replaces any previous one.
    pub fn set_forwarder(&self, forwarder: Arc<Forwarder>) {
        *self
            .forwarder
            .write()
            .expect("channel forwarder lock poisoned") = Some(forwarder);
    }

    /// Post a message from this agent.
    ///
    /// The message lands in the local log; session-scoped messages are
    /// additionally handed to the forwarder, if one is installed. Without a
    /// forwarder (a single-agent setup) a session-scoped post degrades to a
    /// local log entry.
    pub fn post(&self, message: ChannelMessage) {
        let forwarded = message.scope == MessageScope::Session;
        {
            let mut log = self.log.lock().expect("channel log lock poisoned");
            log.push(message.clone());
        }
        if forwarded {
            let forwarder = self
                .forwarder
                .read()
                .expect("channel forwarder lock poisoned")
                .clone();
            if let Some(forwarder) = forwarder {
                forwarder(&message);
            }
        }
    }

    /// Record an incoming message from another agent. Never forwards.
    pub fn deliver(&self, message: ChannelMessage) {
        let mut log = self.log.lock().expect("channel log lock poisoned");
        log.push(message);
    }

    /// Snapshot of the full log, in arrival order.
    pub fn log(&self) -> Vec<ChannelMessage> {
        self.log.lock().expect("channel log lock poisoned").clone()
    }

    /// Log entries on one channel name.
    pub fn messages_on(&self, channel: &str) -> Vec<ChannelMessage> {
        self.log
            .lock()
            .expect("channel log lock poisoned")
            .iter()
            .filter(|m| m.channel == channel)
            .cloned()
            .collect()
    }
}

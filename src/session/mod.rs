//! Multi-agent sessions
//!
//! A [`Session`] hosts one or more agent runtimes and bridges their
//! session-scoped channel posts: every bridged message lands in the
//! recipients' mailboxes and queues a wakeup. Wakeups drain after each
//! session entry point, depth-first but bounded, so a ping-pong between
//! agents can never spin the process: past the drain limit the remainder
//! stays queued for the next entry point.
//!
//! With a single registered agent no bridging happens at all; session-scoped
//! posts degrade to local log entries.

pub mod channel;
pub mod snapshot;

pub use channel::{AgentChannel, ChannelMessage, MessageScope};
pub use snapshot::{AgentSnapshot, SessionSnapshot, WindowSnapshot};

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::actions::ActionResult;
use crate::agent::{AgentProfile, AgentRuntime, InteractionOutcome};
use crate::config::Config;
use crate::context::ContextItem;
use crate::error::{CasementError, Result};
use crate::model::ModelBridge;
use crate::window::Window;

#[derive(Default)]
struct AgentTable {
    /// Registration order, used for broadcast recipient ordering.
    order: Vec<String>,
    map: HashMap<String, Arc<AgentRuntime>>,
}

#[derive(Default)]
struct PendingState {
    /// Undelivered bridged messages per recipient.
    mailboxes: HashMap<String, Vec<ChannelMessage>>,
    /// Wakeup order. An agent appears at most once (see `queued`).
    queue: VecDeque<String>,
    queued: HashSet<String>,
}

/// A set of agents sharing bridged channels.
pub struct Session {
    config: Config,
    agents: Arc<RwLock<AgentTable>>,
    pending: Arc<Mutex<PendingState>>,
}

impl Session {
    /// Create an empty session.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            agents: Arc::new(RwLock::new(AgentTable::default())),
            pending: Arc::new(Mutex::new(PendingState::default())),
        }
    }

    /// The session's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register an agent and install the session forwarder on its channel.
    ///
    /// # Example
    /// ```no_run
    /// use std::sync::Arc;
    /// use casement::agent::AgentProfile;
    /// use casement::config::Config;
    /// use casement::session::Session;
    /// # fn bridge() -> Arc<dyn casement::model::ModelBridge> { unimplemented!() }
    ///
    /// let session = Session::new(Config::default());
    /// let scout = session
    ///     .add_agent(AgentProfile::new("scout", "Scout"), bridge())
    ///     .unwrap();
    /// scout.directory().add(casement::window::Window::new("w1", "Title", "Body"));
    /// ```
    pub fn add_agent(
        &self,
        profile: AgentProfile,
        bridge: Arc<dyn ModelBridge>,
    ) -> Result<Arc<AgentRuntime>> {
        let agent_id = profile.id.clone();
        {
            let table = self.agents.read().expect("agent table lock poisoned");
            if table.map.contains_key(&agent_id) {
                return Err(CasementError::Session(format!(
                    "Agent '{}' is already registered",
                    agent_id
                )));
            }
        }

        let runtime = Arc::new(AgentRuntime::new(profile, self.config.clone(), bridge));
        runtime
            .channel()
            .set_forwarder(self.forwarder_for(&agent_id));

        let mut table = self.agents.write().expect("agent table lock poisoned");
        table.order.push(agent_id.clone());
        table.map.insert(agent_id.clone(), Arc::clone(&runtime));
        info!(agent_id = %agent_id, agents = table.order.len(), "Agent added to session");
        Ok(runtime)
    }

    /// Look up a registered agent.
    pub fn agent(&self, agent_id: &str) -> Option<Arc<AgentRuntime>> {
        self.agents
            .read()
            .expect("agent table lock poisoned")
            .map
            .get(agent_id)
            .cloned()
    }

    /// Registered agent ids, in registration order.
    pub fn agent_ids(&self) -> Vec<String> {
        self.agents
            .read()
            .expect("agent table lock poisoned")
            .order
            .clone()
    }

    /// Wakeups still queued (deferred past the drain limit).
    pub fn pending_wakeups(&self) -> usize {
        self.pending
            .lock()
            .expect("pending state lock poisoned")
            .queue
            .len()
    }

    /// Run one interaction, then drain any wakeups it triggered.
    ///
    /// A drain failure never masks the completed interaction: it is logged
    /// and the outcome returned. Call [`Session::drain_wakeups`] directly to
    /// observe drain errors.
    pub async fn interact(&self, agent_id: &str, user_text: &str) -> Result<InteractionOutcome> {
        let runtime = self.require(agent_id)?;
        let outcome = runtime.interact(user_text).await?;
        self.drain_after(agent_id).await;
        Ok(outcome)
    }

    /// Inject an assistant response, then drain any wakeups it triggered.
    /// Drain failures are logged, not returned.
    pub async fn simulate(&self, agent_id: &str, text: &str) -> Result<InteractionOutcome> {
        let runtime = self.require(agent_id)?;
        let outcome = runtime.simulate_assistant(text).await?;
        self.drain_after(agent_id).await;
        Ok(outcome)
    }

    /// Execute a host-side action call, then drain any wakeups it triggered.
    /// Drain failures are logged, not returned.
    pub async fn execute_window_action(
        &self,
        agent_id: &str,
        window_id: &str,
        action_id: &str,
        params: &Value,
    ) -> Result<ActionResult> {
        let runtime = self.require(agent_id)?;
        let result = runtime
            .execute_window_action(window_id, action_id, params)
            .await;
        self.drain_after(agent_id).await;
        Ok(result)
    }

    /// Drain wakeups triggered by a completed entry point, logging failures
    /// instead of propagating them over the caller's own result.
    async fn drain_after(&self, agent_id: &str) {
        if let Err(err) = self.drain_wakeups().await {
            warn!(agent_id = %agent_id, error = %err, "Wakeup drain failed after entry point");
        }
    }

    /// An agent's active timeline.
    pub fn timeline(&self, agent_id: &str) -> Result<Vec<ContextItem>> {
        Ok(self.require(agent_id)?.timeline())
    }

    /// Deliver queued mailboxes and wake their agents, depth-first.
    ///
    /// A woken agent may post again, growing the queue mid-drain; the drain
    /// limit bounds the whole pass. Deferred wakeups stay queued and are
    /// picked up by the next entry point (or an explicit call here).
    pub async fn drain_wakeups(&self) -> Result<Vec<(String, InteractionOutcome)>> {
        let limit = self.config.orchestrator.wakeup_drain_limit;
        let mut outcomes = Vec::new();
        let mut drained = 0usize;

        loop {
            if drained >= limit {
                let remaining = self.pending_wakeups();
                if remaining > 0 {
                    warn!(limit, remaining, "Wakeup drain limit reached; deferring remainder");
                }
                break;
            }
            let next = {
                let mut pending = self.pending.lock().expect("pending state lock poisoned");
                match pending.queue.pop_front() {
                    Some(agent_id) => {
                        pending.queued.remove(&agent_id);
                        let messages = pending.mailboxes.remove(&agent_id).unwrap_or_default();
                        Some((agent_id, messages))
                    }
                    None => None,
                }
            };
            let (agent_id, messages) = match next {
                Some(entry) => entry,
                None => break,
            };
            let runtime = match self.agent(&agent_id) {
                Some(r) => r,
                None => continue,
            };
            drained += 1;
            debug!(agent_id = %agent_id, messages = messages.len(), "Waking agent");

            let lines: Vec<String> = messages.iter().map(ChannelMessage::describe).collect();
            let trigger = format!("New messages from other agents:\n{}", lines.join("\n"));
            let outcome = runtime.deliver_and_wake(messages, &trigger).await?;
            outcomes.push((agent_id, outcome));
        }

        Ok(outcomes)
    }

    /// Export every agent's serializable state.
    pub fn export(&self) -> SessionSnapshot {
        let table = self.agents.read().expect("agent table lock poisoned");
        let agents = table
            .order
            .iter()
            .map(|agent_id| {
                let runtime = &table.map[agent_id];
                AgentSnapshot {
                    agent_id: agent_id.clone(),
                    clock: runtime.clock().current(),
                    archive: runtime.store().archive_items(),
                    active_ids: runtime.store().active_ids(),
                    windows: runtime
                        .directory()
                        .windows()
                        .iter()
                        .map(WindowSnapshot::from)
                        .collect(),
                }
            })
            .collect();
        SessionSnapshot { agents }
    }

    /// Restore agent state from a snapshot.
    ///
    /// Every snapshotted agent must already be registered; handlers must be
    /// re-bound afterwards through each directory.
    pub fn import(&self, snapshot: SessionSnapshot) -> Result<()> {
        let table = self.agents.read().expect("agent table lock poisoned");
        for agent in &snapshot.agents {
            if !table.map.contains_key(&agent.agent_id) {
                return Err(CasementError::Snapshot(format!(
                    "Unknown agent '{}'",
                    agent.agent_id
                )));
            }
        }
        for agent in snapshot.agents {
            let runtime = &table.map[&agent.agent_id];
            runtime.clock().restore(agent.clock);
            runtime
                .directory()
                .restore(agent.windows.into_iter().map(Window::from).collect());
            runtime.store().restore(agent.archive, agent.active_ids);
            debug!(agent_id = %agent.agent_id, "Agent state restored");
        }
        Ok(())
    }

    fn require(&self, agent_id: &str) -> Result<Arc<AgentRuntime>> {
        self.agent(agent_id)
            .ok_or_else(|| CasementError::NotFound(format!("agent '{}'", agent_id)))
    }

    /// Forwarder installed on one agent's channel: compute recipients,
    /// fill mailboxes, queue wakeups.
    fn forwarder_for(&self, sender: &str) -> Arc<channel::Forwarder> {
        let agents = Arc::clone(&self.agents);
        let pending = Arc::clone(&self.pending);
        let sender = sender.to_string();
        Arc::new(move |message: &ChannelMessage| {
            let table = agents.read().expect("agent table lock poisoned");
            // Single-agent sessions never bridge.
            if table.order.len() < 2 {
                return;
            }
            let mut recipients: Vec<String> = Vec::new();
            let mut seen: HashSet<&str> = HashSet::new();
            if message.to_agents.is_empty() {
                for agent_id in &table.order {
                    if agent_id != &sender {
                        recipients.push(agent_id.clone());
                    }
                }
            } else {
                for agent_id in &message.to_agents {
                    if agent_id != &sender
                        && table.map.contains_key(agent_id)
                        && seen.insert(agent_id.as_str())
                    {
                        recipients.push(agent_id.clone());
                    }
                }
            }
            drop(table);
            if recipients.is_empty() {
                return;
            }
            let mut pending = pending.lock().expect("pending state lock poisoned");
            for recipient in recipients {
                pending
                    .mailboxes
                    .entry(recipient.clone())
                    .or_default()
                    .push(message.clone());
                if pending.queued.insert(recipient.clone()) {
                    pending.queue.push_back(recipient);
                }
            }
        })
    }
}

//! Interaction orchestrator
//!
//! [`AgentRuntime`] composes the per-agent stack and drives the turn loop:
//! render the timeline, complete against the model bridge, parse the reply,
//! execute any action calls, report their results back into the timeline,
//! prune, repeat. The loop is bounded: exceeding the consecutive tool-turn
//! limit is a structured [`CasementError::TooManyToolTurns`] error, never a
//! runaway. Cancellation is cooperative: a token handed to
//! [`AgentRuntime::interact_with_token`] is observed at the top of every
//! turn.
//!
//! A per-agent gate (an async mutex) serializes interactions, host-side
//! action calls, and background task bodies, so at most one path mutates an
//! agent's state at a time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actions::{ActionExecutor, ActionMode, ActionRegistry, ActionResult};
use crate::agent::parser::{parse_action_calls, ActionCall, ParsedCalls};
use crate::agent::profile::AgentProfile;
use crate::agent::prompt;
use crate::clock::LogicalClock;
use crate::config::Config;
use crate::context::{ContextItem, ContextItemKind, ContextStore, PruneReport, TimelineMirror};
use crate::error::{CasementError, Result};
use crate::model::{ModelBridge, TokenUsage};
use crate::session::channel::{AgentChannel, ChannelMessage};
use crate::tasks::TaskRunner;
use crate::window::WindowDirectory;

/// One executed (or launched) action call within an interaction.
#[derive(Debug, Clone)]
pub struct InteractionStep {
    /// Target window.
    pub window_id: String,
    /// Action id as issued by the model.
    pub action_id: String,
    /// Blocking or background dispatch.
    pub mode: ActionMode,
    /// Whether the call succeeded (background launches report `true`).
    pub success: bool,
    /// Result message, or `"running"` for background launches.
    pub message: String,
    /// Optional summary from the action outcome.
    pub summary: Option<String>,
    /// Task id for background launches.
    pub task_id: Option<String>,
}

/// The result of one interaction.
#[derive(Debug, Clone)]
pub struct InteractionOutcome {
    /// Final plain-text response.
    pub text: String,
    /// Every action call made along the way, in order.
    pub steps: Vec<InteractionStep>,
    /// Accumulated token usage across the interaction's completions.
    pub usage: TokenUsage,
}

/// The full per-agent execution stack.
pub struct AgentRuntime {
    profile: AgentProfile,
    config: Config,
    clock: Arc<LogicalClock>,
    directory: Arc<WindowDirectory>,
    store: Arc<ContextStore>,
    registry: Arc<ActionRegistry>,
    executor: Arc<ActionExecutor>,
    tasks: Arc<TaskRunner>,
    channel: Arc<AgentChannel>,
    bridge: Arc<dyn ModelBridge>,
    gate: Arc<Mutex<()>>,
    tokens_used: AtomicU64,
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("profile", &self.profile.id)
            .finish_non_exhaustive()
    }
}

impl AgentRuntime {
    /// Wire up a complete agent: clock, directory (with the timeline mirror
    /// installed), store, registry, executor, task runner, and channel.
    pub fn new(profile: AgentProfile, config: Config, bridge: Arc<dyn ModelBridge>) -> Self {
        let clock = Arc::new(LogicalClock::new());
        let directory = Arc::new(WindowDirectory::new(Arc::clone(&clock)));
        let store = Arc::new(ContextStore::new(Arc::clone(&clock)));
        directory.add_observer(Arc::new(TimelineMirror::new(Arc::clone(&store))));
        let registry = Arc::new(ActionRegistry::new());
        let executor = Arc::new(ActionExecutor::new(
            Arc::clone(&directory),
            Arc::clone(&registry),
            Arc::clone(&clock),
        ));
        let channel = Arc::new(AgentChannel::new(&profile.id));
        info!(agent_id = %profile.id, model = %bridge.name(), "Agent runtime created");
        Self {
            profile,
            config,
            clock,
            directory,
            store,
            registry,
            executor,
            tasks: Arc::new(TaskRunner::new()),
            channel,
            bridge,
            gate: Arc::new(Mutex::new(())),
            tokens_used: AtomicU64::new(0),
        }
    }

    /// The agent's profile.
    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// The agent's logical clock.
    pub fn clock(&self) -> &Arc<LogicalClock> {
        &self.clock
    }

    /// The agent's window directory.
    pub fn directory(&self) -> &Arc<WindowDirectory> {
        &self.directory
    }

    /// The agent's context store.
    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// The agent's action registry.
    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    /// The agent's action executor.
    pub fn executor(&self) -> &Arc<ActionExecutor> {
        &self.executor
    }

    /// The agent's background task runner.
    pub fn tasks(&self) -> &Arc<TaskRunner> {
        &self.tasks
    }

    /// The agent's channel endpoint.
    pub fn channel(&self) -> &Arc<AgentChannel> {
        &self.channel
    }

    /// Cumulative completion tokens consumed by this agent.
    pub fn tokens_used(&self) -> u64 {
        self.tokens_used.load(Ordering::Relaxed)
    }

    /// Active timeline snapshot, in order.
    pub fn timeline(&self) -> Vec<ContextItem> {
        self.store.active_items()
    }

    /// Run one user-initiated interaction.
    ///
    /// Serialized against every other entry point through the agent gate.
    pub async fn interact(&self, user_text: &str) -> Result<InteractionOutcome> {
        self.interact_with_token(user_text, CancellationToken::new())
            .await
    }

    /// Run one user-initiated interaction under a cancellation token.
    ///
    /// The token is observed at the top of every turn: cancelling it stops
    /// the loop before the next model completion, records a system note, and
    /// returns a graceful outcome with the text `canceled`. The turn already
    /// in flight finishes first.
    pub async fn interact_with_token(
        &self,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<InteractionOutcome> {
        let _gate = self.gate.lock().await;
        self.store.add(ContextItemKind::User, user_text);
        self.run_turns(&cancel).await
    }

    /// Inject a response as if the model produced it, executing any action
    /// calls it carries. Exactly one pass; no completion is requested.
    pub async fn simulate_assistant(&self, text: &str) -> Result<InteractionOutcome> {
        let _gate = self.gate.lock().await;
        let mut steps = Vec::new();
        match parse_action_calls(text) {
            ParsedCalls::None => {
                self.store.add(ContextItemKind::Assistant, text);
            }
            ParsedCalls::Invalid(reason) => {
                self.store.add(ContextItemKind::Assistant, text);
                self.store.add(
                    ContextItemKind::System,
                    &format!("Action call rejected: {}", reason),
                );
            }
            ParsedCalls::Calls(calls) => {
                self.store.add(ContextItemKind::Assistant, text);
                let report = self.execute_calls(calls, &mut steps).await?;
                self.store.add(ContextItemKind::System, &report);
            }
        }
        self.prune_timeline();
        Ok(InteractionOutcome {
            text: text.to_string(),
            steps,
            usage: TokenUsage::default(),
        })
    }

    /// Execute one action call from host code, under the gate.
    pub async fn execute_window_action(
        &self,
        window_id: &str,
        action_id: &str,
        params: &Value,
    ) -> ActionResult {
        let _gate = self.gate.lock().await;
        let result = self.executor.execute(window_id, action_id, params).await;
        self.prune_timeline();
        result
    }

    /// Deliver bridged messages and wake the agent with a trigger note.
    ///
    /// Used by the session during wakeup draining. The trigger lands as a
    /// system timeline entry and the turn loop runs without a user turn.
    pub async fn deliver_and_wake(
        &self,
        messages: Vec<ChannelMessage>,
        trigger: &str,
    ) -> Result<InteractionOutcome> {
        let _gate = self.gate.lock().await;
        for message in messages {
            self.channel.deliver(message);
        }
        self.store.add(ContextItemKind::System, trigger);
        self.run_turns(&CancellationToken::new()).await
    }

    /// Prune the active timeline against the configured budgets.
    pub fn prune_timeline(&self) -> PruneReport {
        let directory = Arc::clone(&self.directory);
        self.store.prune(
            move |id| prompt::window_cost(&directory, id),
            self.config.context.max_tokens,
            self.config.context.min_conversation_tokens,
            self.config.effective_prune_target(),
        )
    }

    /// The turn loop. The caller must hold the gate.
    async fn run_turns(&self, cancel: &CancellationToken) -> Result<InteractionOutcome> {
        let started = Instant::now();
        let bound = if self.profile.turn_budget > 0 {
            self.profile.turn_budget
        } else {
            self.config.orchestrator.max_tool_turns
        };
        let mut steps: Vec<InteractionStep> = Vec::new();
        let mut usage = TokenUsage::default();
        let mut tool_turns = 0u32;

        loop {
            if let Some(reason) = self.stop_reason(started, cancel) {
                warn!(agent_id = %self.profile.id, %reason, "Interaction stopped");
                self.store.add(
                    ContextItemKind::System,
                    &format!("Interaction stopped: {}", reason),
                );
                self.prune_timeline();
                return Ok(InteractionOutcome {
                    text: reason,
                    steps,
                    usage,
                });
            }

            let messages =
                prompt::render_messages(&self.profile, &self.directory, &self.store, &self.registry);
            // Bridge failures surface as model errors whatever the
            // implementation raised, message preserved.
            let response = self.bridge.complete(messages).await.map_err(|err| match err {
                CasementError::Model(_) => err,
                other => CasementError::Model(other.to_string()),
            })?;
            if let Some(turn_usage) = response.usage {
                usage.prompt_tokens += turn_usage.prompt_tokens;
                usage.completion_tokens += turn_usage.completion_tokens;
                self.tokens_used
                    .fetch_add(turn_usage.total() as u64, Ordering::Relaxed);
            }

            match parse_action_calls(&response.text) {
                ParsedCalls::None => {
                    self.store.add(ContextItemKind::Assistant, &response.text);
                    self.prune_timeline();
                    return Ok(InteractionOutcome {
                        text: response.text,
                        steps,
                        usage,
                    });
                }
                ParsedCalls::Invalid(reason) => {
                    debug!(agent_id = %self.profile.id, %reason, "Malformed action payload");
                    self.store.add(ContextItemKind::Assistant, &response.text);
                    self.store.add(
                        ContextItemKind::System,
                        &format!("Action call rejected: {}", reason),
                    );
                    self.prune_timeline();
                    return Ok(InteractionOutcome {
                        text: response.text,
                        steps,
                        usage,
                    });
                }
                ParsedCalls::Calls(calls) => {
                    tool_turns += 1;
                    if tool_turns > bound {
                        return Err(CasementError::TooManyToolTurns(bound));
                    }
                    self.store.add(ContextItemKind::Assistant, &response.text);
                    let report = self.execute_calls(calls, &mut steps).await?;
                    self.store.add(ContextItemKind::System, &report);
                    self.prune_timeline();
                }
            }
        }
    }

    /// Execute a batch of calls in order, appending steps and returning the
    /// action report fed back into the timeline.
    async fn execute_calls(
        &self,
        calls: Vec<ActionCall>,
        steps: &mut Vec<InteractionStep>,
    ) -> Result<String> {
        let mut lines = Vec::with_capacity(calls.len());
        for call in calls {
            match self.executor.action_mode(&call.window_id, &call.action_id) {
                ActionMode::Blocking => {
                    let result = self
                        .executor
                        .execute(&call.window_id, &call.action_id, &call.params)
                        .await;
                    lines.push(format!(
                        "{} on {}: {}: {}",
                        call.action_id,
                        call.window_id,
                        if result.success { "ok" } else { "failed" },
                        result.message
                    ));
                    steps.push(InteractionStep {
                        window_id: call.window_id,
                        action_id: call.action_id,
                        mode: ActionMode::Blocking,
                        success: result.success,
                        message: result.message,
                        summary: result.summary,
                        task_id: None,
                    });
                }
                ActionMode::Background => {
                    let task_id = self.launch_background(&call)?;
                    lines.push(format!(
                        "{} on {}: running in background (task {})",
                        call.action_id, call.window_id, task_id
                    ));
                    steps.push(InteractionStep {
                        window_id: call.window_id,
                        action_id: call.action_id,
                        mode: ActionMode::Background,
                        success: true,
                        message: "running".to_string(),
                        summary: None,
                        task_id: Some(task_id),
                    });
                }
            }
        }
        Ok(format!("Action results:\n{}", lines.join("\n")))
    }

    /// Launch a background call. The body re-acquires the agent gate, so it
    /// runs only after the current interaction releases it.
    fn launch_background(&self, call: &ActionCall) -> Result<String> {
        let executor = Arc::clone(&self.executor);
        let gate = Arc::clone(&self.gate);
        let window_id = call.window_id.clone();
        let action_id = call.action_id.clone();
        let params = call.params.clone();
        self.tasks.start(None, &call.window_id, move |token| async move {
            if token.is_cancelled() {
                return Ok("canceled before start".to_string());
            }
            let _gate = gate.lock().await;
            let result = executor.execute(&window_id, &action_id, &params).await;
            if result.success {
                Ok(result.message)
            } else {
                anyhow::bail!(result.message)
            }
        })
    }

    fn stop_reason(&self, started: Instant, cancel: &CancellationToken) -> Option<String> {
        if cancel.is_cancelled() {
            return Some("canceled".to_string());
        }
        if self.profile.token_budget > 0 && self.tokens_used() >= self.profile.token_budget {
            return Some(format!(
                "token budget of {} exhausted",
                self.profile.token_budget
            ));
        }
        if self.profile.time_budget_secs > 0
            && started.elapsed().as_secs() >= self.profile.time_budget_secs
        {
            return Some(format!(
                "time budget of {}s exhausted",
                self.profile.time_budget_secs
            ));
        }
        None
    }
}

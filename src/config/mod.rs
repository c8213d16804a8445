//! Configuration
//!
//! Runtime tunables are loaded from `~/.casement/config.toml` with
//! environment variable overrides (`CASEMENT_SECTION_KEY`). A missing file
//! yields the defaults; a malformed file is an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CasementError, Result};

/// Context timeline budget configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Token budget for the active timeline. Pruning runs when exceeded.
    pub max_tokens: i64,
    /// Token floor below which conversation entries are never evicted.
    pub min_conversation_tokens: i64,
    /// Token level pruning drives down to. 0 means half of `max_tokens`.
    pub prune_target_tokens: i64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: 100_000,
            min_conversation_tokens: 2_000,
            prune_target_tokens: 0,
        }
    }
}

/// Turn-loop and session bridging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum consecutive tool-call turns per interaction.
    pub max_tool_turns: u32,
    /// Maximum wakeups drained per session entry point.
    pub wakeup_drain_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_turns: 12,
            wakeup_drain_limit: 20,
        }
    }
}

/// Default model parameters for agents without a profile override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Default model name.
    pub name: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Completion token cap.
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Context timeline budgets
    pub context: ContextConfig,
    /// Turn loop and wakeup bounds
    pub orchestrator: OrchestratorConfig,
    /// Default model parameters
    pub model: ModelConfig,
}

impl Config {
    /// The configuration directory (`~/.casement`).
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".casement")
    }

    /// Path to the config file (`~/.casement/config.toml`).
    pub fn path() -> PathBuf {
        Self::dir().join("config.toml")
    }

    /// Load from the default path with environment overrides.
    ///
    /// A missing file yields defaults.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)
                .map_err(|e| CasementError::Config(format!("Invalid config file: {}", e)))?
        } else {
            Config::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Effective prune target: configured value, or half the budget.
    pub fn effective_prune_target(&self) -> i64 {
        if self.context.prune_target_tokens > 0 {
            self.context.prune_target_tokens
        } else {
            (self.context.max_tokens / 2).max(1)
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CASEMENT_CONTEXT_MAX_TOKENS") {
            if let Ok(v) = val.parse() {
                self.context.max_tokens = v;
            }
        }
        if let Ok(val) = std::env::var("CASEMENT_CONTEXT_MIN_CONVERSATION_TOKENS") {
            if let Ok(v) = val.parse() {
                self.context.min_conversation_tokens = v;
            }
        }
        if let Ok(val) = std::env::var("CASEMENT_CONTEXT_PRUNE_TARGET_TOKENS") {
            if let Ok(v) = val.parse() {
                self.context.prune_target_tokens = v;
            }
        }
        if let Ok(val) = std::env::var("CASEMENT_ORCHESTRATOR_MAX_TOOL_TURNS") {
            if let Ok(v) = val.parse() {
                self.orchestrator.max_tool_turns = v;
            }
        }
        if let Ok(val) = std::env::var("CASEMENT_ORCHESTRATOR_WAKEUP_DRAIN_LIMIT") {
            if let Ok(v) = val.parse() {
                self.orchestrator.wakeup_drain_limit = v;
            }
        }
        if let Ok(val) = std::env::var("CASEMENT_MODEL_NAME") {
            self.model.name = val;
        }
        if let Ok(val) = std::env::var("CASEMENT_MODEL_TEMPERATURE") {
            if let Ok(v) = val.parse() {
                self.model.temperature = v;
            }
        }
        if let Ok(val) = std::env::var("CASEMENT_MODEL_MAX_TOKENS") {
            if let Ok(v) = val.parse() {
                self.model.max_tokens = v;
            }
        }
    }

    /// Reject configurations the runtime cannot operate under.
    pub fn validate(&self) -> Result<()> {
        if self.context.max_tokens <= 0 {
            return Err(CasementError::Config(
                "context.max_tokens must be positive".to_string(),
            ));
        }
        if self.context.min_conversation_tokens < 0 {
            return Err(CasementError::Config(
                "context.min_conversation_tokens must not be negative".to_string(),
            ));
        }
        if self.context.prune_target_tokens < 0 {
            return Err(CasementError::Config(
                "context.prune_target_tokens must not be negative".to_string(),
            ));
        }
        if self.orchestrator.max_tool_turns == 0 {
            return Err(CasementError::Config(
                "orchestrator.max_tool_turns must be at least 1".to_string(),
            ));
        }
        if self.orchestrator.wakeup_drain_limit == 0 {
            return Err(CasementError::Config(
                "orchestrator.wakeup_drain_limit must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(CasementError::Config(
                "model.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        Ok(())
    }
}

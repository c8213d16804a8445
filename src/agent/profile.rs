//! Agent profiles

use serde::{Deserialize, Serialize};

/// Identity and budgets for one agent in a session.
///
/// All budgets default to 0, meaning unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Unique identifier within the session.
    pub id: String,
    /// Display name used in prompts.
    pub name: String,
    /// Optional role text prepended to the system preamble.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Optional model override for this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Cumulative token budget across the agent's lifetime (0 = unlimited).
    #[serde(default)]
    pub token_budget: u64,
    /// Wall-clock budget per interaction, in seconds (0 = unlimited).
    #[serde(default)]
    pub time_budget_secs: u64,
    /// Override of the consecutive tool-turn bound (0 = use config).
    #[serde(default)]
    pub turn_budget: u32,
}

impl AgentProfile {
    /// Create a profile with unlimited budgets.
    ///
    /// # Example
    /// ```
    /// use casement::agent::AgentProfile;
    ///
    /// let profile = AgentProfile::new("scout", "Scout");
    /// assert_eq!(profile.id, "scout");
    /// assert_eq!(profile.token_budget, 0);
    /// ```
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role: None,
            model: None,
            token_budget: 0,
            time_budget_secs: 0,
            turn_budget: 0,
        }
    }

    /// Attach role text.
    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    /// Override the model for this agent.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    /// Set the cumulative token budget.
    pub fn with_token_budget(mut self, tokens: u64) -> Self {
        self.token_budget = tokens;
        self
    }

    /// Set the per-interaction time budget.
    pub fn with_time_budget_secs(mut self, secs: u64) -> Self {
        self.time_budget_secs = secs;
        self
    }

    /// Override the consecutive tool-turn bound.
    pub fn with_turn_budget(mut self, turns: u32) -> Self {
        self.turn_budget = turns;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults_unlimited() {
        let p = AgentProfile::new("a", "Agent A");
        assert_eq!(p.token_budget, 0);
        assert_eq!(p.time_budget_secs, 0);
        assert_eq!(p.turn_budget, 0);
        assert!(p.role.is_none());
        assert!(p.model.is_none());
    }

    #[test]
    fn test_profile_builders() {
        let p = AgentProfile::new("a", "Agent A")
            .with_role("You review code.")
            .with_model("gpt-test")
            .with_token_budget(1000)
            .with_time_budget_secs(30)
            .with_turn_budget(4);
        assert_eq!(p.role.as_deref(), Some("You review code."));
        assert_eq!(p.model.as_deref(), Some("gpt-test"));
        assert_eq!(p.token_budget, 1000);
        assert_eq!(p.time_budget_secs, 30);
        assert_eq!(p.turn_budget, 4);
    }

    #[test]
    fn test_profile_serde_roundtrip() {
        let p = AgentProfile::new("a", "Agent A").with_role("r");
        let json = serde_json::to_string(&p).unwrap();
        let back: AgentProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "a");
        assert_eq!(back.role.as_deref(), Some("r"));
    }
}

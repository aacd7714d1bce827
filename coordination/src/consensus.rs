//! Contributions, consensus level, and cost estimation.
//!
//! Every swarm assignment produces exactly one contribution, success
//! or failure — a failed member is downgraded to a zero-confidence
//! contribution, never dropped and never re-raised.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::profile::AgentKind;

/// Fixed placeholder cost per contribution, in cost units.
pub const COST_PER_CONTRIBUTION: f64 = 0.05;

/// One agent's outcome for one assigned subtask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContribution {
    /// The contributing agent.
    pub agent_id: String,
    /// Its kind.
    pub agent_kind: AgentKind,
    /// The result value, or `None` on failure.
    pub contribution: Option<Value>,
    /// Confidence in [0, 1]; exactly 0 on failure.
    pub confidence: f64,
    /// How the agent got here, or the failure message.
    pub reasoning: String,
}

impl AgentContribution {
    /// A successful contribution with clamped confidence.
    pub fn success(
        agent_id: impl Into<String>,
        agent_kind: AgentKind,
        contribution: Value,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_kind,
            contribution: Some(contribution),
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
        }
    }

    /// A failed contribution: null result, zero confidence, the error
    /// message preserved as reasoning.
    pub fn failure(agent_id: impl Into<String>, agent_kind: AgentKind, error: &str) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_kind,
            contribution: None,
            confidence: 0.0,
            reasoning: format!("Error: {error}"),
        }
    }

    /// Whether the contribution carries a result.
    pub fn is_success(&self) -> bool {
        self.contribution.is_some()
    }
}

/// Mean confidence over successful contributions; 0 when none
/// succeeded. Always within [0, 1].
pub fn consensus_level(contributions: &[AgentContribution]) -> f64 {
    let successful: Vec<f64> = contributions
        .iter()
        .filter(|c| c.is_success())
        .map(|c| c.confidence)
        .collect();
    if successful.is_empty() {
        return 0.0;
    }
    successful.iter().sum::<f64>() / successful.len() as f64
}

/// Placeholder cost model: a flat rate per contribution, successes and
/// failures alike.
pub fn estimated_cost(contribution_count: usize) -> f64 {
    COST_PER_CONTRIBUTION * contribution_count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(id: &str, confidence: f64) -> AgentContribution {
        AgentContribution::success(id, AgentKind::Research, json!({"ok": true}), confidence, "done")
    }

    #[test]
    fn test_failure_shape() {
        let c = AgentContribution::failure("a1", AgentKind::Code, "boom");
        assert!(c.contribution.is_none());
        assert_eq!(c.confidence, 0.0);
        assert_eq!(c.reasoning, "Error: boom");
        assert!(!c.is_success());
    }

    #[test]
    fn test_success_clamps_confidence() {
        assert_eq!(ok("a", 1.7).confidence, 1.0);
        assert_eq!(ok("a", -0.2).confidence, 0.0);
    }

    #[test]
    fn test_consensus_mean_of_successes() {
        let contributions = vec![ok("a", 0.9), ok("b", 0.7)];
        let level = consensus_level(&contributions);
        assert!((level - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_consensus_ignores_failures() {
        let contributions = vec![
            ok("a", 0.6),
            AgentContribution::failure("b", AgentKind::Analysis, "timeout"),
            ok("c", 0.8),
        ];
        let level = consensus_level(&contributions);
        assert!((level - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_consensus_zero_when_all_failed() {
        let contributions = vec![
            AgentContribution::failure("a", AgentKind::Writing, "x"),
            AgentContribution::failure("b", AgentKind::Code, "y"),
        ];
        assert_eq!(consensus_level(&contributions), 0.0);
    }

    #[test]
    fn test_consensus_empty() {
        assert_eq!(consensus_level(&[]), 0.0);
    }

    #[test]
    fn test_consensus_in_unit_interval() {
        let contributions = vec![ok("a", 1.0), ok("b", 1.0)];
        let level = consensus_level(&contributions);
        assert!((0.0..=1.0).contains(&level));
        assert_eq!(level, 1.0);
    }

    #[test]
    fn test_cost_counts_failures_too() {
        assert_eq!(estimated_cost(0), 0.0);
        assert_eq!(estimated_cost(1), 0.05);
        assert!((estimated_cost(3) - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_contribution_serde_null_on_failure() {
        let c = AgentContribution::failure("a", AgentKind::Monitoring, "down");
        let json = serde_json::to_value(&c).unwrap();
        assert!(json["contribution"].is_null());
        assert_eq!(json["confidence"], 0.0);
    }
}

//! Agent kinds and capability profiles.
//!
//! An `AgentProfile` is the roster entry the assignment strategies
//! reason over: an identity, a kind, and the set of capability tags the
//! agent advertises. Capability sets are `BTreeSet`s so intersection
//! sizes and iteration order are deterministic.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The eight agent kinds the core can construct and dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Gathers information: plans steps, executes them, summarizes findings.
    Research,
    /// Analyzes supplied data for patterns, anomalies, and predictions.
    Analysis,
    /// Produces content with tone/length/format control.
    Writing,
    /// Generates, fixes, or refactors code.
    Code,
    /// Scores options against criteria and recommends one.
    Decision,
    /// Drafts messages for a channel and recipient.
    Communication,
    /// Evaluates metrics against thresholds and reports status.
    Monitoring,
    /// Meta-agent that plans, delegates to the others, and synthesizes.
    Orchestrator,
}

impl AgentKind {
    /// All defined kinds, in declaration order.
    pub fn all() -> &'static [AgentKind] {
        &[
            Self::Research,
            Self::Analysis,
            Self::Writing,
            Self::Code,
            Self::Decision,
            Self::Communication,
            Self::Monitoring,
            Self::Orchestrator,
        ]
    }

    /// Stable snake_case name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Analysis => "analysis",
            Self::Writing => "writing",
            Self::Code => "code",
            Self::Decision => "decision",
            Self::Communication => "communication",
            Self::Monitoring => "monitoring",
            Self::Orchestrator => "orchestrator",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for agent kind strings that name no known kind.
///
/// Raised at construction (factory input) and at orchestrator dispatch
/// (assignment replies name kinds as strings).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent kind: {0}")]
pub struct UnknownAgentKind(pub String);

impl FromStr for AgentKind {
    type Err = UnknownAgentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "research" => Ok(Self::Research),
            "analysis" => Ok(Self::Analysis),
            "writing" => Ok(Self::Writing),
            "code" => Ok(Self::Code),
            "decision" => Ok(Self::Decision),
            "communication" => Ok(Self::Communication),
            "monitoring" => Ok(Self::Monitoring),
            "orchestrator" => Ok(Self::Orchestrator),
            other => Err(UnknownAgentKind(other.to_string())),
        }
    }
}

/// Default capability tags per kind.
///
/// Callers building rosters by hand can start from these instead of
/// repeating the tag lists; the factory uses them when a config leaves
/// `capabilities` empty.
pub fn default_capabilities(kind: AgentKind) -> BTreeSet<String> {
    let tags: &[&str] = match kind {
        AgentKind::Research => &["research", "web_search", "summarization", "fact_finding"],
        AgentKind::Analysis => &["analysis", "statistics", "pattern_detection", "prediction"],
        AgentKind::Writing => &["writing", "editing", "formatting", "content_generation"],
        AgentKind::Code => &["coding", "debugging", "refactoring", "code_review"],
        AgentKind::Decision => &["decision_making", "evaluation", "risk_assessment"],
        AgentKind::Communication => &["communication", "drafting", "outreach"],
        AgentKind::Monitoring => &["monitoring", "alerting", "anomaly_detection"],
        AgentKind::Orchestrator => &["planning", "delegation", "synthesis"],
    };
    tags.iter().map(|t| t.to_string()).collect()
}

/// A roster entry: who an agent is and what it claims it can do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Stable agent identifier.
    pub id: String,
    /// The agent's kind.
    pub kind: AgentKind,
    /// Advertised capability tags.
    pub capabilities: BTreeSet<String>,
}

impl AgentProfile {
    /// Create a profile with explicit capabilities.
    pub fn new(id: impl Into<String>, kind: AgentKind, capabilities: &[&str]) -> Self {
        Self {
            id: id.into(),
            kind,
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Create a profile carrying the default capabilities for its kind.
    pub fn with_defaults(id: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            id: id.into(),
            kind,
            capabilities: default_capabilities(kind),
        }
    }

    /// Number of capabilities shared with the given required set.
    pub fn capability_overlap(&self, required: &BTreeSet<String>) -> usize {
        self.capabilities.intersection(required).count()
    }

    /// Whether the agent shares at least one capability with the set.
    pub fn can_bid_on(&self, required: &BTreeSet<String>) -> bool {
        !self.capabilities.is_disjoint(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in AgentKind::all() {
            let parsed: AgentKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, *kind);
        }
    }

    #[test]
    fn test_kind_parse_case_insensitive() {
        assert_eq!("Research".parse::<AgentKind>().unwrap(), AgentKind::Research);
        assert_eq!(" MONITORING ".parse::<AgentKind>().unwrap(), AgentKind::Monitoring);
    }

    #[test]
    fn test_unknown_kind_is_error() {
        let err = "telepathy".parse::<AgentKind>().unwrap_err();
        assert_eq!(err, UnknownAgentKind("telepathy".to_string()));
        assert!(err.to_string().contains("telepathy"));
    }

    #[test]
    fn test_kind_serde_snake_case() {
        let json = serde_json::to_string(&AgentKind::Decision).unwrap();
        assert_eq!(json, "\"decision\"");
        let parsed: AgentKind = serde_json::from_str("\"monitoring\"").unwrap();
        assert_eq!(parsed, AgentKind::Monitoring);
    }

    #[test]
    fn test_every_kind_has_default_capabilities() {
        for kind in AgentKind::all() {
            assert!(
                !default_capabilities(*kind).is_empty(),
                "kind {kind} has no default capabilities"
            );
        }
    }

    #[test]
    fn test_capability_overlap() {
        let profile = AgentProfile::new("a1", AgentKind::Code, &["coding", "debugging"]);
        assert_eq!(profile.capability_overlap(&caps(&["coding", "writing"])), 1);
        assert_eq!(profile.capability_overlap(&caps(&["coding", "debugging"])), 2);
        assert_eq!(profile.capability_overlap(&caps(&["writing"])), 0);
    }

    #[test]
    fn test_can_bid_on() {
        let profile = AgentProfile::with_defaults("r1", AgentKind::Research);
        assert!(profile.can_bid_on(&caps(&["research"])));
        assert!(!profile.can_bid_on(&caps(&["coding"])));
    }

    #[test]
    fn test_profile_serde_roundtrip() {
        let profile = AgentProfile::with_defaults("m1", AgentKind::Monitoring);
        let json = serde_json::to_string(&profile).unwrap();
        let parsed: AgentProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, profile);
    }
}

//! Subtask assignment strategies.
//!
//! Maps decomposed subtasks onto a roster of agent profiles under the
//! configured coordination strategy:
//!
//! - **auction**: every capability-eligible agent bids; the strictly
//!   highest-confidence bid wins, ties keep the earlier-found bid.
//! - **democratic / consensus**: the agent with the largest capability
//!   intersection wins, ties keep the earliest roster agent.
//! - **leader_based**: not resolved here — the swarm layer delegates
//!   the subtask list to a leader agent whose reply is not
//!   deterministically parseable; see the swarm engine.
//!
//! Subtask dependencies are validated for referential integrity but
//! deliberately not consulted for execution ordering: every assignment
//! fans out concurrently, matching the source system.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::profile::AgentProfile;

/// Error type for assignment operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssignmentError {
    #[error("no agents available for assignment")]
    EmptyRoster,

    #[error("duplicate subtask id: {0}")]
    DuplicateSubtaskId(String),

    #[error("subtask {subtask} depends on unknown subtask {dependency}")]
    UnknownDependency { subtask: String, dependency: String },
}

/// How subtasks are mapped to agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationStrategy {
    /// Capability-intersection greedy pick (the default).
    #[default]
    Democratic,
    /// A leader agent receives the full subtask list. Incomplete: the
    /// leader's plan is never parsed back into assignments.
    LeaderBased,
    /// Alias of democratic in this core.
    Consensus,
    /// Highest-confidence bid among eligible agents wins.
    Auction,
}

impl std::fmt::Display for CoordinationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Democratic => write!(f, "democratic"),
            Self::LeaderBased => write!(f, "leader_based"),
            Self::Consensus => write!(f, "consensus"),
            Self::Auction => write!(f, "auction"),
        }
    }
}

/// One decomposed unit of swarm work. Generated fresh per task, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    /// Unique id within one decomposition.
    pub id: String,
    /// What the subtask asks for.
    pub description: String,
    /// Capability tags an agent should have to take this on.
    #[serde(default)]
    pub required_capabilities: BTreeSet<String>,
    /// Ids of subtasks this one depends on. Produced by decomposition,
    /// validated, but not enforced at execution time.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Relative priority; higher runs are not ordered by this either.
    #[serde(default)]
    pub priority: u32,
}

impl Subtask {
    /// Create a subtask with a fresh id.
    pub fn new(description: impl Into<String>, required: &[&str]) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            required_capabilities: required.iter().map(|c| c.to_string()).collect(),
            dependencies: Vec::new(),
            priority: 0,
        }
    }
}

/// Check id uniqueness and that every dependency resolves.
pub fn validate_subtasks(subtasks: &[Subtask]) -> Result<(), AssignmentError> {
    let mut ids = BTreeSet::new();
    for subtask in subtasks {
        if !ids.insert(subtask.id.as_str()) {
            return Err(AssignmentError::DuplicateSubtaskId(subtask.id.clone()));
        }
    }
    for subtask in subtasks {
        for dep in &subtask.dependencies {
            if !ids.contains(dep.as_str()) {
                return Err(AssignmentError::UnknownDependency {
                    subtask: subtask.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

/// A bid from one agent on one subtask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// The bidding agent.
    pub agent_id: String,
    /// Quoted cost in cost units.
    pub cost: f64,
    /// Quoted duration in milliseconds.
    pub estimated_ms: u64,
    /// Self-assessed confidence in [0, 1].
    pub confidence: f64,
}

impl Bid {
    /// The fixed placeholder bid every agent quotes in this core.
    pub fn placeholder(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            cost: 0.05,
            estimated_ms: 1000,
            confidence: 0.8,
        }
    }
}

/// Produces a bid for an eligible agent, or `None` to abstain.
pub trait BidPolicy {
    fn bid(&self, agent: &AgentProfile, subtask: &Subtask) -> Option<Bid>;
}

/// Default policy: every eligible agent quotes the fixed placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderBids;

impl BidPolicy for PlaceholderBids {
    fn bid(&self, agent: &AgentProfile, _subtask: &Subtask) -> Option<Bid> {
        Some(Bid::placeholder(agent.id.clone()))
    }
}

/// One subtask mapped to one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    /// The assigned subtask.
    pub subtask: Subtask,
    /// The chosen agent.
    pub agent_id: String,
    /// Winning bid, when the auction strategy chose the agent.
    pub winning_bid: Option<Bid>,
}

/// Auction assignment: collect bids from capability-eligible agents
/// and keep the strictly highest-confidence bid per subtask.
///
/// A subtask no agent is eligible for yields no assignment.
pub fn auction_assign(
    subtasks: &[Subtask],
    roster: &[AgentProfile],
    policy: &dyn BidPolicy,
) -> Result<Vec<TaskAssignment>, AssignmentError> {
    if roster.is_empty() {
        return Err(AssignmentError::EmptyRoster);
    }

    let mut assignments = Vec::new();
    for subtask in subtasks {
        let mut winner: Option<Bid> = None;
        for agent in roster {
            if !agent.can_bid_on(&subtask.required_capabilities) {
                continue;
            }
            let Some(bid) = policy.bid(agent, subtask) else {
                continue;
            };
            // Strictly greater keeps the earlier-found bid on ties.
            let beats = winner.as_ref().map_or(true, |w| bid.confidence > w.confidence);
            if beats {
                winner = Some(bid);
            }
        }

        match winner {
            Some(bid) => {
                debug!(subtask = %subtask.id, agent = %bid.agent_id, confidence = bid.confidence, "auction won");
                assignments.push(TaskAssignment {
                    subtask: subtask.clone(),
                    agent_id: bid.agent_id.clone(),
                    winning_bid: Some(bid),
                });
            }
            None => {
                warn!(subtask = %subtask.id, "no eligible bidder; subtask left unassigned");
            }
        }
    }
    Ok(assignments)
}

/// Democratic / consensus assignment: per subtask, the agent with the
/// largest capability intersection wins; ties keep the earliest roster
/// agent.
pub fn capability_assign(
    subtasks: &[Subtask],
    roster: &[AgentProfile],
) -> Result<Vec<TaskAssignment>, AssignmentError> {
    if roster.is_empty() {
        return Err(AssignmentError::EmptyRoster);
    }

    let assignments = subtasks
        .iter()
        .map(|subtask| {
            let mut best = &roster[0];
            let mut best_overlap = best.capability_overlap(&subtask.required_capabilities);
            for agent in &roster[1..] {
                let overlap = agent.capability_overlap(&subtask.required_capabilities);
                if overlap > best_overlap {
                    best = agent;
                    best_overlap = overlap;
                }
            }
            debug!(subtask = %subtask.id, agent = %best.id, overlap = best_overlap, "capability assignment");
            TaskAssignment {
                subtask: subtask.clone(),
                agent_id: best.id.clone(),
                winning_bid: None,
            }
        })
        .collect();
    Ok(assignments)
}

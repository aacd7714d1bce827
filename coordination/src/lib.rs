//! Coordination core for the apex multi-agent system.
//!
//! This crate holds everything below the language-model boundary:
//! - Agent kinds and capability profiles
//! - Per-agent memory (short-term ring + long-term store)
//! - The swarm communication log
//! - Subtask assignment strategies (auction, capability-based)
//! - Consensus and cost math over agent contributions
//!
//! Nothing here performs inference; the `apex-agents` crate layers the
//! planner, the specialized agents, the orchestrator, and the swarm
//! execution engine on top of these primitives.

pub mod assignment;
pub mod consensus;
pub mod memory;
pub mod messages;
pub mod profile;

// Re-export the profile types used by every layer above.
pub use profile::{default_capabilities, AgentKind, AgentProfile, UnknownAgentKind};

// Re-export memory types.
pub use memory::{
    MemoryConfig, MemoryItem, MemoryKind, MemoryStore, RelevanceScorer, TokenOverlap,
};

// Re-export communication types.
pub use messages::{MessageKind, MessageLog, Protocol, SwarmMessage};

// Re-export assignment types.
pub use assignment::{
    auction_assign, capability_assign, validate_subtasks, AssignmentError, Bid, BidPolicy,
    CoordinationStrategy, PlaceholderBids, Subtask, TaskAssignment,
};

// Re-export consensus types.
pub use consensus::{
    consensus_level, estimated_cost, AgentContribution, COST_PER_CONTRIBUTION,
};

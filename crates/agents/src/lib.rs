//! Multi-agent task execution on top of `apex-coordination`.
//!
//! The crate provides specialized agents built around a shared
//! memory-backed harness, a task planner, a sequential orchestrator,
//! and a concurrent swarm. All model access goes through the
//! [`collaborator::LanguageModel`] trait so the whole stack runs
//! against any OpenAI-compatible endpoint, or against a test double.

pub mod agents;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod planner;
pub mod swarm;

pub use agents::{
    Agent, AgentConfig, AgentExecution, AgentFactory, AgentHarness, ExecutionStatus,
};
pub use collaborator::{ChatMessage, CollaboratorError, CompletionOptions, HttpModel, LanguageModel};
pub use config::{ConfigError, RuntimeConfig};
pub use error::{AgentError, SwarmError};
pub use orchestrator::{Orchestrator, OrchestratorReport};
pub use planner::{PlanError, TaskPlan, TaskPlanner, TaskStep};
pub use swarm::{AgentSwarm, SwarmMember, SwarmResult, SwarmSettings, SwarmTopology};

//! Error taxonomy for the agent layer.
//!
//! Three failure families propagate to callers as distinct kinds:
//! unknown agent kinds (construction and orchestrator dispatch),
//! collaborator failures (unavailable backend or schema-invalid
//! output), and plan validation failures. A swarm member's execution
//! error is the one failure that is *not* propagated — the swarm
//! downgrades it to a zero-confidence contribution.

use apex_coordination::{AssignmentError, UnknownAgentKind};

use crate::collaborator::CollaboratorError;
use crate::planner::PlanError;

/// Error type for agent construction and execution.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A kind string named no known agent kind, or a required kind had
    /// no registered agent.
    #[error(transparent)]
    UnknownKind(#[from] UnknownAgentKind),

    /// The language-model collaborator failed or produced output that
    /// does not match the expected schema.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// The planner produced a structurally invalid plan.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// The execution context is missing a required input.
    #[error("missing required input: {0}")]
    MissingInput(String),
}

/// Error type for swarm execution.
///
/// Note what is absent: a member's execution failure. Those are
/// recovered locally into contributions and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    /// The leader produced a delegation plan this core cannot parse
    /// into assignments. The raw plan is preserved for inspection.
    #[error("leader-based coordination is incomplete: leader plan not parseable")]
    LeaderPlanUnparsed(String),

    #[error("swarm has no members")]
    NoMembers,
}

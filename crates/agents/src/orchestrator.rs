//! Orchestrator: plans an objective, assigns each step to a registered
//! specialist by kind, dispatches the steps sequentially, and
//! synthesizes a final answer.
//!
//! Execution is all-or-nothing. A failing step aborts the run with the
//! error; no partial report is produced.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use apex_coordination::{AgentKind, UnknownAgentKind};

use crate::agents::Agent;
use crate::collaborator::{structured_as, ChatMessage, CompletionOptions, LanguageModel};
use crate::error::AgentError;
use crate::planner::{TaskPlan, TaskPlanner};

/// Model reply mapping each plan step to an agent kind.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct StepAssignments {
    /// step id -> agent kind name
    assignments: BTreeMap<String, String>,
}

/// Outcome of a full orchestrated run.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorReport {
    pub objective: String,
    pub plan: TaskPlan,
    pub step_results: Vec<StepResult>,
    pub synthesis: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step_id: String,
    pub agent_kind: AgentKind,
    pub output: Value,
}

pub struct Orchestrator {
    model: Arc<dyn LanguageModel>,
    model_name: String,
    planner: TaskPlanner,
    registry: RwLock<BTreeMap<AgentKind, Arc<dyn Agent>>>,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn LanguageModel>, model_name: impl Into<String>) -> Self {
        let model_name = model_name.into();
        Self {
            planner: TaskPlanner::new(Arc::clone(&model), model_name.clone()),
            model,
            model_name,
            registry: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a specialist. A later registration for the same kind
    /// replaces the earlier one.
    pub async fn register_agent(&self, agent: Arc<dyn Agent>) {
        let kind = agent.kind();
        info!(%kind, name = agent.name(), "agent registered");
        self.registry.write().await.insert(kind, agent);
    }

    pub async fn registered_kinds(&self) -> Vec<AgentKind> {
        self.registry.read().await.keys().copied().collect()
    }

    /// Ask the model which registered kind should own each step.
    async fn assign_steps(
        &self,
        plan: &TaskPlan,
        available: &[AgentKind],
    ) -> Result<BTreeMap<String, AgentKind>, AgentError> {
        let kinds = available
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let mut variables = Map::new();
        variables.insert(
            "plan".to_string(),
            serde_json::to_value(plan).unwrap_or(Value::Null),
        );
        variables.insert("kinds".to_string(), Value::String(kinds));

        let raw: StepAssignments = structured_as(
            self.model.as_ref(),
            &self.model_name,
            "Assign each plan step to the best-suited agent kind.\n\n\
             Plan: {{plan}}\n\nAvailable kinds: {{kinds}}\n\n\
             Return a map from step id to agent kind name.",
            &variables,
        )
        .await?;

        let mut assignments = BTreeMap::new();
        for step in &plan.steps {
            let kind = match raw.assignments.get(&step.id) {
                Some(name) => name.parse::<AgentKind>()?,
                // Unassigned steps default to analysis.
                None => AgentKind::Analysis,
            };
            assignments.insert(step.id.clone(), kind);
        }
        Ok(assignments)
    }

    /// Plan, dispatch each step in order, and synthesize. Any step
    /// failure aborts the whole run.
    #[instrument(skip(self, context))]
    pub async fn execute(&self, objective: &str, context: &Value) -> Result<OrchestratorReport, AgentError> {
        let plan = self.planner.create_plan(objective, context).await?;
        info!(steps = plan.steps.len(), "orchestration plan ready");

        let available = self.registered_kinds().await;
        let assignments = self.assign_steps(&plan, &available).await?;

        let mut step_results = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            let kind = assignments
                .get(&step.id)
                .copied()
                .unwrap_or(AgentKind::Analysis);

            let agent = {
                let registry = self.registry.read().await;
                registry.get(&kind).cloned()
            }
            .ok_or_else(|| AgentError::UnknownKind(UnknownAgentKind(kind.to_string())))?;

            info!(step = %step.id, %kind, "dispatching step");
            let step_context = json!({
                "step": step,
                "objective": objective,
                "prior_results": step_results,
                "context": context,
            });
            let output = agent.execute(&step.description, &step_context).await?;
            step_results.push(StepResult {
                step_id: step.id.clone(),
                agent_kind: kind,
                output,
            });
        }

        let synthesis = self.synthesize(objective, &step_results).await?;
        Ok(OrchestratorReport {
            objective: objective.to_string(),
            plan,
            step_results,
            synthesis,
            completed_at: Utc::now(),
        })
    }

    async fn synthesize(&self, objective: &str, results: &[StepResult]) -> Result<String, AgentError> {
        let digest = results
            .iter()
            .map(|r| format!("[{}] {}", r.step_id, r.output))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = [
            ChatMessage::system(
                "You are an orchestrator. Synthesize the step results into \
                 one final answer for the objective.",
            ),
            ChatMessage::user(format!("Objective: {objective}\n\nStep results:\n{digest}")),
        ];
        let synthesis = self
            .model
            .complete(&self.model_name, &messages, &CompletionOptions::default())
            .await?;
        Ok(synthesis)
    }
}

//! Task planning.
//!
//! One structured-generation call turns an objective plus context into
//! an ordered step plan. The reply is validated hard: unique step ids,
//! resolvable dependencies, and an acyclic dependency graph. A
//! violation is a `PlanError::Validation` and is not retried here —
//! the caller decides whether to plan again.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::collaborator::{structured_as, CollaboratorError, LanguageModel};

/// Error type for planning operations.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The returned structure does not form a valid plan.
    #[error("plan validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

/// One step of a task plan.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TaskStep {
    /// Unique id within the plan.
    pub id: String,
    /// What the step does.
    pub description: String,
    /// The action verb to perform.
    pub action: String,
    /// Tool to use, when one applies.
    #[serde(default)]
    pub tool: Option<String>,
    /// Input map for the action.
    #[serde(default)]
    pub input: Map<String, Value>,
    /// What the step should produce.
    pub expected_output: String,
    /// Step ids this one depends on. Must form a DAG.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// An ordered step plan. Produced once per planning call, read-only
/// afterward.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TaskPlan {
    /// The objective the plan serves.
    pub objective: String,
    /// Steps in plan order.
    pub steps: Vec<TaskStep>,
}

impl TaskPlan {
    /// Validate the plan shape: non-empty, unique step ids, resolvable
    /// dependencies, no dependency cycles.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.steps.is_empty() {
            return Err(PlanError::Validation("plan has no steps".to_string()));
        }

        let mut ids = BTreeSet::new();
        for step in &self.steps {
            if step.id.is_empty() {
                return Err(PlanError::Validation("step with empty id".to_string()));
            }
            if !ids.insert(step.id.as_str()) {
                return Err(PlanError::Validation(format!("duplicate step id: {}", step.id)));
            }
        }

        for step in &self.steps {
            for dep in &step.dependencies {
                if !ids.contains(dep.as_str()) {
                    return Err(PlanError::Validation(format!(
                        "step {} depends on unknown step {dep}",
                        step.id
                    )));
                }
            }
        }

        self.check_acyclic()
    }

    /// Kahn-style cycle check over the dependency graph.
    fn check_acyclic(&self) -> Result<(), PlanError> {
        let mut in_degree: BTreeMap<&str, usize> =
            self.steps.iter().map(|s| (s.id.as_str(), s.dependencies.len())).collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for step in &self.steps {
            for dep in &step.dependencies {
                dependents.entry(dep.as_str()).or_default().push(step.id.as_str());
            }
        }

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut resolved = 0usize;
        while let Some(id) = ready.pop() {
            resolved += 1;
            for dependent in dependents.get(id).map(|v| v.as_slice()).unwrap_or(&[]) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(dependent);
                    }
                }
            }
        }

        if resolved != self.steps.len() {
            return Err(PlanError::Validation(
                "step dependencies contain a cycle".to_string(),
            ));
        }
        Ok(())
    }
}

const PLANNING_PROMPT: &str = "\
Decompose the objective into an ordered plan of executable steps.

Objective: {{objective}}
Context: {{context}}

Available tools: {{tools}}

Each step needs an id, a description, an action, an optional tool from \
the list above, an input map, the expected output, and the ids of steps \
it depends on. Dependencies must not form cycles.";

/// Default tool names advertised to the planner.
pub const DEFAULT_TOOLS: &[&str] = &["web_search", "calculator", "file_reader", "data_query"];

/// Issues planning calls against the collaborator.
pub struct TaskPlanner {
    model: Arc<dyn LanguageModel>,
    model_name: String,
    tools: Vec<String>,
}

impl TaskPlanner {
    /// Create a planner with the default tool list.
    pub fn new(model: Arc<dyn LanguageModel>, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            tools: DEFAULT_TOOLS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Override the advertised tool names.
    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = tools;
        self
    }

    /// One structured planning call plus validation.
    pub async fn create_plan(&self, objective: &str, context: &Value) -> Result<TaskPlan, PlanError> {
        let mut variables = Map::new();
        variables.insert("objective".to_string(), Value::String(objective.to_string()));
        variables.insert("context".to_string(), context.clone());
        variables.insert(
            "tools".to_string(),
            Value::String(self.tools.join(", ")),
        );

        let plan: TaskPlan = structured_as(
            self.model.as_ref(),
            &self.model_name,
            PLANNING_PROMPT,
            &variables,
        )
        .await?;

        plan.validate()?;
        debug!(objective, steps = plan.steps.len(), "plan created");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{ChatMessage, CompletionOptions};
    use async_trait::async_trait;
    use schemars::schema::RootSchema;
    use serde_json::json;

    fn step(id: &str, deps: &[&str]) -> TaskStep {
        TaskStep {
            id: id.to_string(),
            description: format!("step {id}"),
            action: "act".to_string(),
            tool: None,
            input: Map::new(),
            expected_output: "output".to_string(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn plan(steps: Vec<TaskStep>) -> TaskPlan {
        TaskPlan { objective: "test".to_string(), steps }
    }

    #[test]
    fn test_validate_ok() {
        let p = plan(vec![step("a", &[]), step("b", &["a"]), step("c", &["a", "b"])]);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_plan() {
        assert!(plan(vec![]).validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_step_id() {
        let err = plan(vec![step("a", &[]), step("a", &[])]).validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_unknown_dependency() {
        let err = plan(vec![step("a", &["ghost"])]).validate().unwrap_err();
        assert!(err.to_string().contains("unknown step"));
    }

    #[test]
    fn test_validate_rejects_cycle() {
        let err = plan(vec![step("a", &["b"]), step("b", &["a"])]).validate().unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_validate_rejects_self_dependency() {
        let err = plan(vec![step("a", &["a"])]).validate().unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    mockall::mock! {
        pub Model {}

        #[async_trait]
        impl LanguageModel for Model {
            async fn complete(
                &self,
                model: &str,
                messages: &[ChatMessage],
                options: &CompletionOptions,
            ) -> Result<String, CollaboratorError>;

            async fn structured(
                &self,
                model: &str,
                prompt: &str,
                schema: &RootSchema,
                variables: &Map<String, Value>,
            ) -> Result<Value, CollaboratorError>;
        }
    }

    #[tokio::test]
    async fn test_create_plan_happy_path() {
        let mut model = MockModel::new();
        model.expect_structured().returning(|_, _, _, _| {
            Ok(json!({
                "objective": "write a report",
                "steps": [
                    {"id": "s1", "description": "gather data", "action": "search",
                     "expected_output": "raw notes"},
                    {"id": "s2", "description": "draft", "action": "write",
                     "expected_output": "draft text", "dependencies": ["s1"]},
                ]
            }))
        });

        let planner = TaskPlanner::new(Arc::new(model), "test-model");
        let plan = planner.create_plan("write a report", &json!({})).await.unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[1].dependencies, vec!["s1"]);
    }

    #[tokio::test]
    async fn test_create_plan_invalid_shape_is_validation_error() {
        let mut model = MockModel::new();
        model
            .expect_structured()
            .returning(|_, _, _, _| Ok(json!({"objective": "x", "steps": []})));

        let planner = TaskPlanner::new(Arc::new(model), "test-model");
        let err = planner.create_plan("x", &json!({})).await.unwrap_err();
        assert!(matches!(err, PlanError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_plan_collaborator_error_propagates() {
        let mut model = MockModel::new();
        model.expect_structured().returning(|_, _, _, _| {
            Err(CollaboratorError::Unavailable("backend down".to_string()))
        });

        let planner = TaskPlanner::new(Arc::new(model), "test-model");
        let err = planner.create_plan("x", &json!({})).await.unwrap_err();
        assert!(matches!(err, PlanError::Collaborator(_)));
    }
}

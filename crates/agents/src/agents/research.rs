//! Research agent: plans its investigation, works the steps through
//! the think/act/reflect cycle, then distills a structured summary.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use apex_coordination::{MemoryItem, MemoryKind};

use crate::agents::{Agent, AgentConfig, AgentHarness};
use crate::collaborator::{structured_as, LanguageModel};
use crate::error::AgentError;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct ResearchFindings {
    findings: String,
    key_insights: Vec<String>,
    #[serde(default)]
    important_facts: Vec<String>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    confidence: f64,
}

pub struct ResearchAgent {
    harness: AgentHarness,
}

impl ResearchAgent {
    pub fn new(config: AgentConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            harness: AgentHarness::new(config, model),
        }
    }

    async fn run(&self, execution: Uuid, objective: &str, context: &Value) -> Result<Value, AgentError> {
        let plan = self.harness.create_plan(objective, context).await?;
        self.harness
            .attach_plan(execution, serde_json::to_value(&plan).unwrap_or(Value::Null))
            .await;

        let mut step_notes = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            debug!(step = %step.id, "researching step");
            let thought = self
                .harness
                .think(&format!("{} (toward: {objective})", step.description))
                .await?;
            self.harness
                .act(&step.action, &Value::Object(step.input.clone()))
                .await?;
            let insight = self.harness.reflect(&thought).await?;
            self.harness.add_iteration(execution).await;
            step_notes.push(json!({
                "step": step.id,
                "note": thought,
                "insight": insight,
            }));
        }

        let notes_text = step_notes
            .iter()
            .map(|n| n["note"].as_str().unwrap_or_default().to_string())
            .collect::<Vec<_>>()
            .join("\n---\n");

        let mut variables = Map::new();
        variables.insert("objective".to_string(), Value::String(objective.to_string()));
        variables.insert("notes".to_string(), Value::String(notes_text));

        let findings: ResearchFindings = structured_as(
            self.harness.model().as_ref(),
            &self.harness.config().model,
            "Distill the research notes into findings.\n\n\
             Objective: {{objective}}\n\nNotes:\n{{notes}}",
            &variables,
        )
        .await?;

        let result = json!({
            "findings": findings.findings,
            "key_insights": findings.key_insights,
            "important_facts": findings.important_facts,
            "sources": findings.sources,
            "recommendations": findings.recommendations,
            "confidence": findings.confidence,
            "steps": step_notes,
        });

        self.harness
            .remember(MemoryItem::new(
                MemoryKind::LongTerm,
                format!("Research on '{objective}': {}", findings.findings),
                0.8,
            ))
            .await;

        Ok(result)
    }
}

#[async_trait]
impl Agent for ResearchAgent {
    fn harness(&self) -> &AgentHarness {
        &self.harness
    }

    async fn execute(&self, objective: &str, context: &Value) -> Result<Value, AgentError> {
        let execution = self.harness.begin_execution(objective).await;
        match self.run(execution, objective, context).await {
            Ok(result) => {
                self.harness.complete_execution(execution, result.clone()).await;
                Ok(result)
            }
            Err(err) => {
                self.harness.fail_execution(execution, &err.to_string()).await;
                Err(err)
            }
        }
    }
}

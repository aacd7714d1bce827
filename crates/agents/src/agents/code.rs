//! Code agent: produces code with an explanation and test notes.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use apex_coordination::{MemoryItem, MemoryKind};

use crate::agents::{Agent, AgentConfig, AgentHarness};
use crate::collaborator::{structured_as, LanguageModel};
use crate::error::AgentError;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct CodeOutput {
    language: String,
    code: String,
    explanation: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    test_cases: Option<String>,
}

pub struct CodeAgent {
    harness: AgentHarness,
}

impl CodeAgent {
    pub fn new(config: AgentConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            harness: AgentHarness::new(config, model),
        }
    }

    async fn run(&self, objective: &str, context: &Value) -> Result<Value, AgentError> {
        let language = context
            .get("language")
            .and_then(Value::as_str)
            .unwrap_or("rust");
        let existing = context
            .get("existing_code")
            .and_then(Value::as_str)
            .unwrap_or("");

        let mut variables = Map::new();
        variables.insert("objective".to_string(), Value::String(objective.to_string()));
        variables.insert("language".to_string(), Value::String(language.to_string()));
        variables.insert("existing".to_string(), Value::String(existing.to_string()));

        let output: CodeOutput = structured_as(
            self.harness.model().as_ref(),
            &self.harness.config().model,
            "Write {{language}} code for the objective. Include an \
             explanation and, when useful, tests.\n\n\
             Objective: {{objective}}\nExisting code:\n{{existing}}",
            &variables,
        )
        .await?;

        self.harness
            .remember(MemoryItem::new(
                MemoryKind::LongTerm,
                format!("Implemented '{objective}' in {}", output.language),
                0.7,
            ))
            .await;

        Ok(json!({
            "language": output.language,
            "code": output.code,
            "explanation": output.explanation,
            "dependencies": output.dependencies,
            "test_cases": output.test_cases,
        }))
    }
}

#[async_trait]
impl Agent for CodeAgent {
    fn harness(&self) -> &AgentHarness {
        &self.harness
    }

    async fn execute(&self, objective: &str, context: &Value) -> Result<Value, AgentError> {
        let execution = self.harness.begin_execution(objective).await;
        match self.run(objective, context).await {
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

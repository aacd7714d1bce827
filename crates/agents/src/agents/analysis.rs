//! Analysis agent: one structured pass over the provided data.

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
struct AnalysisReport {
    summary: String,
    patterns: Vec<String>,
    #[serde(default)]
    anomalies: Vec<String>,
    #[serde(default)]
    predictions: Vec<String>,
    recommendations: Vec<String>,
    confidence: f64,
}

pub struct AnalysisAgent {
    harness: AgentHarness,
}

impl AnalysisAgent {
    pub fn new(config: AgentConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            harness: AgentHarness::new(config, model),
        }
    }

    async fn run(&self, objective: &str, context: &Value) -> Result<Value, AgentError> {
        let data = context.get("data").cloned().unwrap_or_else(|| context.clone());

        let mut variables = Map::new();
        variables.insert("objective".to_string(), Value::String(objective.to_string()));
        variables.insert("data".to_string(), data);

        let report: AnalysisReport = structured_as(
            self.harness.model().as_ref(),
            &self.harness.config().model,
            "Analyze the data for the stated objective. Summarize, then \
             report recurring patterns, anomalies, predictions, and \
             recommendations.\n\n\
             Objective: {{objective}}\nData: {{data}}",
            &variables,
        )
        .await?;

        self.harness
            .remember(MemoryItem::new(
                MemoryKind::LongTerm,
                format!("Analysis of '{objective}': {}", report.summary),
                0.7,
            ))
            .await;

        Ok(json!({
            "summary": report.summary,
            "patterns": report.patterns,
            "anomalies": report.anomalies,
            "predictions": report.predictions,
            "recommendations": report.recommendations,
            "confidence": report.confidence,
        }))
    }
}

#[async_trait]
impl Agent for AnalysisAgent {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::ExecutionStatus;
    use crate::collaborator::{ChatMessage, CollaboratorError, CompletionOptions};
    use apex_coordination::AgentKind;

    struct Canned(&'static str);

    #[async_trait]
    impl LanguageModel for Canned {
        async fn complete(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> Result<String, CollaboratorError> {
            Ok(self.0.to_string())
        }
    }

    const REPORT: &str = r#"{
        "summary": "traffic doubles at noon",
        "patterns": ["daily cycle"],
        "anomalies": ["spike on day 3"],
        "predictions": ["next peak at noon tomorrow"],
        "recommendations": ["scale at 11:30"],
        "confidence": 0.9
    }"#;

    #[tokio::test]
    async fn test_execute_returns_report_fields() {
        let agent = AnalysisAgent::new(
            AgentConfig::new("analyst", AgentKind::Analysis, "test-model"),
            Arc::new(Canned(REPORT)),
        );

        let result = agent
            .execute("find load patterns", &json!({"data": [1, 2, 3]}))
            .await
            .unwrap();
        assert_eq!(result["summary"], "traffic doubles at noon");
        assert_eq!(result["predictions"][0], "next peak at noon tomorrow");
        assert_eq!(result["confidence"], 0.9);

        let executions = agent.harness().executions().await;
        assert_eq!(executions[0].status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn test_execute_stores_long_term_memory() {
        let agent = AnalysisAgent::new(
            AgentConfig::new("analyst", AgentKind::Analysis, "test-model"),
            Arc::new(Canned(REPORT)),
        );
        agent.execute("find load patterns", &json!({})).await.unwrap();

        let memories = agent.harness().memory_snapshot().await;
        assert!(memories.iter().any(|m| m.kind == MemoryKind::LongTerm
            && (m.importance - 0.7).abs() < f64::EPSILON));
    }

    #[tokio::test]
    async fn test_execute_rejects_malformed_reply() {
        let agent = AnalysisAgent::new(
            AgentConfig::new("analyst", AgentKind::Analysis, "test-model"),
            Arc::new(Canned("not json at all")),
        );
        assert!(agent.execute("x", &json!({})).await.is_err());

        let executions = agent.harness().executions().await;
        assert_eq!(executions[0].status, ExecutionStatus::Failed);
    }
}

//! Decision, communication, and monitoring agents.
//!
//! The monitoring agent computes anomaly status from metric thresholds
//! locally; the model only fills in trends and recommendations and is
//! never allowed to downgrade a locally detected anomaly.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use apex_coordination::{MemoryItem, MemoryKind};

use crate::agents::{Agent, AgentConfig, AgentHarness};
use crate::collaborator::{structured_as, LanguageModel};
use crate::error::AgentError;

// ---------------------------------------------------------------------------
// Decision agent
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct OptionEvaluation {
    score: f64,
    #[serde(default)]
    pros: Vec<String>,
    #[serde(default)]
    cons: Vec<String>,
    #[serde(default)]
    risks: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct DecisionOutcome {
    recommendation: String,
    rationale: String,
    evaluations: BTreeMap<String, OptionEvaluation>,
    #[serde(default)]
    alternatives: Vec<String>,
    confidence: f64,
}

pub struct DecisionAgent {
    harness: AgentHarness,
}

impl DecisionAgent {
    pub fn new(config: AgentConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            harness: AgentHarness::new(config, model),
        }
    }

    async fn run(&self, objective: &str, context: &Value) -> Result<Value, AgentError> {
        let options = context
            .get("options")
            .and_then(Value::as_array)
            .filter(|o| !o.is_empty())
            .ok_or_else(|| AgentError::MissingInput("options".to_string()))?;
        let criteria = context
            .get("criteria")
            .and_then(Value::as_array)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AgentError::MissingInput("criteria".to_string()))?;

        let mut variables = Map::new();
        variables.insert("objective".to_string(), Value::String(objective.to_string()));
        variables.insert("options".to_string(), Value::Array(options.clone()));
        variables.insert("criteria".to_string(), Value::Array(criteria.clone()));

        let outcome: DecisionOutcome = structured_as(
            self.harness.model().as_ref(),
            &self.harness.config().model,
            "Evaluate each option against each criterion, with pros, cons, \
             and risks per option, then recommend one.\n\n\
             Objective: {{objective}}\nOptions: {{options}}\nCriteria: {{criteria}}",
            &variables,
        )
        .await?;

        self.harness
            .remember(MemoryItem::new(
                MemoryKind::LongTerm,
                format!(
                    "Decided '{}' for '{objective}': {}",
                    outcome.recommendation, outcome.rationale
                ),
                0.8,
            ))
            .await;

        Ok(json!({
            "recommendation": outcome.recommendation,
            "rationale": outcome.rationale,
            "evaluations": outcome.evaluations,
            "alternatives": outcome.alternatives,
            "confidence": outcome.confidence,
        }))
    }
}

#[async_trait]
impl Agent for DecisionAgent {
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

// ---------------------------------------------------------------------------
// Communication agent
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct Message {
    #[serde(default)]
    subject: Option<String>,
    body: String,
    #[serde(default)]
    call_to_action: Option<String>,
    #[serde(default)]
    estimated_response_time: Option<String>,
}

pub struct CommunicationAgent {
    harness: AgentHarness,
}

impl CommunicationAgent {
    pub fn new(config: AgentConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            harness: AgentHarness::new(config, model),
        }
    }

    async fn run(&self, objective: &str, context: &Value) -> Result<Value, AgentError> {
        let recipient = context
            .get("recipient")
            .and_then(Value::as_str)
            .unwrap_or("the team");
        let tone = context
            .get("tone")
            .and_then(Value::as_str)
            .unwrap_or("professional");

        let mut variables = Map::new();
        variables.insert("objective".to_string(), Value::String(objective.to_string()));
        variables.insert("recipient".to_string(), Value::String(recipient.to_string()));
        variables.insert("tone".to_string(), Value::String(tone.to_string()));

        let message: Message = structured_as(
            self.harness.model().as_ref(),
            &self.harness.config().model,
            "Compose a message.\n\nObjective: {{objective}}\n\
             Recipient: {{recipient}}\nTone: {{tone}}",
            &variables,
        )
        .await?;

        self.harness
            .remember(MemoryItem::new(
                MemoryKind::LongTerm,
                format!(
                    "Messaged {recipient}: {}",
                    message.subject.as_deref().unwrap_or(objective)
                ),
                0.5,
            ))
            .await;

        Ok(json!({
            "subject": message.subject,
            "body": message.body,
            "call_to_action": message.call_to_action,
            "estimated_response_time": message.estimated_response_time,
            "recipient": recipient,
            "tone": tone,
        }))
    }
}

#[async_trait]
impl Agent for CommunicationAgent {
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

// ---------------------------------------------------------------------------
// Monitoring agent
// ---------------------------------------------------------------------------

/// Anomaly severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

/// A metric value that crossed its threshold.
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
}

/// Compare metrics against thresholds. A value strictly above its
/// threshold is an anomaly; at or beyond 1.5x the threshold the
/// severity escalates to critical. Metrics with no configured
/// threshold are skipped.
pub fn detect_anomalies(metrics: &Map<String, Value>, thresholds: &Map<String, Value>) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    for (metric, value) in metrics {
        let Some(value) = value.as_f64() else { continue };
        let Some(threshold) = thresholds.get(metric).and_then(Value::as_f64) else {
            continue;
        };
        if value > threshold {
            let severity = if value >= threshold * 1.5 {
                Severity::Critical
            } else {
                Severity::Warning
            };
            anomalies.push(Anomaly {
                metric: metric.clone(),
                value,
                threshold,
                severity,
            });
        }
    }
    anomalies
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct MonitoringAssessment {
    #[serde(default)]
    trends: Vec<String>,
    #[serde(default)]
    alerts: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

pub struct MonitoringAgent {
    harness: AgentHarness,
}

impl MonitoringAgent {
    pub fn new(config: AgentConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            harness: AgentHarness::new(config, model),
        }
    }

    async fn run(&self, objective: &str, context: &Value) -> Result<Value, AgentError> {
        let metrics = context
            .get("metrics")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| AgentError::MissingInput("metrics".to_string()))?;
        let thresholds = context
            .get("thresholds")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let anomalies = detect_anomalies(&metrics, &thresholds);
        let critical = anomalies.iter().any(|a| a.severity == Severity::Critical);
        let status = if critical {
            "critical"
        } else if anomalies.is_empty() {
            "healthy"
        } else {
            "warning"
        };

        for anomaly in &anomalies {
            warn!(
                metric = %anomaly.metric,
                value = anomaly.value,
                threshold = anomaly.threshold,
                severity = ?anomaly.severity,
                "threshold exceeded"
            );
        }

        let mut variables = Map::new();
        variables.insert("objective".to_string(), Value::String(objective.to_string()));
        variables.insert("metrics".to_string(), Value::Object(metrics));
        variables.insert(
            "anomalies".to_string(),
            serde_json::to_value(&anomalies).unwrap_or_default(),
        );

        let assessment: MonitoringAssessment = structured_as(
            self.harness.model().as_ref(),
            &self.harness.config().model,
            "Assess the monitored metrics. Detected anomalies are already \
             confirmed; describe trends, alerts, and recommendations.\n\n\
             Objective: {{objective}}\nMetrics: {{metrics}}\n\
             Anomalies: {{anomalies}}",
            &variables,
        )
        .await?;

        let importance = if critical { 1.0 } else { 0.5 };
        self.harness
            .remember(MemoryItem::new(
                MemoryKind::LongTerm,
                format!("Monitoring '{objective}': status {status}, {} anomalies", anomalies.len()),
                importance,
            ))
            .await;

        Ok(json!({
            "status": status,
            "anomalies": anomalies,
            "trends": assessment.trends,
            "alerts": assessment.alerts,
            "recommendations": assessment.recommendations,
        }))
    }
}

#[async_trait]
impl Agent for MonitoringAgent {
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

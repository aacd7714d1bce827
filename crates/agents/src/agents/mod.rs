//! Agent core: configuration, execution records, the shared harness,
//! the `Agent` trait, and the factory that builds specialized agents.
//!
//! Every agent owns a memory store and an execution history behind the
//! harness. Variants differ only in their `execute` body; the
//! think/act/reflect cycle and the execution bookkeeping are shared.

pub mod analysis;
pub mod code;
pub mod research;
pub mod specialists;
pub mod writing;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use apex_coordination::{
    AgentKind, AgentProfile, MemoryConfig, MemoryItem, MemoryKind, MemoryStore,
};

use crate::collaborator::{ChatMessage, CollaboratorError, CompletionOptions, LanguageModel};
use crate::error::AgentError;
use crate::planner::{PlanError, TaskPlan, TaskPlanner};

pub use analysis::AnalysisAgent;
pub use code::CodeAgent;
pub use research::ResearchAgent;
pub use specialists::{CommunicationAgent, DecisionAgent, MonitoringAgent};
pub use writing::WritingAgent;

/// Static configuration for one agent instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub kind: AgentKind,
    /// Model name passed through to the collaborator.
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

fn default_temperature() -> f64 {
    0.7
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, kind: AgentKind, model: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: format!("{}-{}", name, Uuid::new_v4()),
            name,
            kind,
            model: model.into(),
            temperature: default_temperature(),
            tools: Vec::new(),
            capabilities: apex_coordination::default_capabilities(kind)
                .into_iter()
                .collect(),
            constraints: Vec::new(),
        }
    }
}

/// Terminal state of one execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

/// One recorded `execute` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecution {
    pub id: Uuid,
    pub agent_id: String,
    pub objective: String,
    /// The plan driving this execution, when the variant made one.
    pub plan: Option<Value>,
    pub status: ExecutionStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub iterations: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Shared state and behavior behind every agent variant.
pub struct AgentHarness {
    config: AgentConfig,
    model: Arc<dyn LanguageModel>,
    memory: Mutex<MemoryStore>,
    executions: Mutex<Vec<AgentExecution>>,
}

impl AgentHarness {
    pub fn new(config: AgentConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            config,
            model,
            memory: Mutex::new(MemoryStore::with_config(MemoryConfig::default())),
            executions: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    fn identity(&self) -> String {
        format!(
            "You are {}, a {} agent. Capabilities: {}.",
            self.config.name,
            self.config.kind,
            self.config.capabilities.join(", ")
        )
    }

    /// One planning call against this agent's configured model.
    pub async fn create_plan(&self, objective: &str, context: &Value) -> Result<TaskPlan, PlanError> {
        TaskPlanner::new(Arc::clone(&self.model), self.config.model.clone())
            .create_plan(objective, context)
            .await
    }

    /// Reason about a prompt with recent relevant memories in view.
    /// The exchange is stored as a short-term memory.
    pub async fn think(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let recalled = {
            let memory = self.memory.lock().await;
            memory
                .relevant(prompt, 3)
                .into_iter()
                .map(|m| format!("- {}", m.content))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let mut system = self.identity();
        if !recalled.is_empty() {
            system.push_str("\n\nRelevant memories:\n");
            system.push_str(&recalled);
        }

        let messages = [ChatMessage::system(system), ChatMessage::user(prompt)];
        let options = CompletionOptions::with_temperature(self.config.temperature);
        let reply = self
            .model
            .complete(&self.config.model, &messages, &options)
            .await?;

        let mut memory = self.memory.lock().await;
        memory.add(MemoryItem::new(
            MemoryKind::ShortTerm,
            format!("Thought about: {prompt}\nConclusion: {reply}"),
            0.5,
        ));
        Ok(reply)
    }

    /// Record an action as an episodic memory and acknowledge it.
    pub async fn act(&self, action: &str, input: &Value) -> Result<Value, CollaboratorError> {
        debug!(agent = %self.config.name, action, "acting");
        let mut memory = self.memory.lock().await;
        memory.add(MemoryItem::new(
            MemoryKind::Episodic,
            format!("Action: {action} with input {input}"),
            0.7,
        ));
        Ok(json!({
            "action": action,
            "input": input,
            "status": "executed",
        }))
    }

    /// Think about an outcome and persist the insight semantically.
    pub async fn reflect(&self, outcome: &str) -> Result<String, CollaboratorError> {
        let prompt = format!(
            "Reflect on this outcome and extract one reusable insight:\n{outcome}"
        );
        let insight = self.think(&prompt).await?;
        let mut memory = self.memory.lock().await;
        memory.add(MemoryItem::new(MemoryKind::Semantic, insight.clone(), 0.8));
        Ok(insight)
    }

    pub async fn remember(&self, item: MemoryItem) {
        let mut memory = self.memory.lock().await;
        memory.add(item);
    }

    pub async fn recall(&self, query: &str, limit: usize) -> Vec<MemoryItem> {
        let memory = self.memory.lock().await;
        memory.relevant(query, limit)
    }

    pub async fn clear_short_term(&self) {
        let mut memory = self.memory.lock().await;
        memory.clear_short_term();
    }

    pub async fn memory_snapshot(&self) -> Vec<MemoryItem> {
        let memory = self.memory.lock().await;
        memory.all()
    }

    /// Open an execution record. The returned id is handed back to
    /// `complete_execution` or `fail_execution`, which set the terminal
    /// state exactly once.
    pub async fn begin_execution(&self, objective: &str) -> Uuid {
        let record = AgentExecution {
            id: Uuid::new_v4(),
            agent_id: self.config.id.clone(),
            objective: objective.to_string(),
            plan: None,
            status: ExecutionStatus::Running,
            result: None,
            error: None,
            iterations: 0,
            started_at: Utc::now(),
            finished_at: None,
        };
        let id = record.id;
        info!(agent = %self.config.name, %id, objective, "execution started");
        self.executions.lock().await.push(record);
        id
    }

    /// Attach the plan driving a running execution.
    pub async fn attach_plan(&self, id: Uuid, plan: Value) {
        let mut executions = self.executions.lock().await;
        if let Some(record) = executions
            .iter_mut()
            .find(|r| r.id == id && r.status == ExecutionStatus::Running)
        {
            record.plan = Some(plan);
        }
    }

    /// Count one work iteration (a plan step, a revision pass).
    pub async fn add_iteration(&self, id: Uuid) {
        let mut executions = self.executions.lock().await;
        if let Some(record) = executions
            .iter_mut()
            .find(|r| r.id == id && r.status == ExecutionStatus::Running)
        {
            record.iterations += 1;
        }
    }

    pub async fn complete_execution(&self, id: Uuid, result: Value) {
        let mut executions = self.executions.lock().await;
        if let Some(record) = executions
            .iter_mut()
            .find(|r| r.id == id && r.status == ExecutionStatus::Running)
        {
            record.status = ExecutionStatus::Completed;
            record.result = Some(result);
            record.finished_at = Some(Utc::now());
            info!(agent = %self.config.name, %id, "execution completed");
        }
    }

    pub async fn fail_execution(&self, id: Uuid, error: &str) {
        let mut executions = self.executions.lock().await;
        if let Some(record) = executions
            .iter_mut()
            .find(|r| r.id == id && r.status == ExecutionStatus::Running)
        {
            record.status = ExecutionStatus::Failed;
            record.error = Some(error.to_string());
            record.finished_at = Some(Utc::now());
            info!(agent = %self.config.name, %id, error, "execution failed");
        }
    }

    pub async fn executions(&self) -> Vec<AgentExecution> {
        self.executions.lock().await.clone()
    }
}

/// Common surface of every agent variant.
#[async_trait]
pub trait Agent: Send + Sync {
    fn harness(&self) -> &AgentHarness;

    /// Run the agent's specialized behavior against an objective.
    async fn execute(&self, objective: &str, context: &Value) -> Result<Value, AgentError>;

    fn kind(&self) -> AgentKind {
        self.harness().config().kind
    }

    fn name(&self) -> &str {
        &self.harness().config().name
    }

    /// Coordination-facing view of this agent.
    fn profile(&self) -> AgentProfile {
        let config = self.harness().config();
        AgentProfile {
            id: config.id.clone(),
            kind: config.kind,
            capabilities: config.capabilities.iter().cloned().collect(),
        }
    }

    /// Read-only memory introspection.
    async fn memories(&self) -> Vec<MemoryItem> {
        self.harness().memory_snapshot().await
    }

    /// Drop working memory; long-term entries survive.
    async fn clear_memory(&self) {
        self.harness().clear_short_term().await;
    }
}

/// Builds the specialized agent for a configuration's kind.
pub struct AgentFactory {
    model: Arc<dyn LanguageModel>,
}

impl AgentFactory {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn create(&self, config: AgentConfig) -> Arc<dyn Agent> {
        let model = Arc::clone(&self.model);
        match config.kind {
            AgentKind::Research => Arc::new(ResearchAgent::new(config, model)),
            AgentKind::Analysis => Arc::new(AnalysisAgent::new(config, model)),
            AgentKind::Writing => Arc::new(WritingAgent::new(config, model)),
            AgentKind::Code => Arc::new(CodeAgent::new(config, model)),
            AgentKind::Decision => Arc::new(DecisionAgent::new(config, model)),
            AgentKind::Communication => Arc::new(CommunicationAgent::new(config, model)),
            AgentKind::Monitoring => Arc::new(MonitoringAgent::new(config, model)),
            // Orchestrator-kind members fall back to analysis behavior;
            // the orchestrator itself is a separate type.
            AgentKind::Orchestrator => Arc::new(AnalysisAgent::new(config, model)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::CompletionOptions;
    use schemars::schema::RootSchema;
    use serde_json::Map;

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

    struct Failing;

    #[async_trait]
    impl LanguageModel for Failing {
        async fn complete(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Unavailable("offline".to_string()))
        }

        async fn structured(
            &self,
            _model: &str,
            _prompt: &str,
            _schema: &RootSchema,
            _variables: &Map<String, Value>,
        ) -> Result<Value, CollaboratorError> {
            Err(CollaboratorError::Unavailable("offline".to_string()))
        }
    }

    fn harness(reply: &'static str) -> AgentHarness {
        let config = AgentConfig::new("tester", AgentKind::Analysis, "test-model");
        AgentHarness::new(config, Arc::new(Canned(reply)))
    }

    #[tokio::test]
    async fn test_think_stores_short_term_memory() {
        let h = harness("a conclusion");
        let reply = h.think("what is up").await.unwrap();
        assert_eq!(reply, "a conclusion");

        let snapshot = h.memory_snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].kind, MemoryKind::ShortTerm);
        assert!(snapshot[0].content.contains("a conclusion"));
    }

    #[tokio::test]
    async fn test_act_records_episodic_memory() {
        let h = harness("unused");
        let ack = h.act("search", &json!({"query": "rust"})).await.unwrap();
        assert_eq!(ack["status"], "executed");

        let snapshot = h.memory_snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].kind, MemoryKind::Episodic);
        assert!((snapshot[0].importance - 0.7).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_reflect_stores_semantic_insight() {
        let h = harness("the insight");
        let insight = h.reflect("search went well").await.unwrap();
        assert_eq!(insight, "the insight");

        let snapshot = h.memory_snapshot().await;
        assert!(snapshot
            .iter()
            .any(|m| m.kind == MemoryKind::Semantic && m.content == "the insight"));
    }

    #[tokio::test]
    async fn test_execution_records_set_terminal_state_once() {
        let h = harness("ok");
        let id = h.begin_execution("do a thing").await;
        h.complete_execution(id, json!({"done": true})).await;
        // A late failure report must not overwrite the completed state.
        h.fail_execution(id, "too late").await;

        let executions = h.executions().await;
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].status, ExecutionStatus::Completed);
        assert!(executions[0].error.is_none());
    }

    #[tokio::test]
    async fn test_fail_execution_records_error() {
        let h = harness("ok");
        let id = h.begin_execution("doomed").await;
        h.fail_execution(id, "backend down").await;

        let executions = h.executions().await;
        assert_eq!(executions[0].status, ExecutionStatus::Failed);
        assert_eq!(executions[0].error.as_deref(), Some("backend down"));
    }

    #[tokio::test]
    async fn test_think_propagates_collaborator_error() {
        let config = AgentConfig::new("tester", AgentKind::Analysis, "test-model");
        let h = AgentHarness::new(config, Arc::new(Failing));
        assert!(h.think("anything").await.is_err());
    }

    #[test]
    fn test_factory_builds_each_kind() {
        let factory = AgentFactory::new(Arc::new(Canned("ok")));
        for &kind in AgentKind::all() {
            let agent = factory.create(AgentConfig::new("a", kind, "m"));
            assert_eq!(agent.kind(), kind);
        }
    }

    #[test]
    fn test_config_gets_default_capabilities() {
        let config = AgentConfig::new("r", AgentKind::Research, "m");
        assert!(config.capabilities.iter().any(|c| c == "web_search"));
        assert!(config.id.starts_with("r-"));
    }
}

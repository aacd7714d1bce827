//! Concurrent agent swarm.
//!
//! A swarm decomposes one task into subtasks, assigns them to members
//! under the configured coordination strategy, fans the work out
//! concurrently, and folds the contributions into a consensus-scored
//! result. Unlike sequential orchestration, a swarm run always
//! completes: member failures become zero-confidence contributions
//! instead of aborting the run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use apex_coordination::{
    auction_assign, capability_assign, consensus_level, estimated_cost, validate_subtasks,
    AgentContribution, AgentKind, AgentProfile, CoordinationStrategy, MessageKind, MessageLog,
    PlaceholderBids, Protocol, Subtask, TaskAssignment,
};

use crate::agents::Agent;
use crate::collaborator::{structured_as, ChatMessage, CompletionOptions, LanguageModel};
use crate::error::SwarmError;

/// Overall communication shape of the swarm. Only affects how members
/// are described to the decomposition call today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SwarmTopology {
    Hierarchical,
    #[default]
    Collaborative,
    Competitive,
    Mesh,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SwarmSettings {
    pub topology: SwarmTopology,
    pub strategy: CoordinationStrategy,
    pub protocol: Protocol,
}

/// One member: coordination-facing profile plus the agent behind it.
#[derive(Clone)]
pub struct SwarmMember {
    pub profile: AgentProfile,
    pub agent: Arc<dyn Agent>,
}

impl SwarmMember {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        let profile = agent.profile();
        Self { profile, agent }
    }
}

/// Model reply for task decomposition.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct Decomposition {
    subtasks: Vec<SubtaskSpec>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct SubtaskSpec {
    #[serde(default)]
    id: Option<String>,
    description: String,
    #[serde(default)]
    required_capabilities: Vec<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    priority: u32,
}

impl SubtaskSpec {
    fn into_subtask(self) -> Subtask {
        Subtask {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            description: self.description,
            required_capabilities: self.required_capabilities.into_iter().collect(),
            dependencies: self.dependencies,
            priority: self.priority,
        }
    }
}

/// Final outcome of one swarm run.
#[derive(Debug, Clone, Serialize)]
pub struct SwarmResult {
    pub objective: String,
    pub result: String,
    pub contributions: Vec<AgentContribution>,
    pub consensus_level: f64,
    pub execution_time_ms: u64,
    pub estimated_cost: f64,
}

pub struct AgentSwarm {
    name: String,
    settings: SwarmSettings,
    members: Vec<SwarmMember>,
    model: Arc<dyn LanguageModel>,
    model_name: String,
    log: Arc<MessageLog>,
}

impl AgentSwarm {
    pub fn new(
        name: impl Into<String>,
        settings: SwarmSettings,
        model: Arc<dyn LanguageModel>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            members: Vec::new(),
            model,
            model_name: model_name.into(),
            log: Arc::new(MessageLog::new()),
        }
    }

    /// Build a swarm with its full roster in one call.
    pub fn create(
        name: impl Into<String>,
        settings: SwarmSettings,
        members: Vec<SwarmMember>,
        model: Arc<dyn LanguageModel>,
        model_name: impl Into<String>,
    ) -> Self {
        let mut swarm = Self::new(name, settings, model, model_name);
        for member in members {
            swarm.add_member(member);
        }
        swarm
    }

    pub fn add_member(&mut self, member: SwarmMember) {
        info!(swarm = %self.name, agent = %member.profile.id, kind = %member.profile.kind, "member added");
        self.members.push(member);
    }

    pub fn members(&self) -> &[SwarmMember] {
        &self.members
    }

    pub fn message_log(&self) -> &Arc<MessageLog> {
        &self.log
    }

    /// One structured call turning the task into validated subtasks.
    async fn decompose(&self, task: &str) -> Result<Vec<Subtask>, SwarmError> {
        let roster = self
            .members
            .iter()
            .map(|m| {
                format!(
                    "{} ({}): {}",
                    m.profile.id,
                    m.profile.kind,
                    m.profile
                        .capabilities
                        .iter()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut variables = Map::new();
        variables.insert("task".to_string(), Value::String(task.to_string()));
        variables.insert("roster".to_string(), Value::String(roster));

        let decomposition: Decomposition = structured_as(
            self.model.as_ref(),
            &self.model_name,
            "Decompose the task into independent subtasks for the agents \
             below. Name the capabilities each subtask requires.\n\n\
             Task: {{task}}\n\nAgents:\n{{roster}}",
            &variables,
        )
        .await?;

        let subtasks: Vec<Subtask> = decomposition
            .subtasks
            .into_iter()
            .map(SubtaskSpec::into_subtask)
            .collect();
        validate_subtasks(&subtasks)?;
        Ok(subtasks)
    }

    /// Map subtasks to members under the configured strategy.
    async fn assign(&self, subtasks: &[Subtask]) -> Result<Vec<TaskAssignment>, SwarmError> {
        let roster: Vec<AgentProfile> =
            self.members.iter().map(|m| m.profile.clone()).collect();
        match self.settings.strategy {
            CoordinationStrategy::Auction => {
                Ok(auction_assign(subtasks, &roster, &PlaceholderBids)?)
            }
            CoordinationStrategy::Democratic | CoordinationStrategy::Consensus => {
                Ok(capability_assign(subtasks, &roster)?)
            }
            CoordinationStrategy::LeaderBased => self.leader_assign(subtasks).await,
        }
    }

    /// Ask the leader to produce an assignment plan. The plan is logged
    /// but the parsing step is not built yet, so this always errors.
    async fn leader_assign(&self, subtasks: &[Subtask]) -> Result<Vec<TaskAssignment>, SwarmError> {
        let leader = self
            .members
            .iter()
            .find(|m| m.profile.kind == AgentKind::Orchestrator)
            .or_else(|| self.members.first())
            .ok_or(SwarmError::NoMembers)?;

        let listing = subtasks
            .iter()
            .map(|s| format!("- {}: {}", s.id, s.description))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = [
            ChatMessage::system("You are the swarm leader. Assign each subtask to a member."),
            ChatMessage::user(format!("Subtasks:\n{listing}")),
        ];
        let raw_plan = self
            .model
            .complete(&self.model_name, &messages, &CompletionOptions::default())
            .await?;

        self.log.record(
            self.settings.protocol,
            apex_coordination::SwarmMessage::new(
                leader.profile.id.clone(),
                "*",
                MessageKind::Result,
                json!({"leader_plan": raw_plan}),
            ),
        );
        warn!(swarm = %self.name, "leader plan received but not parseable");
        Err(SwarmError::LeaderPlanUnparsed(raw_plan))
    }

    /// Decompose, assign, fan out, and synthesize.
    pub async fn execute(&self, task: &str) -> Result<SwarmResult, SwarmError> {
        if self.members.is_empty() {
            return Err(SwarmError::NoMembers);
        }
        let started = Instant::now();
        info!(swarm = %self.name, task, strategy = %self.settings.strategy, "swarm run started");

        let subtasks = self.decompose(task).await?;
        let assignments = self.assign(&subtasks).await?;

        self.log.record(
            self.settings.protocol,
            apex_coordination::SwarmMessage::to_all(
                "swarm",
                MessageKind::Request,
                json!({"task": task, "subtasks": subtasks.len()}),
            ),
        );

        let agents: BTreeMap<String, (AgentKind, Arc<dyn Agent>)> = self
            .members
            .iter()
            .map(|m| {
                (
                    m.profile.id.clone(),
                    (m.profile.kind, Arc::clone(&m.agent)),
                )
            })
            .collect();

        let mut tasks = JoinSet::new();
        for (index, assignment) in assignments.iter().enumerate() {
            let Some((kind, agent)) = agents.get(&assignment.agent_id) else {
                continue;
            };
            let kind = *kind;
            let agent = Arc::clone(agent);
            let agent_id = assignment.agent_id.clone();
            let description = assignment.subtask.description.clone();
            let context = json!({
                "task": task,
                "subtask_id": assignment.subtask.id,
                "required_capabilities": assignment.subtask.required_capabilities,
            });

            tasks.spawn(async move {
                let outcome = std::panic::AssertUnwindSafe(agent.execute(&description, &context))
                    .catch_unwind()
                    .await;
                let contribution = match outcome {
                    Ok(Ok(result)) => {
                        let confidence = result
                            .get("confidence")
                            .and_then(Value::as_f64)
                            .unwrap_or(0.8);
                        AgentContribution::success(
                            agent_id,
                            kind,
                            result,
                            confidence,
                            format!("Completed subtask: {description}"),
                        )
                    }
                    Ok(Err(err)) => AgentContribution::failure(agent_id, kind, &err.to_string()),
                    Err(_) => AgentContribution::failure(agent_id, kind, "task panicked"),
                };
                (index, contribution)
            });
        }

        let mut indexed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok(entry) = joined {
                indexed.push(entry);
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        let contributions: Vec<AgentContribution> =
            indexed.into_iter().map(|(_, c)| c).collect();

        for contribution in contributions.iter().filter(|c| c.is_success()) {
            self.log.record(
                self.settings.protocol,
                apex_coordination::SwarmMessage::to_all(
                    contribution.agent_id.clone(),
                    MessageKind::Result,
                    contribution.contribution.clone().unwrap_or(Value::Null),
                ),
            );
        }

        let result = self.synthesize(task, &contributions).await?;
        let consensus = consensus_level(&contributions);
        let cost = estimated_cost(contributions.len());
        let elapsed = started.elapsed().as_millis() as u64;
        info!(
            swarm = %self.name,
            contributions = contributions.len(),
            consensus,
            "swarm run finished"
        );

        Ok(SwarmResult {
            objective: task.to_string(),
            result,
            contributions,
            consensus_level: consensus,
            execution_time_ms: elapsed,
            estimated_cost: cost,
        })
    }

    async fn synthesize(
        &self,
        task: &str,
        contributions: &[AgentContribution],
    ) -> Result<String, SwarmError> {
        let digest = contributions
            .iter()
            .map(|c| {
                format!(
                    "[{} / {}] confidence {:.2}: {}",
                    c.agent_id,
                    c.agent_kind,
                    c.confidence,
                    c.contribution
                        .as_ref()
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| c.reasoning.clone())
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let messages = [
            ChatMessage::system(
                "Combine the swarm contributions into one coherent answer. \
                 Weigh higher-confidence contributions more heavily.",
            ),
            ChatMessage::user(format!("Task: {task}\n\nContributions:\n{digest}")),
        ];
        let result = self
            .model
            .complete(&self.model_name, &messages, &CompletionOptions::default())
            .await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentConfig, AgentFactory};
    use crate::collaborator::CollaboratorError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        structured: Mutex<Vec<String>>,
        free_form: &'static str,
    }

    #[async_trait]
    impl LanguageModel for Scripted {
        async fn complete(
            &self,
            _model: &str,
            messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> Result<String, CollaboratorError> {
            let is_structured = messages
                .iter()
                .any(|m| m.content.contains("matching this schema"));
            if is_structured {
                let mut queue = self.structured.lock().unwrap();
                if !queue.is_empty() {
                    return Ok(queue.remove(0));
                }
            }
            Ok(self.free_form.to_string())
        }
    }

    fn scripted(replies: &[&str], free_form: &'static str) -> Arc<Scripted> {
        Arc::new(Scripted {
            structured: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            free_form,
        })
    }

    const ONE_SUBTASK: &str = r#"{
        "subtasks": [
            {"id": "t1", "description": "inspect data",
             "required_capabilities": ["analysis"]}
        ]
    }"#;

    const ANALYSIS: &str = r#"{
        "summary": "stable", "patterns": [], "anomalies": [],
        "recommendations": [], "confidence": 0.9
    }"#;

    fn analysis_member(model: &Arc<Scripted>, name: &str) -> SwarmMember {
        let factory = AgentFactory::new(Arc::clone(model) as Arc<dyn LanguageModel>);
        SwarmMember::new(factory.create(AgentConfig::new(
            name,
            AgentKind::Analysis,
            "test-model",
        )))
    }

    #[tokio::test]
    async fn test_execute_without_members_fails() {
        let model = scripted(&[], "unused");
        let swarm = AgentSwarm::new("empty", SwarmSettings::default(), model, "test-model");
        assert!(matches!(
            swarm.execute("anything").await.unwrap_err(),
            SwarmError::NoMembers
        ));
    }

    #[tokio::test]
    async fn test_single_member_run_completes() {
        let model = scripted(&[ONE_SUBTASK, ANALYSIS], "combined answer");
        let mut swarm = AgentSwarm::new(
            "solo",
            SwarmSettings::default(),
            Arc::clone(&model) as Arc<dyn LanguageModel>,
            "test-model",
        );
        swarm.add_member(analysis_member(&model, "analyst"));

        let result = swarm.execute("inspect data").await.unwrap();
        assert_eq!(result.result, "combined answer");
        assert_eq!(result.contributions.len(), 1);
        assert!((result.consensus_level - 0.9).abs() < 1e-9);
        assert!((result.estimated_cost - 0.05).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_broadcast_protocol_logs_messages() {
        let model = scripted(&[ONE_SUBTASK, ANALYSIS], "combined");
        let mut swarm = AgentSwarm::new(
            "loggy",
            SwarmSettings::default(),
            Arc::clone(&model) as Arc<dyn LanguageModel>,
            "test-model",
        );
        swarm.add_member(analysis_member(&model, "analyst"));
        swarm.execute("inspect data").await.unwrap();

        // Task announcement plus one successful contribution.
        assert_eq!(swarm.message_log().len(), 2);
    }

    #[tokio::test]
    async fn test_direct_protocol_logs_nothing() {
        let model = scripted(&[ONE_SUBTASK, ANALYSIS], "combined");
        let settings = SwarmSettings {
            protocol: Protocol::Direct,
            ..SwarmSettings::default()
        };
        let mut swarm = AgentSwarm::new(
            "quiet",
            settings,
            Arc::clone(&model) as Arc<dyn LanguageModel>,
            "test-model",
        );
        swarm.add_member(analysis_member(&model, "analyst"));
        swarm.execute("inspect data").await.unwrap();

        assert!(swarm.message_log().is_empty());
    }

    #[tokio::test]
    async fn test_member_failure_becomes_contribution() {
        // Decomposition succeeds; the member's structured reply is not
        // decodable, so its run fails.
        let model = scripted(&[ONE_SUBTASK, "this is not json"], "combined");
        let mut swarm = AgentSwarm::new(
            "flaky",
            SwarmSettings::default(),
            Arc::clone(&model) as Arc<dyn LanguageModel>,
            "test-model",
        );
        swarm.add_member(analysis_member(&model, "analyst"));

        let result = swarm.execute("inspect data").await.unwrap();
        assert_eq!(result.contributions.len(), 1);
        assert!(!result.contributions[0].is_success());
        assert!(result.contributions[0].reasoning.starts_with("Error:"));
        assert_eq!(result.consensus_level, 0.0);
        // Cost counts the failed contribution too.
        assert!((result.estimated_cost - 0.05).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_leader_based_strategy_is_incomplete() {
        let model = scripted(&[ONE_SUBTASK], "assign t1 to analyst");
        let settings = SwarmSettings {
            strategy: CoordinationStrategy::LeaderBased,
            ..SwarmSettings::default()
        };
        let mut swarm = AgentSwarm::new(
            "led",
            settings,
            Arc::clone(&model) as Arc<dyn LanguageModel>,
            "test-model",
        );
        swarm.add_member(analysis_member(&model, "analyst"));

        let err = swarm.execute("inspect data").await.unwrap_err();
        match err {
            SwarmError::LeaderPlanUnparsed(plan) => {
                assert_eq!(plan, "assign t1 to analyst");
            }
            other => panic!("unexpected error: {other}"),
        }
        // The raw plan still lands in the log.
        assert_eq!(swarm.message_log().len(), 1);
    }

    #[tokio::test]
    async fn test_auction_strategy_assigns_capable_member() {
        let model = scripted(&[ONE_SUBTASK, ANALYSIS], "combined");
        let settings = SwarmSettings {
            strategy: CoordinationStrategy::Auction,
            ..SwarmSettings::default()
        };
        let mut swarm = AgentSwarm::new(
            "auction",
            settings,
            Arc::clone(&model) as Arc<dyn LanguageModel>,
            "test-model",
        );
        swarm.add_member(analysis_member(&model, "analyst"));

        let result = swarm.execute("inspect data").await.unwrap();
        assert_eq!(result.contributions.len(), 1);
        assert!(result.contributions[0].is_success());
    }
}

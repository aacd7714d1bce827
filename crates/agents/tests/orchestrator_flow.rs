//! End-to-end orchestrated runs against a scripted model.

mod common;

use std::sync::Arc;

use serde_json::json;

use apex_agents::agents::{AgentConfig, AgentFactory, ExecutionStatus};
use apex_agents::collaborator::LanguageModel;
use apex_agents::error::AgentError;
use apex_agents::orchestrator::Orchestrator;
use apex_coordination::AgentKind;

use common::ScriptedModel;

const PLAN: &str = r#"{
    "objective": "publish the quarterly report",
    "steps": [
        {"id": "s1", "description": "analyze the quarter numbers", "action": "analyze",
         "expected_output": "insights"},
        {"id": "s2", "description": "draft the report text", "action": "write",
         "expected_output": "prose", "dependencies": ["s1"]}
    ]
}"#;

const ASSIGNMENTS: &str = r#"{"assignments": {"s1": "analysis", "s2": "writing"}}"#;

const ANALYSIS_REPLY: &str = r#"{
    "summary": "margin improved",
    "patterns": ["seasonal lift"],
    "anomalies": [],
    "recommendations": ["expand in Q3"],
    "confidence": 0.88
}"#;

const DRAFT_REPLY: &str = r#"{"content": "Margins improved this quarter. Expansion follows in Q3."}"#;

fn scripted() -> Arc<dyn LanguageModel> {
    ScriptedModel::new("final report synthesis")
        .on("Decompose the objective", PLAN)
        .on("Assign each plan step", ASSIGNMENTS)
        .on("analyze the quarter numbers", ANALYSIS_REPLY)
        .on("draft the report text", DRAFT_REPLY)
        .into_model()
}

#[tokio::test]
async fn orchestrator_runs_steps_sequentially_and_synthesizes() {
    let model = scripted();
    let orchestrator = Orchestrator::new(Arc::clone(&model), "test-model");
    let factory = AgentFactory::new(Arc::clone(&model));

    let analyst = factory.create(AgentConfig::new("analyst", AgentKind::Analysis, "test-model"));
    orchestrator.register_agent(Arc::clone(&analyst)).await;
    orchestrator
        .register_agent(factory.create(AgentConfig::new("writer", AgentKind::Writing, "test-model")))
        .await;

    let report = orchestrator
        .execute("publish the quarterly report", &json!({}))
        .await
        .unwrap();

    assert_eq!(report.plan.steps.len(), 2);
    assert_eq!(report.step_results[0].agent_kind, AgentKind::Analysis);
    assert_eq!(report.step_results[0].output["summary"], "margin improved");
    assert_eq!(report.step_results[1].agent_kind, AgentKind::Writing);
    assert_eq!(report.step_results[1].output["analysis"]["words"], 8);
    assert_eq!(report.synthesis, "final report synthesis");

    let executions = analyst.harness().executions().await;
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn orchestrator_aborts_on_missing_agent_kind() {
    // The plan assigns s2 to writing, which is never registered. The
    // run must fail outright rather than return a partial report.
    let model = scripted();
    let orchestrator = Orchestrator::new(Arc::clone(&model), "test-model");
    let factory = AgentFactory::new(Arc::clone(&model));
    orchestrator
        .register_agent(factory.create(AgentConfig::new("analyst", AgentKind::Analysis, "test-model")))
        .await;

    let err = orchestrator
        .execute("publish the quarterly report", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::UnknownKind(_)));
}

#[tokio::test]
async fn orchestrator_aborts_on_step_failure() {
    // The writing step's reply is not decodable; the whole run fails.
    let model: Arc<dyn LanguageModel> = ScriptedModel::new("unused fallback")
        .on("Decompose the objective", PLAN)
        .on("Assign each plan step", ASSIGNMENTS)
        .on("analyze the quarter numbers", ANALYSIS_REPLY)
        .on("draft the report text", "plain prose, no structure")
        .into_model();

    let orchestrator = Orchestrator::new(Arc::clone(&model), "test-model");
    let factory = AgentFactory::new(Arc::clone(&model));
    orchestrator
        .register_agent(factory.create(AgentConfig::new("analyst", AgentKind::Analysis, "test-model")))
        .await;
    let writer = factory.create(AgentConfig::new("writer", AgentKind::Writing, "test-model"));
    orchestrator.register_agent(Arc::clone(&writer)).await;

    let err = orchestrator
        .execute("publish the quarterly report", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Collaborator(_)));

    let executions = writer.harness().executions().await;
    assert_eq!(executions[0].status, ExecutionStatus::Failed);
}

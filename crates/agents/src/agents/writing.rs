//! Writing agent: drafts content and computes text statistics locally.

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
struct Draft {
    content: String,
    #[serde(default)]
    title: Option<String>,
}

/// Statistics derived from the draft text itself rather than reported
/// by the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStats {
    pub words: usize,
    pub sentences: usize,
    pub paragraphs: usize,
    pub reading_time_minutes: f64,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        let words = text.split_whitespace().count();
        let sentences = text
            .split(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .count();
        let paragraphs = text
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .count();
        Self {
            words,
            sentences,
            paragraphs,
            // 200 words per minute reading speed.
            reading_time_minutes: words as f64 / 200.0,
        }
    }
}

pub struct WritingAgent {
    harness: AgentHarness,
}

impl WritingAgent {
    pub fn new(config: AgentConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            harness: AgentHarness::new(config, model),
        }
    }

    async fn run(&self, objective: &str, context: &Value) -> Result<Value, AgentError> {
        let tone = context
            .get("tone")
            .and_then(Value::as_str)
            .unwrap_or("clear and direct");
        let format = context
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or("prose");
        let length = context
            .get("length")
            .and_then(Value::as_str)
            .unwrap_or("as long as the topic needs");

        let mut variables = Map::new();
        variables.insert("objective".to_string(), Value::String(objective.to_string()));
        variables.insert("tone".to_string(), Value::String(tone.to_string()));
        variables.insert("format".to_string(), Value::String(format.to_string()));
        variables.insert("length".to_string(), Value::String(length.to_string()));

        let draft: Draft = structured_as(
            self.harness.model().as_ref(),
            &self.harness.config().model,
            "Write the requested content.\n\nTopic: {{objective}}\n\
             Tone: {{tone}}\nFormat: {{format}}\nLength: {{length}}",
            &variables,
        )
        .await?;

        let stats = TextStats::of(&draft.content);

        self.harness
            .remember(MemoryItem::new(
                MemoryKind::LongTerm,
                format!("Wrote '{objective}' ({} words)", stats.words),
                0.5,
            ))
            .await;

        Ok(json!({
            "content": draft.content,
            "analysis": {
                "words": stats.words,
                "sentences": stats.sentences,
                "paragraphs": stats.paragraphs,
                "reading_time_minutes": stats.reading_time_minutes,
            },
            "metadata": {
                "title": draft.title,
                "tone": tone,
                "format": format,
            },
        }))
    }
}

#[async_trait]
impl Agent for WritingAgent {
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

//! Shared test doubles for integration tests.

use std::sync::Arc;

use async_trait::async_trait;

use apex_agents::collaborator::{
    ChatMessage, CollaboratorError, CompletionOptions, LanguageModel,
};

/// Model double that picks its reply by prompt content.
///
/// Each rule is a `(needle, reply)` pair; the first rule whose needle
/// appears anywhere in the conversation wins. Matching by content
/// rather than call order keeps scenarios stable under concurrent
/// fan-out, where agents race to call the model.
pub struct ScriptedModel {
    rules: Vec<(String, String)>,
    fallback: String,
}

impl ScriptedModel {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.into(),
        }
    }

    pub fn on(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((needle.into(), reply.into()));
        self
    }

    pub fn into_model(self) -> Arc<dyn LanguageModel> {
        Arc::new(self)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, CollaboratorError> {
        let conversation = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        for (needle, reply) in &self.rules {
            if conversation.contains(needle.as_str()) {
                return Ok(reply.clone());
            }
        }
        Ok(self.fallback.clone())
    }
}

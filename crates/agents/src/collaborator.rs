//! The language-model collaborator boundary.
//!
//! The core's only external dependency is a completion backend with
//! two operations: free-text chat completion and structured generation
//! against a JSON schema. The trait is intentionally small so tests
//! can script it; `HttpModel` talks to any OpenAI-compatible
//! `/chat/completions` endpoint.
//!
//! This core never retries a collaborator call. The HTTP client does
//! carry a request timeout so a hung backend cannot hang a swarm's
//! fan-in barrier forever.

use std::time::Duration;

use async_trait::async_trait;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Error type for collaborator operations. Not retried anywhere in
/// this core — the caller decides.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The backend could not be reached or returned a failure status.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// The model's output could not be parsed into the expected shape.
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),
}

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Sampling options for a completion call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    pub fn with_temperature(temperature: f64) -> Self {
        Self { temperature: Some(temperature), max_tokens: None }
    }
}

/// The completion collaborator.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Free-text chat completion.
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, CollaboratorError>;

    /// Templated structured generation: `{{name}}` variables are
    /// substituted into `prompt`, the schema is embedded, and the
    /// reply is parsed into a JSON value. Unparseable output is a
    /// `SchemaValidation` error.
    async fn structured(
        &self,
        model: &str,
        prompt: &str,
        schema: &RootSchema,
        variables: &Map<String, Value>,
    ) -> Result<Value, CollaboratorError> {
        let rendered = render_template(prompt, variables);
        let schema_json = serde_json::to_string_pretty(schema)
            .map_err(|e| CollaboratorError::SchemaValidation(e.to_string()))?;

        let system = format!(
            "Respond with a single JSON value matching this schema exactly. \
             No commentary, no markdown fences.\n\nSchema:\n{schema_json}"
        );
        let messages = [ChatMessage::system(system), ChatMessage::user(rendered)];
        let raw = self
            .complete(model, &messages, &CompletionOptions::default())
            .await?;

        let json_str = extract_json(&raw);
        serde_json::from_str(&json_str).map_err(|e| {
            CollaboratorError::SchemaValidation(format!("reply is not valid JSON: {e}\nraw: {raw}"))
        })
    }
}

/// One structured call, decoded into a typed shape. A decode failure
/// is a fatal `SchemaValidation` error: fail, don't coerce.
pub async fn structured_as<T>(
    model: &dyn LanguageModel,
    model_name: &str,
    prompt: &str,
    variables: &Map<String, Value>,
) -> Result<T, CollaboratorError>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = schemars::gen::SchemaGenerator::default().into_root_schema_for::<T>();
    let value = model.structured(model_name, prompt, &schema, variables).await?;
    serde_json::from_value(value)
        .map_err(|e| CollaboratorError::SchemaValidation(e.to_string()))
}

/// Substitute `{{name}}` placeholders from the variables map. Values
/// render as raw strings, everything else as compact JSON.
pub fn render_template(prompt: &str, variables: &Map<String, Value>) -> String {
    let mut rendered = prompt.to_string();
    for (key, value) in variables {
        let needle = format!("{{{{{key}}}}}");
        let replacement = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        rendered = rendered.replace(&needle, &replacement);
    }
    rendered
}

/// Extract the first JSON object or array from model output, stripping
/// markdown fences when present.
pub fn extract_json(raw: &str) -> String {
    let stripped = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let object = stripped.find('{').zip(stripped.rfind('}'));
    let array = stripped.find('[').zip(stripped.rfind(']'));

    let span = match (object, array) {
        (Some(o), Some(a)) => {
            if a.0 < o.0 {
                Some(a)
            } else {
                Some(o)
            }
        }
        (Some(o), None) => Some(o),
        (None, Some(a)) => Some(a),
        (None, None) => None,
    };

    match span {
        Some((start, end)) if start <= end => stripped[start..=end].to_string(),
        _ => stripped.to_string(),
    }
}

/// OpenAI-compatible chat-completions client.
pub struct HttpModel {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpModel {
    /// Build a client against a `/v1`-style base URL.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Unavailable(format!("client build failed: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LanguageModel for HttpModel {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, CollaboratorError> {
        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
        });
        if let Some(t) = options.temperature {
            body["temperature"] = serde_json::json!(t);
        }
        if let Some(m) = options.max_tokens {
            body["max_tokens"] = serde_json::json!(m);
        }

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model, url = %url, "completion request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Unavailable(format!(
                "backend error ({status}): {body}"
            )));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

        reply["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                CollaboratorError::Unavailable("reply carried no message content".to_string())
            })
    }
}

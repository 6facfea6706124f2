//! Model-backed generator
//!
//! Sends the step's prompt to an Anthropic messages endpoint and reads the
//! result document back out of the reply. The envelope is rendered as YAML
//! into the template's `{envelope}` placeholder.

use crate::error::GenerationError;
use crate::generator::Generator;
use pps_schema::{Envelope, PromptResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Placeholder a template marks the envelope position with
pub const ENVELOPE_PLACEHOLDER: &str = "{envelope}";

/// Default model name
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Default messages endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";

const API_VERSION: &str = "2023-06-01";

/// Connection and sampling settings for [`ModelGenerator`]
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// API key sent as `x-api-key`
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Response token cap
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Messages endpoint URL
    pub endpoint: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 8000,
            temperature: 0.7,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ModelConfig {
    /// Defaults with `api_key`
    #[inline]
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Set model name
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set response token cap
    #[inline]
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set sampling temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set messages endpoint
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Generator calling a hosted model over HTTP
#[derive(Debug, Clone)]
pub struct ModelGenerator {
    client: reqwest::Client,
    config: ModelConfig,
}

impl ModelGenerator {
    /// Generator with a fresh HTTP client
    #[must_use]
    pub fn new(config: ModelConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Settings in use
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    async fn complete(&self, prompt: &str) -> Result<String, reqwest::Error> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response: MessagesResponse = self
            .client
            .post(&self.config.endpoint)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .unwrap_or_default())
    }
}

/// Fill the template's envelope placeholder with `envelope` as YAML
///
/// # Errors
/// `serde_yaml` error when the envelope cannot be rendered.
pub fn render_prompt(template: &str, envelope: &Envelope) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(envelope)?;
    Ok(template.replacen(ENVELOPE_PLACEHOLDER, &yaml, 1))
}

/// Read a result document out of a model reply
///
/// Takes the first ```` ```yaml ```` (or ```` ```yml ````) fenced block,
/// else the first bare ```` ``` ```` block, else the whole reply. A
/// `prompt_result:` wrapper is accepted.
///
/// # Errors
/// [`GenerationError::InvalidResponse`] when the text is not a result.
pub fn parse_model_response(text: &str) -> Result<PromptResult, GenerationError> {
    let yaml = fenced_yaml(text).unwrap_or(text);
    pps_io::parse_result(yaml).map_err(|source| GenerationError::InvalidResponse { source })
}

fn fenced_yaml(text: &str) -> Option<&str> {
    let tagged = ["```yaml\n", "```yml\n"]
        .into_iter()
        .filter_map(|opener| text.find(opener).map(|at| at + opener.len()))
        .min();
    let start = tagged.or_else(|| text.find("```\n").map(|at| at + 4))?;
    let body = &text[start..];
    body.find("\n```").map(|end| &body[..end])
}

#[async_trait::async_trait]
impl Generator for ModelGenerator {
    async fn generate(
        &self,
        envelope: &Envelope,
        template: &str,
    ) -> Result<PromptResult, GenerationError> {
        let prompt_id = envelope.meta.prompt_id.as_str();
        let prompt = render_prompt(template, envelope)
            .map_err(|e| GenerationError::backend(prompt_id, e))?;

        debug!(prompt_id, model = %self.config.model, chars = prompt.len(), "calling model");
        let reply = self
            .complete(&prompt)
            .await
            .map_err(|e| GenerationError::backend(prompt_id, e))?;
        if reply.is_empty() {
            return Err(GenerationError::backend(
                prompt_id,
                "no text content in model response",
            ));
        }
        info!(prompt_id, chars = reply.len(), "model replied");

        parse_model_response(&reply)
    }
}

//! services/api/src/adapters/analysis_llm.rs
//!
//! This module contains the adapter for the entry-analysis LLM.
//! It implements the `AnalysisService` port from the `core` crate.
//!
//! Requests go to the Responses API first. When the configured endpoint does
//! not support that interface, the same request is repeated once against
//! Chat Completions. Nothing is retried beyond that: the client is built with
//! the SDK's own backoff disabled, so a 429 or 5xx surfaces on the first hit.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use backoff::ExponentialBackoffBuilder;
use async_trait::async_trait;
use diary_core::ports::{AnalysisService, PortError, PortResult};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

const FALLBACK_TEMPERATURE: f32 = 0.2;

/// Error codes an endpoint returns when it lacks the Responses interface or one
/// of the parameters we send to it.
const UNSUPPORTED_CODES: &[&str] = &[
    "unknown_url",
    "unsupported_parameter",
    "unknown_parameter",
    "unsupported_value",
];

const RATE_LIMIT_MARKERS: &[&str] = &["rate_limit_exceeded", "insufficient_quota"];

/// Builds the OpenAI client shared by the whole service.
///
/// Every request is single-shot: the SDK's retry loop gives up immediately and
/// hands the first error back for classification.
pub fn build_client(api_key: &str, base_url: Option<&str>) -> Client<OpenAIConfig> {
    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base_url) = base_url {
        config = config.with_api_base(base_url);
    }
    let no_retry = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();
    Client::with_config(config).with_backoff(no_retry)
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnalysisService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnalysisAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
    max_output_tokens: u32,
}

impl OpenAiAnalysisAdapter {
    /// Creates a new `OpenAiAnalysisAdapter` around a shared client.
    pub fn new(
        client: Client<OpenAIConfig>,
        model: String,
        timeout: Duration,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            client,
            model,
            timeout,
            max_output_tokens,
        }
    }

    /// Calls the Responses API asking for a JSON object.
    async fn call_responses(&self, system_instruction: &str, prompt: &str) -> Result<String, OpenAIError> {
        let request = json!({
            "model": self.model,
            "instructions": system_instruction,
            "input": prompt,
            "text": { "format": { "type": "json_object" } },
            "max_output_tokens": self.max_output_tokens,
        });

        let response: Value = self.client.responses().create_byot(request).await?;
        Ok(extract_output_text(&response))
    }

    /// Calls Chat Completions with the same instruction and prompt.
    async fn call_chat(&self, system_instruction: &str, prompt: &str) -> Result<String, OpenAIError> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_instruction)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .temperature(FALLBACK_TEMPERATURE)
            .build()?;

        let response = self.client.chat().create(request).await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    /// Bounds one upstream call by the configured timeout.
    async fn bounded<F>(&self, call: F) -> PortResult<Result<String, OpenAIError>>
    where
        F: Future<Output = Result<String, OpenAIError>>,
    {
        tokio::time::timeout(self.timeout, call).await.map_err(|_| {
            PortError::Upstream(format!("request timed out after {:?}", self.timeout))
        })
    }
}

//=========================================================================================
// `AnalysisService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnalysisService for OpenAiAnalysisAdapter {
    async fn call_model(&self, system_instruction: &str, prompt: &str) -> PortResult<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Requesting entry analysis");

        let primary = self
            .bounded(self.call_responses(system_instruction, prompt))
            .await?;

        let text = match primary {
            Ok(text) => text,
            Err(e) if classify(&e) == Failure::Unsupported => {
                warn!("Responses API unavailable ({}); falling back to chat completions", e);
                self.bounded(self.call_chat(system_instruction, prompt))
                    .await?
                    .map_err(into_port_error)?
            }
            Err(e) => return Err(into_port_error(e)),
        };

        info!(model = %self.model, output_len = text.len(), "Received entry analysis");
        Ok(text)
    }
}

//=========================================================================================
// Response and Error Helpers
//=========================================================================================

/// Joins every `output_text` part of a Responses API payload.
fn extract_output_text(response: &Value) -> String {
    if let Some(text) = response.get("output_text").and_then(Value::as_str) {
        return text.to_string();
    }

    response
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Unsupported,
    RateLimited,
    Upstream,
}

fn classify(err: &OpenAIError) -> Failure {
    match err {
        OpenAIError::ApiError(api) => {
            classify_api_error(api.code.as_deref(), api.r#type.as_deref(), &api.message)
        }
        // Servers without the endpoint often answer with a body that is not an
        // OpenAI error envelope.
        OpenAIError::JSONDeserialize(..) => Failure::Unsupported,
        _ => Failure::Upstream,
    }
}

fn classify_api_error(code: Option<&str>, kind: Option<&str>, message: &str) -> Failure {
    let is_marked = |markers: &[&str]| {
        code.is_some_and(|c| markers.contains(&c)) || kind.is_some_and(|k| markers.contains(&k))
    };

    if is_marked(RATE_LIMIT_MARKERS) {
        Failure::RateLimited
    } else if is_marked(UNSUPPORTED_CODES)
        || message.starts_with("Invalid URL")
        || message.contains("Unrecognized request argument")
    {
        Failure::Unsupported
    } else {
        Failure::Upstream
    }
}

fn into_port_error(err: OpenAIError) -> PortError {
    let message = match &err {
        OpenAIError::ApiError(api) => api.message.clone(),
        other => other.to_string(),
    };
    match classify(&err) {
        Failure::RateLimited => PortError::RateLimited(message),
        Failure::Unsupported | Failure::Upstream => PortError::Upstream(message),
    }
}

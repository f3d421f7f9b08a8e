//! Chat-completion client for OpenAI-compatible providers.
//!
//! DeepSeek is the default provider; any endpoint that speaks the
//! `/chat/completions` protocol works by changing `llm.api_url`.

use crate::error::AgentError;
use abia_core::config::LlmConfig;
use abia_core::session::{Turn, TurnRole};
use abia_core::usage::{TokenUsage, estimate_messages_tokens, estimate_tokens};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn from_turn(turn: &Turn) -> Self {
        match turn.role {
            TurnRole::User => Self::user(turn.content.clone()),
            TurnRole::Assistant => Self::assistant(turn.content.clone()),
        }
    }
}

/// Text produced by the model plus what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model name recorded in token statistics.
    fn model(&self) -> &str;

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, AgentError>;
}

/// HTTP client for OpenAI-compatible chat completions.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NotConfigured`] when no API key is set.
    pub fn from_config(config: &LlmConfig) -> Result<Self, AgentError> {
        if !config.is_configured() {
            return Err(AgentError::NotConfigured(format!(
                "Aucune clé API configurée pour le fournisseur {}",
                config.provider
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| AgentError::Other(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/chat/completions", config.api_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_request(
        &self,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<ChatCompletionResponse, AgentError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|err| AgentError::ProcessError {
                status_code: None,
                message: format!("LLM API request failed: {err}"),
                is_retryable: err.is_connect() || err.is_timeout(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read LLM error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        response
            .json()
            .await
            .map_err(|err| AgentError::Other(format!("Failed to parse LLM response: {err}")))
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, AgentError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        tracing::debug!(
            "[LLM] Sending {} messages to {} ({})",
            messages.len(),
            self.endpoint,
            self.model
        );

        let response = self.send_request(&request).await?;
        let reported = response.usage.clone();
        let text = extract_text_response(response)?;

        let usage = match reported {
            Some(u) => TokenUsage::new(u.prompt_tokens, u.completion_tokens),
            None => TokenUsage::new(
                estimate_messages_tokens(messages.iter().map(|m| m.content.as_str())),
                estimate_tokens(&text),
            ),
        };
        Ok(Completion { text, usage })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageBody>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Clone)]
struct UsageBody {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, AgentError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AgentError::ExecutionFailed("LLM API returned no content".into()))
}

fn map_http_error(status: StatusCode, body: String) -> AgentError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    AgentError::ProcessError {
        status_code: Some(status.as_u16()),
        message,
        is_retryable,
    }
}

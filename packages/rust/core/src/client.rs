//! Client for an OpenAI-compatible chat-completions endpoint.
//!
//! One attempt per call, no retries. Every failure maps onto [`ModelError`]
//! so the pipeline can log it and fall back.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use linklens_shared::GenerativeConfig;

use crate::prompts::{Prompt, TaskKind};

/// Failure of a single model call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("auth-error: model service rejected the credentials (HTTP {0})")]
    AuthError(u16),

    #[error("timeout: model call exceeded {0:?}")]
    Timeout(Duration),

    #[error("transport-error: {0}")]
    Transport(String),

    #[error("empty-response: model returned no content")]
    EmptyResponse,
}

/// Sampling parameters for one task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl GenerationParams {
    /// Classification runs cold, comment drafting runs warm.
    pub fn for_task(task: TaskKind, config: &GenerativeConfig) -> Self {
        match task {
            TaskKind::Classify => Self {
                temperature: 0.3,
                top_p: 0.8,
                max_tokens: 500,
                timeout: config.classify_timeout,
            },
            TaskKind::Insight => Self {
                temperature: 0.7,
                top_p: 0.8,
                max_tokens: 2000,
                timeout: config.insight_timeout,
            },
            TaskKind::CommentAssist => Self {
                temperature: 0.8,
                top_p: 0.9,
                max_tokens: 1500,
                timeout: config.comment_timeout,
            },
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// Handle to the remote generative service.
pub struct GenerativeClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    config: GenerativeConfig,
}

impl GenerativeClient {
    /// Build a client, or `None` when no API key is configured.
    pub fn from_config(config: &GenerativeConfig) -> Result<Option<Self>, ModelError> {
        match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Self::new(key.to_string(), config).map(Some),
            _ => Ok(None),
        }
    }

    pub fn new(api_key: String, config: &GenerativeConfig) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ModelError::Transport(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            http,
            endpoint,
            api_key,
            config: config.clone(),
        })
    }

    /// Model identifier reported on generated results.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a prompt and return the raw text of the top candidate.
    #[instrument(skip_all, fields(task = prompt.task.as_str(), model = %self.config.model))]
    pub async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError> {
        let params = GenerationParams::for_task(prompt.task, &self.config);
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
        };

        let started = std::time::Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(params.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, params.timeout))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ModelError::AuthError(status.as_u16()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(ModelError::Transport(format!("HTTP {status}: {snippet}")));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(params.timeout)
            } else {
                ModelError::Transport(format!("invalid response body: {e}"))
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)?;

        debug!(
            chars = content.chars().count(),
            latency_ms = started.elapsed().as_millis() as u64,
            "model responded"
        );
        Ok(content)
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> ModelError {
    if e.is_timeout() {
        ModelError::Timeout(timeout)
    } else {
        ModelError::Transport(e.to_string())
    }
}

//! OpenAI-compatible chat-completions backend.
//!
//! One non-streaming `POST {base_url}/chat/completions` per call. Works with
//! any server that speaks the same wire format (Azure-style gateways, local
//! proxies).

use std::time::Duration;

use async_trait::async_trait;
use cwv_core::{Message, Role};
use cwv_settings::ApiSettings;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::backend::{LlmBackend, LlmResponse, Usage};
use crate::error_parsing::parse_api_error;
use crate::errors::{BackendError, BackendResult};
use crate::retry::parse_retry_after_header;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Connection settings for [`OpenAiChatBackend`].
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model id sent with every request.
    pub model: String,
    /// Output cap sent as `max_completion_tokens` (the only cap o-series
    /// models accept).
    pub max_output_tokens: Option<u64>,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Build a config from settings, reading the key from the configured
    /// environment variable.
    pub fn from_settings(
        api: &ApiSettings,
        model: impl Into<String>,
        max_output_tokens: Option<u64>,
    ) -> BackendResult<Self> {
        let api_key = std::env::var(&api.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| BackendError::Auth {
                status: None,
                message: format!("environment variable {} is not set", api.api_key_env),
            })?;
        Ok(Self {
            base_url: api.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            max_output_tokens: api.max_output_tokens.or(max_output_tokens),
            timeout: Duration::from_millis(api.timeout_ms),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u64>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::Human => "user",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Chat-completions client.
pub struct OpenAiChatBackend {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiChatBackend {
    /// Create a backend with its own HTTP client.
    pub fn new(config: OpenAiConfig) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    async fn error_from_response(response: reqwest::Response) -> BackendError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after_header);
        let body = response.text().await.unwrap_or_default();
        let info = parse_api_error(&body, status.as_u16());

        error!(
            status = status.as_u16(),
            code = info.code.as_deref().unwrap_or("unknown"),
            retryable = info.retryable,
            "chat completions API error"
        );

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Auth {
                status: Some(status.as_u16()),
                message: info.message,
            },
            StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited {
                retry_after_ms: retry_after.unwrap_or(0),
                message: info.message,
            },
            _ => BackendError::Api {
                status: status.as_u16(),
                message: info.message,
                code: info.code,
                retryable: info.retryable,
            },
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiChatBackend {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn invoke(&self, messages: &[Message]) -> BackendResult<LlmResponse> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: wire_role(m.role),
                    content: &m.content,
                })
                .collect(),
            max_completion_tokens: self.config.max_output_tokens,
        };

        debug!(
            model = %self.config.model,
            message_count = messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body: ChatResponse = serde_json::from_slice(&response.bytes().await?)?;
        let usage = body.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });
        let Some(choice) = body.choices.into_iter().next() else {
            return Err(BackendError::other("response contained no choices"));
        };
        let Some(content) = choice.message.content else {
            return Err(BackendError::other("response choice has no content"));
        };

        Ok(LlmResponse {
            content,
            model: body.model.unwrap_or_else(|| self.config.model.clone()),
            usage,
            finish_reason: choice.finish_reason,
        })
    }
}

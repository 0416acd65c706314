//! Backend trait and response types.

use async_trait::async_trait;
use cwv_core::Message;
use serde::{Deserialize, Serialize};

use crate::errors::BackendResult;

/// Token usage reported by the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Prompt tokens billed.
    pub input_tokens: u64,
    /// Generated tokens billed.
    pub output_tokens: u64,
}

/// A successful backend response.
///
/// This is the object persisted as the final report and returned on a
/// cache hit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmResponse {
    /// Generated text.
    pub content: String,
    /// Model that produced the response.
    pub model: String,
    /// Token usage, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Why generation stopped, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl LlmResponse {
    /// Response with only content and model.
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: None,
            finish_reason: None,
        }
    }
}

/// An LLM that turns a message list into a response.
///
/// Implementations perform exactly one request per call: no retries, no
/// backoff.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Model identifier this backend talks to.
    fn model(&self) -> &str;

    /// Send the messages and wait for the complete response.
    async fn invoke(&self, messages: &[Message]) -> BackendResult<LlmResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_round_trips_through_json() {
        let mut r = LlmResponse::new("# Report", "gpt-4.1");
        r.usage = Some(Usage {
            input_tokens: 10,
            output_tokens: 5,
        });
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["usage"]["inputTokens"], 10);
        let back: LlmResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn minimal_response_parses() {
        let r: LlmResponse =
            serde_json::from_str(r#"{"content": "x", "model": "m"}"#).unwrap();
        assert!(r.usage.is_none());
        assert!(r.finish_reason.is_none());
    }
}

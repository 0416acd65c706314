//! API error body parsing.
//!
//! Handles the common error envelopes:
//! - OpenAI:   `{"error": {"message": "...", "type": "...", "code": "..."}}`
//! - Google:   `{"error": {"message": "...", "status": "..."}}`
//! - Detail:   `{"detail": "..."}`
//! - Flat:     `{"message": "...", "code": "..."}`

use serde_json::Value;

/// Parsed API error information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiErrorInfo {
    /// Human-readable error message.
    pub message: String,
    /// Provider error code, most specific first (`code`, then `type`/`status`).
    pub code: Option<String>,
    /// Whether the request can be retried (429 or 5xx).
    pub retryable: bool,
}

/// Parse an API error response body.
///
/// Falls back to `"HTTP {status}: {body}"` when no envelope matches.
pub fn parse_api_error(body: &str, status: u16) -> ApiErrorInfo {
    let retryable = status == 429 || status >= 500;
    let fallback = || ApiErrorInfo {
        message: format!("HTTP {status}: {body}"),
        code: None,
        retryable,
    };

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return fallback();
    };

    let error = &json["error"];
    if let Some(msg) = error["message"].as_str() {
        let code = error["code"]
            .as_str()
            .or_else(|| error["type"].as_str())
            .or_else(|| error["status"].as_str())
            .map(String::from);
        return ApiErrorInfo {
            message: msg.to_string(),
            code,
            retryable,
        };
    }

    if let Some(msg) = json["detail"].as_str().or_else(|| json["message"].as_str()) {
        let code = json["code"]
            .as_str()
            .or_else(|| json["type"].as_str())
            .map(String::from);
        return ApiErrorInfo {
            message: msg.to_string(),
            code,
            retryable,
        };
    }

    fallback()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_context_length_envelope() {
        let body = r#"{"error":{"message":"This model's maximum context length is 128000 tokens.","type":"invalid_request_error","code":"context_length_exceeded"}}"#;
        let info = parse_api_error(body, 400);
        assert!(info.message.starts_with("This model's maximum context length"));
        assert_eq!(info.code.as_deref(), Some("context_length_exceeded"));
        assert!(!info.retryable);
    }

    #[test]
    fn type_used_when_code_is_null() {
        let body = r#"{"error":{"message":"Overloaded","type":"server_error","code":null}}"#;
        let info = parse_api_error(body, 503);
        assert_eq!(info.code.as_deref(), Some("server_error"));
        assert!(info.retryable);
    }

    #[test]
    fn google_status_envelope() {
        let body = r#"{"error":{"status":"RESOURCE_EXHAUSTED","message":"Quota exceeded"}}"#;
        let info = parse_api_error(body, 429);
        assert_eq!(info.code.as_deref(), Some("RESOURCE_EXHAUSTED"));
        assert!(info.retryable);
    }

    #[test]
    fn detail_envelope() {
        let info = parse_api_error(r#"{"detail":"Model not found"}"#, 404);
        assert_eq!(info.message, "Model not found");
        assert!(info.code.is_none());
    }

    #[test]
    fn flat_envelope() {
        let info = parse_api_error(r#"{"message":"Invalid model","code":"model_not_found"}"#, 400);
        assert_eq!(info.code.as_deref(), Some("model_not_found"));
    }

    #[test]
    fn non_json_body() {
        let info = parse_api_error("Bad Gateway", 502);
        assert_eq!(info.message, "HTTP 502: Bad Gateway");
        assert!(info.retryable);
    }

    #[test]
    fn unrecognized_json_includes_body() {
        let info = parse_api_error(r#"{"error":{}}"#, 400);
        assert_eq!(info.message, r#"HTTP 400: {"error":{}}"#);
    }
}

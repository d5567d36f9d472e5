//! HTTP client for OpenAI-compatible chat completions endpoints.

use super::completion::{CompletionFuture, CompletionRequest, CompletionService};
use crate::error::CompletionError;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Base URL used when `OPENAI_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Generation calls for large chunks are slow; allow up to ten minutes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async client for `POST {base_url}/chat/completions`.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Create a client for `model` against `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("hiersum/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CompletionError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build a client from `OPENAI_BASE_URL` (optional) and `OPENAI_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> Result<Self, CompletionError> {
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        debug!("Using base_url: {base_url}");
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| CompletionError::Request("OPENAI_API_KEY not set".to_string()))?;
        Self::new(base_url, api_key, model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn chat(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
        };
        debug!(
            "LLM request: model={}, max_tokens={}, temp={}, prompt_chars={}",
            self.model,
            body.max_tokens,
            body.temperature,
            request.system_prompt.len() + request.user_prompt.len(),
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(&body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| CompletionError::Request(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(CompletionError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_chat_response(&text)
    }
}

impl CompletionService for OpenAiClient {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        self.chat(request).boxed()
    }
}

/// Extract the trimmed text of the first choice from a response body.
fn parse_chat_response(text: &str) -> Result<String, CompletionError> {
    let parsed: RawChatResponse =
        serde_json::from_str(text).map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

    if let Some(err) = parsed.error {
        return Err(CompletionError::Api(err.message));
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    let choice = parsed
        .choices
        .and_then(|c| c.into_iter().next())
        .ok_or(CompletionError::EmptyResponse)?;
    if let Some(reason) = choice.finish_reason.as_deref() {
        trace!("finish_reason={reason}");
    }

    match choice.message.content {
        Some(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
        _ => Err(CompletionError::EmptyResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice_and_trims() {
        let body = r#"{
            "choices": [{"message": {"content": "  summary text \n"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }"#;
        assert_eq!(parse_chat_response(body).unwrap(), "summary text");
    }

    #[test]
    fn api_error_object_is_reported() {
        let body = r#"{"error": {"message": "model overloaded"}}"#;
        let err = parse_chat_response(body).unwrap_err();
        assert!(matches!(err, CompletionError::Api(ref m) if m == "model overloaded"));
    }

    #[test]
    fn missing_or_blank_content_is_empty_response() {
        assert!(matches!(
            parse_chat_response(r#"{"choices": []}"#),
            Err(CompletionError::EmptyResponse)
        ));
        assert!(matches!(
            parse_chat_response(r#"{"choices": [{"message": {"content": null}}]}"#),
            Err(CompletionError::EmptyResponse)
        ));
        assert!(matches!(
            parse_chat_response(r#"{"choices": [{"message": {"content": "   "}}]}"#),
            Err(CompletionError::EmptyResponse)
        ));
    }

    #[test]
    fn malformed_body_is_invalid_response() {
        assert!(matches!(
            parse_chat_response("<html>gateway</html>"),
            Err(CompletionError::InvalidResponse(_))
        ));
    }

    #[test]
    fn request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4o",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "usr",
                },
            ],
            max_tokens: 16384,
            temperature: 0.1,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
        assert_eq!(json["max_tokens"], 16384);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = OpenAiClient::new("http://localhost:8080/v1/", "key", "gpt-4o").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(client.model(), "gpt-4o");
    }
}

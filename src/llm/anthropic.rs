//! Anthropic Messages API client implementation
//!
//! Non-streaming: the Runner only ever needs the final [`CompletionResponse`],
//! never partial tokens, so this client issues a single blocking request per
//! `complete` call.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, StopReason, TokenUsage, ToolCall};
use crate::config::LlmConfig;
use crate::llm::types::RawArguments;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Concrete [`LlmClient`] against Anthropic's Messages API.
pub struct AnthropicClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Reads the API key from the environment variable named in `config.api_key_env`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| LlmError::InvalidResponse(format!("environment variable {} not set", config.api_key_env)))?;
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens.min(self.max_tokens).max(1),
            "messages": convert_messages(&request.messages),
        });

        let system = system_prompt(request);
        if !system.is_empty() {
            body["system"] = serde_json::json!(system);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(request.tools);
        }

        body
    }
}

/// `System` messages in the context are folded into one system string;
/// Anthropic's Messages API takes a single top-level `system` field rather
/// than a role in the message array.
fn system_prompt(request: &CompletionRequest) -> String {
    let mut parts = Vec::new();
    if !request.system_prompt.is_empty() {
        parts.push(request.system_prompt.clone());
    }
    for message in &request.messages {
        if let Message::System { text } = message {
            parts.push(text.clone());
        }
    }
    parts.join("\n\n")
}

fn convert_messages(messages: &[Message]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .filter_map(|message| match message {
            Message::System { .. } => None,
            Message::User { text } => Some(serde_json::json!({
                "role": "user",
                "content": text,
            })),
            Message::Assistant { text, tool_calls } => {
                let mut blocks = Vec::new();
                if let Some(text) = text {
                    blocks.push(serde_json::json!({ "type": "text", "text": text }));
                }
                for call in tool_calls {
                    blocks.push(serde_json::json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.arguments.normalize(),
                    }));
                }
                Some(serde_json::json!({ "role": "assistant", "content": blocks }))
            }
            Message::ToolResult { tool_call_id, content, is_error } => Some(serde_json::json!({
                "role": "user",
                "content": [{
                    "type": "tool_result",
                    "tool_use_id": tool_call_id,
                    "content": content,
                    "is_error": is_error,
                }],
            })),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: serde_json::Value },
    Thinking { thinking: String },
}

#[derive(Debug, Deserialize, Default)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

fn parse_response(api_response: AnthropicResponse) -> CompletionResponse {
    let mut text = None;
    let mut thinking = None;
    let mut tool_calls = Vec::new();

    for block in api_response.content {
        match block {
            AnthropicContentBlock::Text { text: t } => text = Some(t),
            AnthropicContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall { id, name, arguments: RawArguments::Value(input) });
            }
            AnthropicContentBlock::Thinking { thinking: t } => thinking = Some(t),
        }
    }

    let stop_reason = match api_response.stop_reason.as_deref() {
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    };

    CompletionResponse {
        text,
        tool_calls,
        stop_reason,
        thinking,
        usage: TokenUsage {
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
        },
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_request_body(&request);

        debug!(model = %self.model, tool_count = request.tools.len(), "AnthropicClient::complete: sending request");

        let response = self
            .http
            .post(url)
            .header("x-api-key", self.api_key.clone())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status().as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(LlmError::RateLimited { retry_after });
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message });
        }

        let api_response: AnthropicResponse = response.json().await.map_err(LlmError::Network)?;
        Ok(parse_response(api_response))
    }
}

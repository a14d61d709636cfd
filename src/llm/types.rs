//! Wire-independent types for the Model interface
//!
//! These are deliberately provider-agnostic: [`crate::llm::AnthropicClient`]
//! translates to/from Anthropic's Messages API wire format at its own
//! boundary, so the rest of the crate (Graph, Runner, Planner) never sees
//! a provider-specific shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in a task's append-only conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    System { text: String },
    User { text: String },
    Assistant { text: Option<String>, tool_calls: Vec<ToolCall> },
    ToolResult { tool_call_id: String, content: String, is_error: bool },
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Message::System { text: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Message::User { text: text.into() }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Message::Assistant { text: Some(text.into()), tool_calls: Vec::new() }
    }

    pub fn assistant_tool_calls(text: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant { text, tool_calls }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Message::ToolResult { tool_call_id: tool_call_id.into(), content: content.into(), is_error }
    }
}

/// Raw tool-call arguments as handed back by the model: either a JSON
/// string (common for providers that emit function-call arguments as text)
/// or an already-decoded value. The tool registry normalizes this (see
/// [`crate::tools::ToolRegistry::dispatch`]).
#[derive(Debug, Clone, PartialEq)]
pub enum RawArguments {
    Str(String),
    Value(Value),
}

impl RawArguments {
    /// JSON-decode a string form; fall back to the raw string on failure.
    /// An empty string decodes to an empty object.
    pub fn normalize(&self) -> Value {
        match self {
            RawArguments::Value(v) => v.clone(),
            RawArguments::Str(s) if s.is_empty() => serde_json::json!({}),
            RawArguments::Str(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: RawArguments,
}

/// A tool's JSON-Schema description, in the shape `format_for_model` hands
/// to the Anthropic Messages API (`{name, description, input_schema}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The model's reply: either, or both, of a text field and tool-call
/// descriptors. `thinking`, when present, is kept out of the message
/// history entirely (see the Model interface in the specification).
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: StopReason,
    pub thinking: Option<String>,
    pub usage: TokenUsage,
}

impl CompletionResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn text_response(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
            stop_reason: StopReason::EndTurn,
            thinking: None,
            usage: TokenUsage::default(),
        }
    }

    pub fn tool_call_response(tool_calls: Vec<ToolCall>) -> Self {
        Self { text: None, tool_calls, stop_reason: StopReason::ToolUse, thinking: None, usage: TokenUsage::default() }
    }
}

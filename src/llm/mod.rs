//! The Model interface: message/tool-call types plus concrete clients.
//!
//! [`LlmClient`] is the only interface the Runner and Planner depend on;
//! [`AnthropicClient`] is the production implementation and
//! [`MockLlmClient`] is a scripted-response double that drives the whole
//! test suite without a network call.

mod anthropic;
pub mod client;
mod error;
pub mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use types::{
    CompletionRequest, CompletionResponse, Message, RawArguments, StopReason, TokenUsage, ToolCall, ToolDefinition,
};

pub use client::mock::MockLlmClient;

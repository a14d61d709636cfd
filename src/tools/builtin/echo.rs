//! EchoTool: returns its `text` argument verbatim.
//!
//! Minimal stand-in for the "opaque domain tools" the specification puts
//! out of scope — exists only so the test suite and demo binary can
//! exercise the Runner/Scheduler end-to-end without a live network call.

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{Tool, ToolError};

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the given text back unchanged."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"],
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let text = args.get("text").and_then(Value::as_str).ok_or_else(|| ToolError::InvalidArgument("text".into()))?;
        Ok(Value::String(text.to_string()))
    }
}

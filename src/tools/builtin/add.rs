//! AddTool: adds two integers. Used by scenario 2 of the test suite.

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{Tool, ToolError};

pub struct AddTool;

#[async_trait]
impl Tool for AddTool {
    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Add two integers and return the sum."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "a": { "type": "integer" },
                "b": { "type": "integer" },
            },
            "required": ["a", "b"],
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let a = args.get("a").and_then(Value::as_i64).ok_or_else(|| ToolError::InvalidArgument("a".into()))?;
        let b = args.get("b").and_then(Value::as_i64).ok_or_else(|| ToolError::InvalidArgument("b".into()))?;
        Ok(serde_json::json!(a + b))
    }
}

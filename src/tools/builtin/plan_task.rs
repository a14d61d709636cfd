//! PlanTaskTool: the distinguished `plan_task` tool (§4.6).
//!
//! Its actual plan generation is itself LLM-backed and external to the core
//! contract beyond "it returns the `plan_task` JSON shape" — this wrapper
//! delegates to the configured Model with a fixed planning system prompt and
//! hands back whatever JSON text comes back. Malformed JSON is *not* treated
//! as a tool failure here: it is returned verbatim so the Runner's Planner
//! integration can surface the parse error as an ordinary tool result the
//! model may retry against (§7 error kind 5).

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::tools::{Tool, ToolError};

const PLANNER_SYSTEM_PROMPT: &str = r#"You decompose a goal into a JSON execution plan. \
Respond with ONLY a JSON object of this shape, no prose, no markdown fences:
{
  "task_tag": "<root-tag>",
  "task_type": "simple|complex",
  "description": "...",
  "subtasks": [
    {
      "task_tag": "<tag>",
      "task_type": "simple|complex",
      "description": "...",
      "parent": "<tag of parent, possibly the root tag>",
      "dependencies": ["<tag>", ...],
      "tool_require": ["<tool-name>", ...],
      "expected_output": "...",
      "success_criteria": "..."
    }
  ],
  "success_criteria": "..."
}
Subtasks may be an empty array if the goal needs no decomposition."#;

pub struct PlanTaskTool {
    model: Arc<dyn LlmClient>,
}

impl PlanTaskTool {
    pub fn new(model: Arc<dyn LlmClient>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Tool for PlanTaskTool {
    fn name(&self) -> &str {
        "plan_task"
    }

    fn description(&self) -> &str {
        "Decompose the current goal into a structured subtask plan with dependencies."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "goal": { "type": "string", "description": "What to decompose into subtasks." },
            },
            "required": ["goal"],
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let goal = args.get("goal").and_then(Value::as_str).ok_or_else(|| ToolError::InvalidArgument("goal".into()))?;

        let request = CompletionRequest {
            system_prompt: PLANNER_SYSTEM_PROMPT.to_string(),
            messages: vec![Message::user(goal.to_string())],
            tools: vec![],
            max_tokens: 4096,
        };

        let response = self.model.complete(request).await.map_err(|e| ToolError::Failed(e.to_string()))?;
        let text = response.text.unwrap_or_default();
        let plan_json = extract_json_object(&text);

        match serde_json::from_str::<Value>(&plan_json) {
            Ok(value) => Ok(value),
            Err(e) => Err(ToolError::Failed(format!("planner returned malformed JSON: {e}"))),
        }
    }
}

/// Models sometimes wrap JSON in prose or markdown fences despite
/// instructions; take the outermost `{...}` span rather than trusting the
/// whole response to be bare JSON.
fn extract_json_object(text: &str) -> String {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end >= start => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

//! Tool Registry: name -> {callable, schema, description}, dispatch contract
//!
//! Scoped per-task: the Runner builds one from the Task's own `tools` list at
//! the start of its loop (§4.3: "The Registry knows nothing about
//! scheduling; it is called synchronously by the Runner").

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::traits::Tool;
use crate::llm::ToolDefinition;

/// Holds a task's tool set, keyed by name, and formats/dispatches against it.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    pub fn from_tools(tools: &[Arc<dyn Tool>]) -> Self {
        let mut registry = Self::new();
        registry.add_tools(tools.iter().cloned());
        registry
    }

    /// Register tools; duplicate names overwrite the previous entry.
    pub fn add_tools(&mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) {
        for tool in tools {
            debug!(tool = %tool.name(), "ToolRegistry::add_tools: registering");
            self.tools.insert(tool.name().to_string(), tool);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool schemas in the shape the Model interface expects.
    pub fn format_for_model(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    /// Invoke `name` with `args`. Never raises: an unknown name or a tool
    /// error both come back as `(error_string, true)`, ready to be carried
    /// straight into a `ToolResult` message.
    pub async fn dispatch(&self, name: &str, args: Value) -> (String, bool) {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = name, "ToolRegistry::dispatch: unknown tool");
            return (format!("error: unknown tool '{name}'"), true);
        };

        match tool.call(args).await {
            Ok(value) => (stringify(value), false),
            Err(err) => {
                warn!(tool = name, error = %err, "ToolRegistry::dispatch: tool raised");
                (format!("error calling tool '{name}': {err}"), true)
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON-encode object/array results; stringify scalars; `null` becomes the
/// empty string rather than the literal `"null"`.
fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Object(_) | Value::Array(_) => serde_json::to_string(&value).unwrap_or_default(),
        other => other.to_string(),
    }
}

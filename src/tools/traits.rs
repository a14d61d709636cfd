//! Tool trait definition

use async_trait::async_trait;
use serde_json::Value;

use super::error::ToolError;

/// A tool the model may invoke via a named, JSON-schema-described call.
///
/// Tool bodies are `async fn` under the hood (matching this crate's
/// async-everywhere style), but the Runner always awaits a call to
/// completion before continuing its loop (§4.5: "no concurrency inside a
/// single task").
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, matched against the model's tool-call `name` field.
    fn name(&self) -> &str;

    /// Human-readable description surfaced to the model.
    fn description(&self) -> &str;

    /// JSON-Schema object describing this tool's parameters.
    fn input_schema(&self) -> Value;

    /// Execute the tool against decoded arguments.
    ///
    /// Returns a JSON-serializable value on success; scalars and objects are
    /// both valid, the registry stringifies/encodes them when dispatching
    /// (see [`super::registry::ToolRegistry::dispatch`]).
    async fn call(&self, args: Value) -> Result<Value, ToolError>;
}

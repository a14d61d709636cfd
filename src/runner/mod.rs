//! Task Runner (§4.5): the per-task "think -> call-tool -> observe" loop.
//!
//! One [`TaskRunner::run`] invocation drives exactly one task from its
//! already-RUNNING state to a result, dispatching tool calls through a
//! per-task [`ToolRegistry`] and handing `plan_task` results to the
//! [`crate::planner`] integration. Never touches scheduling; the Scheduler
//! decides when and whether to call it.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{GraphError, TaskGraph};
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message};
use crate::planner::{self, PlannerError};
use crate::tools::ToolRegistry;

const DEFAULT_MAX_TOKENS: u32 = 4096;
const DONE_SENTINEL: &str = "[DONE]";
const PLAN_TASK_TOOL_NAME: &str = "plan_task";

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("task {task_id} exceeded the {limit}-iteration safety ceiling with no [DONE]")]
    IterationLimitExceeded { task_id: u64, limit: u32 },

    #[error("planner invariant violated: {0}")]
    Planner(#[from] PlannerError),

    #[error("task {task_id} produced an empty result; COMPLETED requires a non-empty result (§8)")]
    EmptyResult { task_id: u64 },
}

/// Drives one task's reasoning loop to completion.
pub struct TaskRunner {
    graph: Arc<TaskGraph>,
    model: Arc<dyn LlmClient>,
    max_iterations: u32,
}

impl TaskRunner {
    pub fn new(graph: Arc<TaskGraph>, model: Arc<dyn LlmClient>, max_iterations: u32) -> Self {
        Self { graph, model, max_iterations }
    }

    /// Run task `task_id` to completion. `task_id`'s descriptor is already
    /// RUNNING when this is called; on success `T.result` is written, on
    /// failure the Scheduler is left to mark the task FAILED from the
    /// returned `Err`.
    pub async fn run(&self, task_id: u64) -> Result<(), RunnerError> {
        // Step 1: dependency status summary. `dependency_status` itself
        // fails with `GraphError::UnsatisfiedDependency` if the scheduler
        // incorrectly marked this task READY (§7 error kind 1).
        let dependencies = self.graph.dependency_status(task_id).await?;
        let (prompt, tools) = self.graph.get_task_prompt_and_tools(task_id).await?;

        // Step 2: user prompt assembly.
        let user_message = Message::user(build_user_prompt(&prompt, &dependencies));
        self.graph.append_message(task_id, user_message).await?;

        if tools.is_empty() {
            return self.run_without_tools(task_id).await;
        }

        self.run_tool_loop(task_id, &tools).await
    }

    /// Step 3: no tools registered for this task — a single Model call settles it.
    async fn run_without_tools(&self, task_id: u64) -> Result<(), RunnerError> {
        let context = self.graph.context(task_id).await?;
        let request = CompletionRequest {
            system_prompt: context.system.clone(),
            messages: context.messages.clone(),
            tools: vec![],
            max_tokens: DEFAULT_MAX_TOKENS,
        };

        let response = self.model.complete(request).await?;
        let text = response.text.unwrap_or_default();
        self.graph.append_message(task_id, Message::assistant_text(text.clone())).await?;

        let result = strip_done_sentinel(&text).unwrap_or(text);
        if result.is_empty() {
            return Err(RunnerError::EmptyResult { task_id });
        }
        self.graph.set_result(task_id, result).await?;
        Ok(())
    }

    /// Step 4: the tool loop. Iterates until a `[DONE]`-terminated,
    /// tool-call-free response arrives or the iteration ceiling (step 5) is hit.
    async fn run_tool_loop(&self, task_id: u64, tools: &[Arc<dyn crate::tools::Tool>]) -> Result<(), RunnerError> {
        let registry = ToolRegistry::from_tools(tools);
        let tool_defs = registry.format_for_model();

        for iteration in 0..self.max_iterations {
            let context = self.graph.context(task_id).await?;
            let request = CompletionRequest {
                system_prompt: context.system.clone(),
                messages: context.messages.clone(),
                tools: tool_defs.clone(),
                max_tokens: DEFAULT_MAX_TOKENS,
            };

            let response = self.model.complete(request).await?;
            debug!(task_id, iteration, has_tool_calls = response.has_tool_calls(), "TaskRunner::run_tool_loop: model responded");

            if !response.has_tool_calls() {
                let text = response.text.unwrap_or_default();
                self.graph.append_message(task_id, Message::assistant_text(text.clone())).await?;

                if let Some(result) = strip_done_sentinel(&text) {
                    if result.is_empty() {
                        return Err(RunnerError::EmptyResult { task_id });
                    }
                    self.graph.set_result(task_id, result).await?;
                    return Ok(());
                }
                // Model produced plain text without the sentinel: still working, loop again.
                continue;
            }

            self.graph
                .append_message(task_id, Message::assistant_tool_calls(response.text.clone(), response.tool_calls.clone()))
                .await?;

            for call in &response.tool_calls {
                let args = call.arguments.normalize();
                let (content, is_error) = registry.dispatch(&call.name, args).await;

                if call.name == PLAN_TASK_TOOL_NAME && !is_error {
                    match planner::apply_plan(&self.graph, task_id, &content).await {
                        // A malformed plan is recovered locally, same as any other tool
                        // output (§7 error kind 5) — the model already saw `content`
                        // as its ToolResult and may retry.
                        Err(PlannerError::MalformedJson(e)) => {
                            warn!(task_id, error = %e, "TaskRunner::run_tool_loop: plan_task payload did not parse");
                        }
                        // A graph-level failure here means the current task itself
                        // vanished from the graph mid-run: a scheduler invariant
                        // violation, propagated terminally (§7 error kind 1-class).
                        Err(err @ PlannerError::Graph(_)) => return Err(RunnerError::Planner(err)),
                        Ok(_) => {}
                    }
                }

                self.graph.append_message(task_id, Message::tool_result(call.id.clone(), content, is_error)).await?;
            }
        }

        Err(RunnerError::IterationLimitExceeded { task_id, limit: self.max_iterations })
    }
}

/// Builds the fixed trailer (§4.5 step 2): dependency `{name, result}` pairs
/// plus the completion-protocol instructions.
fn build_user_prompt(prompt: &str, dependencies: &[(u64, String, String)]) -> String {
    let mut out = String::from(prompt);
    out.push_str("\n\n---\n");

    if dependencies.is_empty() {
        out.push_str("No dependency results.\n");
    } else {
        out.push_str("Dependency results:\n");
        for (_, dep_prompt, dep_result) in dependencies {
            out.push_str(&format!("- {dep_prompt}: {dep_result}\n"));
        }
    }

    out.push_str(
        "\nOutput the expected result and terminate with [DONE]. If you choose plan_task, \
         the plan is the result and you also terminate with [DONE].",
    );
    out
}

/// Only the literal `[DONE]` suffix is stripped — not trailing whitespace
/// before it, so formatting the model produced is preserved verbatim.
fn strip_done_sentinel(text: &str) -> Option<String> {
    text.strip_suffix(DONE_SENTINEL).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, TaskStatus};
    use crate::llm::{CompletionResponse, MockLlmClient, RawArguments, StopReason, TokenUsage, ToolCall};
    use crate::tools::builtin::{AddTool, EchoTool};
    use tokio::sync::Notify;

    fn graph() -> Arc<TaskGraph> {
        Arc::new(TaskGraph::new(Arc::new(Notify::new())))
    }

    fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            text: Some(text.to_string()),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            thinking: None,
            usage: TokenUsage::default(),
        }
    }

    #[tokio::test]
    async fn trivial_echo_no_tools() {
        let g = graph();
        let id = g.create_task("Say hello and terminate.", vec![], Priority::Normal).await;
        g.set_status(id, TaskStatus::Running).await.unwrap();

        let model = Arc::new(MockLlmClient::new(vec![text_response("hello there[DONE]")]));
        let runner = TaskRunner::new(g.clone(), model, 20);
        runner.run(id).await.unwrap();

        assert_eq!(g.result(id).await.unwrap().as_deref(), Some("hello there"));
    }

    #[tokio::test]
    async fn single_tool_call_then_done() {
        let g = graph();
        let tools: Vec<Arc<dyn crate::tools::Tool>> = vec![Arc::new(AddTool)];
        let id = g.create_task("Compute 2+3 using add, then output the number and terminate.", tools, Priority::Normal).await;
        g.set_status(id, TaskStatus::Running).await.unwrap();

        let tool_call = ToolCall { id: "call_1".into(), name: "add".into(), arguments: RawArguments::Value(serde_json::json!({"a": 2, "b": 3})) };
        let responses = vec![
            CompletionResponse {
                text: None,
                tool_calls: vec![tool_call],
                stop_reason: StopReason::ToolUse,
                thinking: None,
                usage: TokenUsage::default(),
            },
            text_response("The answer is 5[DONE]"),
        ];
        let model = Arc::new(MockLlmClient::new(responses));
        let runner = TaskRunner::new(g.clone(), model.clone(), 20);
        runner.run(id).await.unwrap();

        assert_eq!(model.call_count(), 2);
        assert_eq!(g.result(id).await.unwrap().as_deref(), Some("The answer is 5"));

        let context = g.context(id).await.unwrap();
        let tool_results = context.messages.iter().filter(|m| matches!(m, Message::ToolResult { .. })).count();
        assert_eq!(tool_results, 1);
    }

    #[tokio::test]
    async fn tool_raising_is_recovered_locally() {
        let g = graph();
        struct Boom;
        #[async_trait::async_trait]
        impl crate::tools::Tool for Boom {
            fn name(&self) -> &str {
                "boom"
            }
            fn description(&self) -> &str {
                "fails"
            }
            fn input_schema(&self) -> serde_json::Value {
                serde_json::json!({"type": "object"})
            }
            async fn call(&self, _args: serde_json::Value) -> Result<serde_json::Value, crate::tools::ToolError> {
                Err(crate::tools::ToolError::Failed("boom".into()))
            }
        }

        let tools: Vec<Arc<dyn crate::tools::Tool>> = vec![Arc::new(Boom)];
        let id = g.create_task("trigger boom", tools, Priority::Normal).await;
        g.set_status(id, TaskStatus::Running).await.unwrap();

        let tool_call = ToolCall { id: "call_1".into(), name: "boom".into(), arguments: RawArguments::Value(serde_json::json!({})) };
        let responses = vec![
            CompletionResponse {
                text: None,
                tool_calls: vec![tool_call],
                stop_reason: StopReason::ToolUse,
                thinking: None,
                usage: TokenUsage::default(),
            },
            text_response("recovered[DONE]"),
        ];
        let model = Arc::new(MockLlmClient::new(responses));
        let runner = TaskRunner::new(g.clone(), model, 20);
        runner.run(id).await.unwrap();

        assert_eq!(g.result(id).await.unwrap().as_deref(), Some("recovered"));
        let context = g.context(id).await.unwrap();
        let tool_result = context.messages.iter().find_map(|m| match m {
            Message::ToolResult { content, is_error, .. } => Some((content.clone(), *is_error)),
            _ => None,
        });
        assert_eq!(tool_result, Some(("error calling tool 'boom': boom".to_string(), true)));
    }

    #[tokio::test]
    async fn iteration_ceiling_fails_the_task() {
        let g = graph();
        let tools: Vec<Arc<dyn crate::tools::Tool>> = vec![Arc::new(EchoTool)];
        let id = g.create_task("loop forever", tools, Priority::Normal).await;
        g.set_status(id, TaskStatus::Running).await.unwrap();

        // Never emits a tool call nor a [DONE] sentinel: the loop can't progress.
        let responses: Vec<CompletionResponse> = (0..5).map(|_| text_response("still working")).collect();
        let model = Arc::new(MockLlmClient::new(responses));
        let runner = TaskRunner::new(g.clone(), model, 5);
        let err = runner.run(id).await.unwrap_err();
        assert!(matches!(err, RunnerError::IterationLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn missing_dependency_result_fails_fast() {
        let g = graph();
        let dep = g.create_task("dep", vec![], Priority::Normal).await;
        let child_id = g.allocate_id();
        let desc = crate::domain::TaskDesc::new(child_id, Priority::Normal, None, vec![dep], Default::default());
        g.register_children(vec![(crate::domain::Task::new(child_id, "child", vec![]), desc)]).await;
        g.set_status(child_id, TaskStatus::Running).await.unwrap();

        let model = Arc::new(MockLlmClient::new(vec![]));
        let runner = TaskRunner::new(g.clone(), model, 20);
        let err = runner.run(child_id).await.unwrap_err();
        assert!(matches!(err, RunnerError::Graph(GraphError::UnsatisfiedDependency(d, c)) if d == dep && c == child_id));
    }
}

//! Agent Facade (§4.8): the thin coordinator callers actually talk to.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Notify;
use tracing::info;

use crate::domain::{GraphError, Priority, TaskGraph, TaskStatus};
use crate::llm::LlmClient;
use crate::scheduler::{Scheduler, SchedulerConfig, SchedulerError};
use crate::tools::Tool;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("task {0} failed")]
    TaskFailed(u64),

    #[error("task {0} was canceled")]
    TaskCanceled(u64),

    #[error("run stalled: root task {root} never completed; unresolved tasks: {stalled:?}")]
    Stalled { root: u64, stalled: Vec<u64> },
}

/// Owns the Model, the Task Graph, and the Scheduler that drains it.
/// `chat` is the only entry point a caller needs.
pub struct Agent {
    model: Arc<dyn LlmClient>,
    scheduler: Scheduler,
}

impl Agent {
    pub fn new(model: Arc<dyn LlmClient>, scheduler_config: SchedulerConfig, runner_max_iterations: u32) -> Self {
        let new_task = Arc::new(Notify::new());
        let graph = Arc::new(TaskGraph::new(new_task.clone()));
        let scheduler = Scheduler::new(graph, model.clone(), runner_max_iterations, scheduler_config, new_task);
        Self { model, scheduler }
    }

    pub fn model(&self) -> &Arc<dyn LlmClient> {
        &self.model
    }

    /// Creates a root task for `prompt`, runs the Scheduler until the graph
    /// quiesces, and returns the root task's result — or a terminal
    /// [`AgentError`] describing why it never produced one.
    pub async fn chat(&self, prompt: impl Into<String>, tools: Vec<Arc<dyn Tool>>) -> Result<String, AgentError> {
        let prompt = prompt.into();
        let graph = self.scheduler.graph();
        let root_id = graph.create_task(prompt, tools, Priority::Normal).await;
        info!(task_id = root_id, "Agent::chat: root task created");

        self.scheduler.drain().await?;

        match graph.status(root_id).await? {
            TaskStatus::Completed => Ok(graph.result(root_id).await?.unwrap_or_default()),
            TaskStatus::Failed => Err(AgentError::TaskFailed(root_id)),
            TaskStatus::Canceled => Err(AgentError::TaskCanceled(root_id)),
            _ => {
                let stalled = graph.stalled().await;
                Err(AgentError::Stalled { root: root_id, stalled })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionResponse, MockLlmClient, StopReason, TokenUsage};

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
    async fn chat_returns_model_text_sentinel_stripped() {
        let model = Arc::new(MockLlmClient::new(vec![text_response("Hello![DONE]")]));
        let agent = Agent::new(model, SchedulerConfig::default(), 20);
        let result = agent.chat("Say hello and terminate.", vec![]).await.unwrap();
        assert_eq!(result, "Hello!");
    }

    #[tokio::test]
    async fn chat_surfaces_model_failure_as_task_failed() {
        let model = Arc::new(MockLlmClient::new(vec![]));
        let agent = Agent::new(model, SchedulerConfig::default(), 20);
        let err = agent.chat("anything", vec![]).await.unwrap_err();
        assert!(matches!(err, AgentError::TaskFailed(_)));
    }
}

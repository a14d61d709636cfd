//! Scheduler (§4.7): ready-set scan, priority admission, worker spawning, reaping.
//!
//! One cooperative control loop plus N concurrently `tokio::spawn`ed
//! workers, one per RUNNING task. The Graph is the only shared mutable
//! state; this loop is the sole writer of `status`/`start_time`/`end_time`/
//! `worker` (§5).

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, warn};

use crate::domain::{GraphError, TaskGraph, TaskStatus};
use crate::llm::LlmClient;
use crate::runner::TaskRunner;

use super::config::SchedulerConfig;
use super::queue::PriorityQueue;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Drives the Task Graph to quiescence: spawns a worker for every READY
/// task (subject to `max_concurrent`), reaps finished workers, and exits
/// once nothing is running and nothing remains CREATED/READY.
pub struct Scheduler {
    graph: Arc<TaskGraph>,
    model: Arc<dyn LlmClient>,
    runner_max_iterations: u32,
    config: SchedulerConfig,
    queue: Mutex<PriorityQueue>,
    new_task: Arc<Notify>,
    task_completed: Arc<Notify>,
}

impl Scheduler {
    /// `new_task` must be the same [`Notify`] handed to the [`TaskGraph`]
    /// this scheduler drains, so planner-created children wake an idle loop.
    pub fn new(
        graph: Arc<TaskGraph>,
        model: Arc<dyn LlmClient>,
        runner_max_iterations: u32,
        config: SchedulerConfig,
        new_task: Arc<Notify>,
    ) -> Self {
        Self {
            graph,
            model,
            runner_max_iterations,
            config,
            queue: Mutex::new(PriorityQueue::new()),
            new_task,
            task_completed: Arc::new(Notify::new()),
        }
    }

    pub fn graph(&self) -> &Arc<TaskGraph> {
        &self.graph
    }

    /// Run the main loop (§4.7 steps 1-5) until the graph quiesces.
    pub async fn drain(&self) -> Result<(), SchedulerError> {
        loop {
            let reaped = self.reap().await?;
            if reaped {
                self.task_completed.notify_one();
            }

            self.enqueue_ready().await;
            self.admit().await?;

            if self.graph.is_quiescent().await {
                debug!("Scheduler::drain: graph quiesced, exiting");
                return Ok(());
            }

            if self.is_stalled().await {
                warn!("Scheduler::drain: no workers running and nothing admissible, exiting on stalled dependencies");
                return Ok(());
            }

            self.wait_idle().await;
        }
    }

    /// True when the graph has made all the progress it ever will: nothing
    /// is RUNNING, nothing is waiting in the priority queue, yet the graph
    /// is not quiescent — some task is stuck in CREATED because a
    /// dependency terminated without COMPLETING (§7 error kind 4, §8
    /// stalled-dependency boundary). Without this check `drain()` would
    /// spin the reap/enqueue/admit/wait loop forever.
    async fn is_stalled(&self) -> bool {
        if !self.graph.running_ids().await.is_empty() {
            return false;
        }
        if !self.queue.lock().await.is_empty() {
            return false;
        }
        !self.graph.is_quiescent().await
    }

    /// Step 1: reap every finished worker, marking its task COMPLETED,
    /// FAILED, or CANCELED. Returns whether anything was reaped.
    async fn reap(&self) -> Result<bool, SchedulerError> {
        let running = self.graph.running_ids().await;
        let mut reaped_any = false;

        for id in running {
            let Some(join_result) = self.graph.reap_if_finished(id).await else { continue };
            reaped_any = true;

            let status = match join_result {
                Ok(Ok(())) => TaskStatus::Completed,
                Ok(Err(worker_err)) => {
                    warn!(task_id = id, error = %worker_err, "Scheduler::reap: task failed");
                    TaskStatus::Failed
                }
                Err(join_err) if join_err.is_cancelled() => {
                    debug!(task_id = id, "Scheduler::reap: task was cancelled");
                    TaskStatus::Canceled
                }
                Err(join_err) => {
                    error!(task_id = id, error = %join_err, "Scheduler::reap: worker panicked");
                    TaskStatus::Failed
                }
            };

            self.graph.mark_terminal(id, status).await?;
        }

        Ok(reaped_any)
    }

    /// Step 2: CREATED tasks with all dependencies COMPLETED become READY
    /// and are admitted into the priority queue.
    async fn enqueue_ready(&self) {
        let ready = self.graph.find_ready().await;
        if ready.is_empty() {
            return;
        }
        let mut queue = self.queue.lock().await;
        for (id, priority) in ready {
            debug!(task_id = id, ?priority, "Scheduler::enqueue_ready: admitting to priority queue");
            queue.push(id, priority);
        }
    }

    /// Step 3: pop the queue while under the concurrency cap, spawning a worker per task.
    async fn admit(&self) -> Result<(), SchedulerError> {
        loop {
            if let Some(max) = self.config.max_concurrent {
                if self.graph.running_ids().await.len() >= max {
                    break;
                }
            }

            let next_id = {
                let mut queue = self.queue.lock().await;
                queue.pop()
            };
            let Some(id) = next_id else { break };

            self.spawn_worker(id).await?;
        }
        Ok(())
    }

    async fn spawn_worker(&self, task_id: u64) -> Result<(), SchedulerError> {
        let graph = self.graph.clone();
        let model = self.model.clone();
        let max_iterations = self.runner_max_iterations;
        let task_completed = self.task_completed.clone();

        let handle = tokio::spawn(async move {
            let runner = TaskRunner::new(graph, model, max_iterations);
            let result = runner.run(task_id).await.map_err(|e| crate::domain::WorkerError(e.to_string()));
            task_completed.notify_one();
            result
        });

        debug!(task_id, "Scheduler::spawn_worker: admitted");
        self.graph.mark_running(task_id, handle).await?;
        Ok(())
    }

    /// Step 5: wait for either edge-triggered event, or a short safety-poll timeout.
    async fn wait_idle(&self) {
        tokio::select! {
            _ = self.task_completed.notified() => {}
            _ = self.new_task.notified() => {}
            _ = tokio::time::sleep(self.config.idle_poll) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;
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

    fn scheduler(model: Arc<dyn LlmClient>) -> Scheduler {
        let new_task = Arc::new(Notify::new());
        let graph = Arc::new(TaskGraph::new(new_task.clone()));
        Scheduler::new(graph, model, 20, SchedulerConfig::default(), new_task)
    }

    #[tokio::test]
    async fn empty_graph_quiesces_immediately() {
        let model = Arc::new(MockLlmClient::new(vec![]));
        let s = scheduler(model);
        s.drain().await.unwrap();
    }

    #[tokio::test]
    async fn single_no_tool_task_completes() {
        let model = Arc::new(MockLlmClient::new(vec![text_response("hi[DONE]")]));
        let s = scheduler(model);
        let id = s.graph().create_task("say hi", vec![], Priority::Normal).await;
        s.drain().await.unwrap();
        assert_eq!(s.graph().status(id).await.unwrap(), TaskStatus::Completed);
        assert_eq!(s.graph().result(id).await.unwrap().as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn diamond_dag_completes_all_nodes() {
        // root -> (a, b deps [root]) hand-built directly against the graph;
        // the scheduler itself only needs to observe dependency edges.
        let model = Arc::new(MockLlmClient::new(vec![
            text_response("root done[DONE]"),
            text_response("a done[DONE]"),
            text_response("b done[DONE]"),
            text_response("d done[DONE]"),
        ]));
        let s = scheduler(model);
        let root = s.graph().create_task("root", vec![], Priority::Normal).await;

        // a and b both depend on root; d depends on both a and b.
        let a_id = s.graph().allocate_id();
        let b_id = s.graph().allocate_id();
        let d_id = s.graph().allocate_id();
        s.graph()
            .register_children(vec![
                (
                    crate::domain::Task::new(a_id, "a", vec![]),
                    crate::domain::TaskDesc::new(a_id, Priority::Normal, Some(root), vec![root], Default::default()),
                ),
                (
                    crate::domain::Task::new(b_id, "b", vec![]),
                    crate::domain::TaskDesc::new(b_id, Priority::Normal, Some(root), vec![root], Default::default()),
                ),
                (
                    crate::domain::Task::new(d_id, "d", vec![]),
                    crate::domain::TaskDesc::new(d_id, Priority::Normal, Some(root), vec![a_id, b_id], Default::default()),
                ),
            ])
            .await;

        s.drain().await.unwrap();

        for id in [root, a_id, b_id, d_id] {
            assert_eq!(s.graph().status(id).await.unwrap(), TaskStatus::Completed, "task {id} should complete");
        }
    }

    #[tokio::test]
    async fn unsatisfied_dependency_quiesces_without_running_child() {
        let model = Arc::new(MockLlmClient::new(vec![]));
        let s = scheduler(model);
        let a = s.graph().create_task("a", vec![], Priority::Normal).await;
        s.graph().mark_terminal(a, TaskStatus::Failed).await.unwrap();

        let b_id = s.graph().allocate_id();
        s.graph()
            .register_children(vec![(
                crate::domain::Task::new(b_id, "b", vec![]),
                crate::domain::TaskDesc::new(b_id, Priority::Normal, None, vec![a], Default::default()),
            )])
            .await;

        s.drain().await.unwrap();
        assert_eq!(s.graph().status(b_id).await.unwrap(), TaskStatus::Created);
        let stalled = s.graph().stalled().await;
        assert_eq!(stalled, vec![b_id]);
    }
}

//! The Task Graph: the only shared mutable state in the system
//!
//! A single [`tokio::sync::Mutex`] guards both maps. Contention is expected
//! to stay low because critical sections never hold the lock across an
//! `.await` on a model or tool call — only short map lookups/inserts.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::tools::Tool;

use super::id::IdGenerator;
use super::priority::Priority;
use super::task::{Task, TaskContext, TaskDesc, TaskStatus, WorkerError};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unknown task id {0}")]
    UnknownTask(u64),
    #[error("dependency {0} of task {1} has not produced a result")]
    UnsatisfiedDependency(u64, u64),
}

struct Inner {
    tasks: HashMap<u64, Task>,
    descs: HashMap<u64, TaskDesc>,
}

/// Owns every [`Task`]/[`TaskDesc`] pair for one [`crate::Agent`].
pub struct TaskGraph {
    ids: IdGenerator,
    inner: Mutex<Inner>,
    new_task: Arc<Notify>,
}

impl TaskGraph {
    /// `new_task` is signalled whenever the planner (or the initial root
    /// task) adds entries, so the scheduler can wake from its idle wait.
    pub fn new(new_task: Arc<Notify>) -> Self {
        Self {
            ids: IdGenerator::new(),
            inner: Mutex::new(Inner { tasks: HashMap::new(), descs: HashMap::new() }),
            new_task,
        }
    }

    /// Create a root task with no parent and no dependencies.
    pub async fn create_task(&self, prompt: impl Into<String>, tools: Vec<Arc<dyn Tool>>, priority: Priority) -> u64 {
        let id = self.ids.next_id();
        let task = Task::new(id, prompt, tools);
        let desc = TaskDesc::new(id, priority, None, Vec::new(), TaskContext::default());
        debug!(task_id = id, "TaskGraph::create_task: inserting root task");
        let mut inner = self.inner.lock().await;
        inner.tasks.insert(id, task);
        inner.descs.insert(id, desc);
        drop(inner);
        self.new_task.notify_one();
        id
    }

    /// Allocate a fresh ID for a planner-created child without registering it yet.
    /// Used by the two-pass planner resolution (tag binding happens before
    /// dependency resolution).
    pub fn allocate_id(&self) -> u64 {
        self.ids.next_id()
    }

    /// Register a batch of planner-created children atomically.
    pub async fn register_children(&self, children: Vec<(Task, TaskDesc)>) {
        if children.is_empty() {
            return;
        }
        let mut inner = self.inner.lock().await;
        for (task, desc) in children {
            debug!(task_id = task.id, parent_id = ?desc.parent_id, "TaskGraph::register_children: inserting child task");
            inner.tasks.insert(task.id, task);
            inner.descs.insert(desc.id, desc);
        }
        drop(inner);
        self.new_task.notify_one();
    }

    pub async fn get_task_prompt_and_tools(&self, id: u64) -> Result<(String, Vec<Arc<dyn Tool>>), GraphError> {
        let inner = self.inner.lock().await;
        let task = inner.tasks.get(&id).ok_or(GraphError::UnknownTask(id))?;
        Ok((task.prompt.clone(), task.tools.clone()))
    }

    pub async fn context(&self, id: u64) -> Result<TaskContext, GraphError> {
        let inner = self.inner.lock().await;
        let desc = inner.descs.get(&id).ok_or(GraphError::UnknownTask(id))?;
        Ok(desc.context.clone())
    }

    pub async fn append_message(&self, id: u64, message: crate::llm::Message) -> Result<(), GraphError> {
        let mut inner = self.inner.lock().await;
        let desc = inner.descs.get_mut(&id).ok_or(GraphError::UnknownTask(id))?;
        desc.context.messages.push(message);
        Ok(())
    }

    pub async fn set_result(&self, id: u64, result: String) -> Result<(), GraphError> {
        let mut inner = self.inner.lock().await;
        let task = inner.tasks.get_mut(&id).ok_or(GraphError::UnknownTask(id))?;
        task.result = Some(result);
        Ok(())
    }

    pub async fn result(&self, id: u64) -> Result<Option<String>, GraphError> {
        let inner = self.inner.lock().await;
        let task = inner.tasks.get(&id).ok_or(GraphError::UnknownTask(id))?;
        Ok(task.result.clone())
    }

    pub async fn status(&self, id: u64) -> Result<TaskStatus, GraphError> {
        let inner = self.inner.lock().await;
        let desc = inner.descs.get(&id).ok_or(GraphError::UnknownTask(id))?;
        Ok(desc.status)
    }

    pub async fn set_status(&self, id: u64, status: TaskStatus) -> Result<(), GraphError> {
        let mut inner = self.inner.lock().await;
        let desc = inner.descs.get_mut(&id).ok_or(GraphError::UnknownTask(id))?;
        desc.status = status;
        Ok(())
    }

    pub async fn mark_running(
        &self,
        id: u64,
        worker: tokio::task::JoinHandle<Result<(), WorkerError>>,
    ) -> Result<(), GraphError> {
        let mut inner = self.inner.lock().await;
        let desc = inner.descs.get_mut(&id).ok_or(GraphError::UnknownTask(id))?;
        desc.status = TaskStatus::Running;
        desc.start_time = Some(std::time::Instant::now());
        desc.worker = Some(worker);
        Ok(())
    }

    pub async fn mark_terminal(&self, id: u64, status: TaskStatus) -> Result<(), GraphError> {
        debug_assert!(status.is_terminal());
        let mut inner = self.inner.lock().await;
        let desc = inner.descs.get_mut(&id).ok_or(GraphError::UnknownTask(id))?;
        desc.status = status;
        desc.end_time = Some(std::time::Instant::now());
        desc.worker = None;
        Ok(())
    }

    /// Fetch `{prompt, result}` for every dependency of `id`. Fails if a
    /// dependency hasn't produced a result yet — the scheduler should never
    /// have marked `id` READY in that case.
    pub async fn dependency_status(&self, id: u64) -> Result<Vec<(u64, String, String)>, GraphError> {
        let inner = self.inner.lock().await;
        let desc = inner.descs.get(&id).ok_or(GraphError::UnknownTask(id))?;
        let mut out = Vec::with_capacity(desc.dependencies.len());
        for dep_id in &desc.dependencies {
            let dep_task = inner.tasks.get(dep_id).ok_or(GraphError::UnknownTask(*dep_id))?;
            let result = dep_task.result.clone().ok_or(GraphError::UnsatisfiedDependency(*dep_id, id))?;
            out.push((*dep_id, dep_task.prompt.clone(), result));
        }
        Ok(out)
    }

    /// Scan for CREATED tasks whose dependencies are all COMPLETED; transition
    /// them to READY and return their IDs with priority, in no particular order.
    pub async fn find_ready(&self) -> Vec<(u64, Priority)> {
        let mut inner = self.inner.lock().await;
        let ready_ids: Vec<u64> = inner
            .descs
            .iter()
            .filter(|(_, desc)| desc.status == TaskStatus::Created)
            .filter(|(_, desc)| {
                desc.dependencies.iter().all(|dep| {
                    inner.descs.get(dep).map(|d| d.status == TaskStatus::Completed).unwrap_or(false)
                })
            })
            .map(|(id, _)| *id)
            .collect();

        let mut out = Vec::with_capacity(ready_ids.len());
        for id in ready_ids {
            if let Some(desc) = inner.descs.get_mut(&id) {
                desc.status = TaskStatus::Ready;
                out.push((id, desc.priority));
            }
        }
        out
    }

    /// True if nothing is running and nothing remains created/ready: the run has quiesced.
    pub async fn is_quiescent(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.descs.values().all(|d| {
            d.status != TaskStatus::Running && d.status != TaskStatus::Created && d.status != TaskStatus::Ready
        })
    }

    /// Task IDs still stuck in CREATED/READY once the run has quiesced (unsatisfiable deps).
    pub async fn stalled(&self) -> Vec<u64> {
        let inner = self.inner.lock().await;
        inner
            .descs
            .values()
            .filter(|d| matches!(d.status, TaskStatus::Created | TaskStatus::Ready))
            .map(|d| d.id)
            .collect()
    }

    /// If `id`'s worker has finished, take and `.await` its `JoinHandle`,
    /// clearing the descriptor's worker slot. Returns `None` if the task has
    /// no worker or it is still running — this is the only method the
    /// Scheduler needs to implement its reap step (§4.7 step 1) without a
    /// race between checking `is_finished()` and taking the handle, since
    /// both happen under one lock acquisition.
    pub async fn reap_if_finished(&self, id: u64) -> Option<Result<Result<(), WorkerError>, tokio::task::JoinError>> {
        let handle = {
            let mut inner = self.inner.lock().await;
            let desc = inner.descs.get_mut(&id)?;
            if desc.worker.as_ref().map(|w| w.is_finished()).unwrap_or(false) {
                desc.worker.take()
            } else {
                None
            }
        }?;
        Some(handle.await)
    }

    /// `(start_time, end_time)` for `id`, for tests asserting the §8
    /// timing invariant ("D's start_time > max(B.end_time, C.end_time)").
    pub async fn timing(&self, id: u64) -> Result<(Option<std::time::Instant>, Option<std::time::Instant>), GraphError> {
        let inner = self.inner.lock().await;
        let desc = inner.descs.get(&id).ok_or(GraphError::UnknownTask(id))?;
        Ok((desc.start_time, desc.end_time))
    }

    pub async fn running_ids(&self) -> Vec<u64> {
        let inner = self.inner.lock().await;
        inner.descs.iter().filter(|(_, d)| d.status == TaskStatus::Running).map(|(id, _)| *id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> TaskGraph {
        TaskGraph::new(Arc::new(Notify::new()))
    }

    #[tokio::test]
    async fn create_task_starts_created_with_no_deps() {
        let g = graph();
        let id = g.create_task("hello", vec![], Priority::Normal).await;
        assert_eq!(g.status(id).await.unwrap(), TaskStatus::Created);
        assert!(g.dependency_status(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_ready_respects_dependencies() {
        let g = graph();
        let a = g.create_task("a", vec![], Priority::Normal).await;
        let b_id = g.allocate_id();
        let desc = TaskDesc::new(b_id, Priority::Normal, None, vec![a], TaskContext::default());
        let task = Task::new(b_id, "b", vec![]);
        g.register_children(vec![(task, desc)]).await;

        let ready = g.find_ready().await;
        assert_eq!(ready.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![a]);

        g.set_result(a, "done".into()).await.unwrap();
        g.mark_terminal(a, TaskStatus::Completed).await.unwrap();

        let ready = g.find_ready().await;
        assert_eq!(ready.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![b_id]);
    }

    #[tokio::test]
    async fn dependency_status_fails_when_result_missing() {
        let g = graph();
        let a = g.create_task("a", vec![], Priority::Normal).await;
        let b_id = g.allocate_id();
        let desc = TaskDesc::new(b_id, Priority::Normal, None, vec![a], TaskContext::default());
        g.register_children(vec![(Task::new(b_id, "b", vec![]), desc)]).await;

        let err = g.dependency_status(b_id).await.unwrap_err();
        assert!(matches!(err, GraphError::UnsatisfiedDependency(dep, task) if dep == a && task == b_id));
    }

    #[tokio::test]
    async fn is_quiescent_true_only_when_nothing_pending() {
        let g = graph();
        let a = g.create_task("a", vec![], Priority::Normal).await;
        assert!(!g.is_quiescent().await);
        g.mark_terminal(a, TaskStatus::Completed).await.unwrap();
        assert!(g.is_quiescent().await);
    }
}

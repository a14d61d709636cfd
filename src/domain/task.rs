//! Task and TaskDesc: the static definition and dynamic descriptor of a unit of work

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::llm::Message;
use crate::tools::Tool;

use super::priority::Priority;

/// Opaque failure reason for a worker task, joined by the Scheduler.
///
/// Defined here rather than reusing `crate::runner::RunnerError` directly so
/// `domain` does not depend on `runner` (the runner depends on `domain`, not
/// the other way around); `runner` converts its own error into this one.
#[derive(Debug, Clone)]
pub struct WorkerError(pub String);

impl std::fmt::Display for WorkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for WorkerError {}

/// Runtime lifecycle of a task.
///
/// Transitions obey `CREATED -> READY -> RUNNING -> {COMPLETED | FAILED | CANCELED}`;
/// there are no back-transitions. `PENDING` is reserved for a future
/// blocked-task pathway and is never assigned by this implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Created,
    Pending,
    Ready,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Canceled)
    }
}

/// The conversational state carried by one task.
///
/// `messages` is append-only; only the task's own [`crate::runner::TaskRunner`]
/// writes to it. When the planner forks a child task it deep-copies the
/// parent's context at that moment, so subsequent mutations diverge.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    pub system: String,
    pub messages: Vec<Message>,
}

impl TaskContext {
    pub fn new(system: impl Into<String>) -> Self {
        Self { system: system.into(), messages: Vec::new() }
    }
}

/// Static definition of a unit of work. Immutable after creation except for
/// `result`, which is written exactly once on successful completion.
#[derive(Clone)]
pub struct Task {
    pub id: u64,
    pub prompt: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub result: Option<String>,
}

impl Task {
    pub fn new(id: u64, prompt: impl Into<String>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { id, prompt: prompt.into(), tools, result: None }
    }
}

/// Dynamic, mutable descriptor for a task.
///
/// Single-writer discipline: only the [`crate::scheduler::Scheduler`] writes
/// `status`, `start_time`, `end_time` and `worker`; only the task's own
/// runner writes `context`. The planner only ever inserts brand-new
/// descriptors, never mutates an existing one.
pub struct TaskDesc {
    pub id: u64,
    pub status: TaskStatus,
    pub priority: Priority,
    pub parent_id: Option<u64>,
    pub dependencies: Vec<u64>,
    pub context: TaskContext,
    pub start_time: Option<std::time::Instant>,
    pub end_time: Option<std::time::Instant>,
    pub worker: Option<JoinHandle<Result<(), WorkerError>>>,
}

impl TaskDesc {
    pub fn new(id: u64, priority: Priority, parent_id: Option<u64>, dependencies: Vec<u64>, context: TaskContext) -> Self {
        Self {
            id,
            status: TaskStatus::Created,
            priority,
            parent_id,
            dependencies,
            context,
            start_time: None,
            end_time: None,
            worker: None,
        }
    }
}

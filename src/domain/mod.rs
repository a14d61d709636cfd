//! Domain types: the Task Graph and everything it stores
//!
//! [`Task`]/[`TaskDesc`] are the static definition and dynamic descriptor of
//! one unit of work; [`TaskGraph`] owns every task in one agent's run behind
//! a single mutex (see its module doc for the single-writer discipline).

mod graph;
mod id;
mod priority;
mod task;

pub use graph::{GraphError, TaskGraph};
pub use id::IdGenerator;
pub use priority::Priority;
pub use task::{Task, TaskContext, TaskDesc, TaskStatus, WorkerError};

//! TaskGraph - a hierarchical task scheduler with tool-augmented LLM execution loops
//!
//! An agent decomposes a natural-language request into a DAG of
//! interdependent subtasks. Each subtask runs a bounded "think -> call-tool
//! -> observe" loop against a Model; a distinguished `plan_task` tool may
//! recursively expand any subtask into further children; a Scheduler
//! coordinates concurrent execution respecting the dependency graph.
//!
//! # Modules
//!
//! - [`domain`] - the Task Graph: task records, descriptors, lifecycle states
//! - [`scheduler`] - the event-driven admission/reaping loop
//! - [`runner`] - the per-task reasoning loop
//! - [`planner`] - `plan_task` result -> graph mutation
//! - [`tools`] - the Tool Registry and invocation contract
//! - [`llm`] - the Model interface and concrete clients
//! - [`config`] - layered configuration
//!
//! The [`Agent`] facade is the entry point most callers need: construct one
//! with a [`llm::LlmClient`] and call [`Agent::chat`].

pub mod agent;
pub mod config;
pub mod domain;
pub mod llm;
pub mod planner;
pub mod runner;
pub mod scheduler;
pub mod tools;

pub use agent::{Agent, AgentError};
pub use config::Config;
pub use domain::{Priority, Task, TaskContext, TaskDesc, TaskGraph, TaskStatus};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError};
pub use planner::{PlannerError, apply_plan};
pub use runner::{RunnerError, TaskRunner};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerError};
pub use tools::{Tool, ToolError, ToolRegistry};

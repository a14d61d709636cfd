//! Scheduler (§4.7): the event-driven loop coordinating the Task Graph.

mod config;
mod core;
mod queue;

pub use config::SchedulerConfig;
pub use core::{Scheduler, SchedulerError};
pub use queue::PriorityQueue;

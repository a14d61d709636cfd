//! Demonstration tools: concrete, minimal stand-ins for the "opaque domain
//! tools" the specification declares out of scope, present so this crate's
//! own tests and demo binary can exercise the Runner/Scheduler/Planner
//! end-to-end without a live network call.

mod add;
mod echo;
mod plan_task;

pub use add::AddTool;
pub use echo::EchoTool;
pub use plan_task::PlanTaskTool;

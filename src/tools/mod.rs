//! Tool Registry & Invocation contract consumed by the Runner
//!
//! A [`Tool`] is an opaque callable with a JSON-Schema parameter descriptor;
//! concrete domain tools (web search, file I/O, memory/RAG) are out of this
//! crate's scope (§1) beyond the small demonstration set in
//! [`builtin`] used by the test suite and demo binary.

mod error;
mod registry;
mod traits;

pub mod builtin;

pub use error::ToolError;
pub use registry::ToolRegistry;
pub use traits::Tool;

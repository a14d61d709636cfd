//! Tool error types

use thiserror::Error;

/// Errors a [`crate::tools::Tool::call`] implementation may raise.
///
/// Per the Tool Registry contract, these never propagate as a Rust `Err` out
/// of [`crate::tools::ToolRegistry::dispatch`] — they are caught there and
/// turned into an error string fed back to the model as a `ToolResult`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Failed(String),
}

use thiserror::Error;

use super::validation::ValidationFailure;

pub use crate::infrastructure::rpc::ToolInvokeError;

/// Failures that stop a call before it is dispatched.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool '{name}' not found. Available tools: {}", available.join(", "))]
    NotFound { name: String, available: Vec<String> },
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
}

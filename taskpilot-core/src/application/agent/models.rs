use serde::Serialize;
use thiserror::Error;

use super::node::AgentNode;
use crate::application::tooling::ToolInvokeError;
use crate::domain::{LlmProvider, SessionState};

/// Input of one run. The message defaults to the goal; the provider
/// defaults to the router's default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub goal: String,
    pub message: Option<String>,
    pub provider: Option<LlmProvider>,
}

impl RunRequest {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            message: None,
            provider: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_provider(mut self, provider: LlmProvider) -> Self {
        self.provider = Some(provider);
        self
    }
}

/// Session snapshot taken right after `node` ran.
#[derive(Debug, Clone, Serialize)]
pub struct AgentUpdate {
    pub node: AgentNode,
    pub state: SessionState,
}

/// Failures while wiring an agent. A run itself never fails.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to set up tool client: {0}")]
    Tools(#[from] ToolInvokeError),
}

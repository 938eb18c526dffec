//! Domain types shared by every layer: chat messages, providers, tool
//! descriptors and the per-run session state.

pub mod provider;
pub mod state;
pub mod tool;
pub mod types;

pub use provider::LlmProvider;
pub use state::{
    AgentMessage, IntermediateResult, PlanStep, SessionState, StepAction, ToolCallOutcome,
    ToolCallRecord,
};
pub use tool::{FieldSpec, FieldType, InputSchema, ToolDescriptor};
pub use types::{ChatMessage, MessageRole};

//! Autonomous task agent: plans a goal with a language model, calls tools
//! over JSON-RPC and evaluates its progress until it can answer.

pub mod application;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::agent::{AgentNode, AgentUpdate, AutonomousAgent, RunRequest};
pub use application::planner::{Planner, PlannerError};
pub use application::tooling::{ToolClient, ToolError, ToolInvokeError};
pub use application::{agent, planner, tooling};
pub use config::{AppConfig, ConfigError};
pub use domain::{LlmProvider, SessionState};
pub use infrastructure::model::{LlmRouter, ModelError};
pub use infrastructure::{model, rpc};

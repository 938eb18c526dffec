mod models;
mod node;
mod nodes;
mod runner;

#[cfg(test)]
mod tests;

pub use models::{AgentError, AgentUpdate, RunRequest};
pub use node::{AgentNode, Route, RouteReason, route};
pub use runner::{AgentUpdateStream, AutonomousAgent};

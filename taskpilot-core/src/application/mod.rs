//! Application layer: tool client, planner and the agent state machine.

pub mod agent;
pub mod planner;
pub mod tooling;

#[cfg(test)]
pub(crate) mod test_support;

use std::fmt;

use serde::Serialize;

use crate::constants::ERROR_CEILING;
use crate::domain::SessionState;

/// States of the run. `Finish` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentNode {
    Initialize,
    Planner,
    ToolCaller,
    Executor,
    Evaluator,
    Finish,
}

impl AgentNode {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentNode::Initialize => "initialize",
            AgentNode::Planner => "planner",
            AgentNode::ToolCaller => "tool_caller",
            AgentNode::Executor => "executor",
            AgentNode::Evaluator => "evaluator",
            AgentNode::Finish => "finish",
        }
    }

    /// Fixed successor for every node except `Evaluator` (routed) and
    /// `Finish` (none).
    pub fn successor(self) -> Option<AgentNode> {
        match self {
            AgentNode::Initialize => Some(AgentNode::Planner),
            AgentNode::Planner => Some(AgentNode::ToolCaller),
            AgentNode::ToolCaller => Some(AgentNode::Executor),
            AgentNode::Executor => Some(AgentNode::Evaluator),
            AgentNode::Evaluator | AgentNode::Finish => None,
        }
    }
}

impl fmt::Display for AgentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which routing rule fired after the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteReason {
    Complete,
    /// More errors than the ceiling; the run is forced complete.
    ErrorCeiling,
    AwaitingInput,
    NoPlan,
    StepsDone,
    NextStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub next: AgentNode,
    pub reason: RouteReason,
}

impl Route {
    fn to(next: AgentNode, reason: RouteReason) -> Self {
        Self { next, reason }
    }
}

/// Branch taken after the evaluator, rules checked in priority order.
pub fn route(state: &SessionState) -> Route {
    if state.is_complete {
        return Route::to(AgentNode::Finish, RouteReason::Complete);
    }
    if state.errors.len() > ERROR_CEILING {
        return Route::to(AgentNode::Finish, RouteReason::ErrorCeiling);
    }
    if state.needs_user_input {
        return Route::to(AgentNode::Finish, RouteReason::AwaitingInput);
    }
    if state.execution_steps.is_empty() {
        return Route::to(AgentNode::Planner, RouteReason::NoPlan);
    }
    if state.steps_exhausted() {
        return Route::to(AgentNode::Finish, RouteReason::StepsDone);
    }
    Route::to(AgentNode::ToolCaller, RouteReason::NextStep)
}

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use super::models::{AgentError, AgentUpdate, RunRequest};
use super::node::{AgentNode, RouteReason, route};
use crate::application::planner::Planner;
use crate::application::tooling::ToolClient;
use crate::config::AppConfig;
use crate::domain::SessionState;
use crate::infrastructure::model::LlmRouter;

pub type AgentUpdateStream = UnboundedReceiverStream<AgentUpdate>;

/// Drives one session through the node graph. Cheap to clone; clones share
/// the planner, the tool client and its discovery cache.
#[derive(Clone)]
pub struct AutonomousAgent {
    planner: Arc<Planner>,
    tools: Arc<ToolClient>,
    max_iterations: u32,
}

impl AutonomousAgent {
    pub fn new(planner: Arc<Planner>, tools: Arc<ToolClient>, max_iterations: u32) -> Self {
        Self {
            planner,
            tools,
            max_iterations,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AgentError> {
        let router = Arc::new(LlmRouter::from_config(config));
        let tools = Arc::new(ToolClient::from_config(config)?);
        info!(
            providers = ?router.available_providers(),
            tool_server = %tools.server(),
            "Agent wired"
        );
        Ok(Self::new(
            Arc::new(Planner::new(router)),
            tools,
            config.agent.max_iterations,
        ))
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn tools(&self) -> &ToolClient {
        &self.tools
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    fn initial_state(&self, request: RunRequest) -> SessionState {
        let provider = request
            .provider
            .or_else(|| self.planner.router().default_provider().ok())
            .unwrap_or_default();
        let message = request
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| request.goal.clone());
        SessionState::new(request.goal, message, provider)
    }

    /// Runs a goal to completion. Always returns a finished session carrying
    /// a final response, whatever failed along the way.
    pub async fn run(&self, request: RunRequest) -> SessionState {
        let mut state = self.initial_state(request);
        info!(goal = %state.user_goal, provider = state.selected_provider.as_str(), "Starting agent run");
        self.drive(&mut state, |_, _| true).await;
        state
    }

    /// Same run as [`run`](Self::run), yielding a snapshot after every node.
    /// The stream ends after `finish`. Dropping it stops the run at the next
    /// node boundary.
    pub fn run_streaming(&self, request: RunRequest) -> AgentUpdateStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let agent = self.clone();
        let mut state = self.initial_state(request);
        info!(goal = %state.user_goal, "Starting streaming agent run");

        tokio::spawn(async move {
            agent
                .drive(&mut state, |node, state| {
                    let delivered = tx
                        .send(AgentUpdate {
                            node,
                            state: state.clone(),
                        })
                        .is_ok();
                    if !delivered {
                        debug!(node = node.as_str(), "Update stream dropped, stopping run");
                    }
                    delivered
                })
                .await;
        });
        UnboundedReceiverStream::new(rx)
    }

    async fn drive<F>(&self, state: &mut SessionState, mut on_node: F)
    where
        F: FnMut(AgentNode, &SessionState) -> bool + Send,
    {
        let mut node = AgentNode::Initialize;
        loop {
            debug!(node = node.as_str(), iteration = state.iteration_count, "Entering node");
            self.execute_node(node, state).await;
            if !on_node(node, state) {
                return;
            }

            node = match node {
                AgentNode::Finish => break,
                AgentNode::Evaluator => {
                    let decision = route(state);
                    if decision.reason == RouteReason::ErrorCeiling {
                        warn!(errors = state.errors.len(), "Error ceiling exceeded, finishing run");
                        state.is_complete = true;
                    }
                    debug!(next = decision.next.as_str(), reason = ?decision.reason, "Routed");
                    decision.next
                }
                fixed => fixed.successor().unwrap_or(AgentNode::Finish),
            };
        }

        info!(
            session_id = state.session_id.as_deref(),
            iterations = state.iteration_count,
            errors = state.errors.len(),
            tools_used = state.tool_calls.len(),
            "Agent run finished"
        );
    }
}

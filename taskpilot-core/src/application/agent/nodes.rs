//! Node bodies. Each one records its own failures in the session's error
//! log and returns normally so the run keeps advancing.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::node::AgentNode;
use super::runner::AutonomousAgent;
use crate::application::planner::{Evaluation, FailedCall, NextAction, ToolSelection, guidance};
use crate::domain::{IntermediateResult, MessageRole, SessionState};

const AWAITING_INPUT_FALLBACK: &str = "Please provide more information to continue.";

impl AutonomousAgent {
    pub(super) async fn execute_node(&self, node: AgentNode, state: &mut SessionState) {
        match node {
            AgentNode::Initialize => self.initialize(state).await,
            AgentNode::Planner => self.plan(state).await,
            AgentNode::ToolCaller => self.call_tool(state).await,
            AgentNode::Executor => self.record_progress(state),
            AgentNode::Evaluator => self.evaluate(state).await,
            AgentNode::Finish => self.finish(state).await,
        }
    }

    async fn initialize(&self, state: &mut SessionState) {
        if state.session_id.is_none() {
            state.session_id = Some(Uuid::new_v4().to_string());
        }
        if state.start_time.is_none() {
            state.start_time = Some(Utc::now());
        }

        match self.tools().discover_tools(false).await {
            Ok(snapshot) => {
                state.available_tools = snapshot.tools.clone();
                info!(
                    session_id = state.session_id.as_deref(),
                    tools = state.available_tools.len(),
                    "Session initialised"
                );
            }
            Err(err) => {
                warn!(%err, "Tool discovery failed");
                state.add_error(format!("Failed to initialize tools: {err}"));
            }
        }

        let message = state.user_message.clone();
        state.add_message(MessageRole::User, message);
    }

    async fn plan(&self, state: &mut SessionState) {
        match self.planner().create_initial_plan(state).await {
            Ok(_) => {
                info!(steps = state.execution_steps.len(), "Plan created");
                let summary = state.current_plan.clone().unwrap_or_default();
                state.add_message(
                    MessageRole::Assistant,
                    format!("I've created a plan to accomplish your goal: {summary}"),
                );
            }
            Err(err) => {
                warn!(%err, "Planning failed");
                state.add_error(err.to_string());
            }
        }
    }

    async fn call_tool(&self, state: &mut SessionState) {
        let selection = match self.planner().select_next_tool(state).await {
            Ok(Some(selection)) => selection,
            Ok(None) => {
                state.add_error("No tool selected");
                return;
            }
            Err(err) => {
                warn!(%err, "Tool selection failed");
                state.add_error(err.to_string());
                return;
            }
        };

        let (tool_name, inputs) = match selection {
            ToolSelection::PromptUser { prompt, .. } => {
                info!(prompt = %prompt, "Requesting user input");
                state.needs_user_input = true;
                state.add_message(MessageRole::Assistant, prompt);
                if let Some(step) = state.complete_next_step() {
                    debug!(step = %step, "Completed prompting step");
                }
                return;
            }
            ToolSelection::Unparsed { reason } => {
                state.add_error(reason);
                return;
            }
            ToolSelection::Invoke {
                tool_name: None, ..
            } => {
                state.add_error("No tool name provided in selection");
                return;
            }
            ToolSelection::Invoke {
                tool_name: Some(name),
                inputs,
                ..
            } => (name, inputs),
        };

        debug!(tool = %tool_name, inputs = %inputs, "Calling tool");
        let record = match self
            .tools()
            .execute(&state.available_tools, &tool_name, inputs)
            .await
        {
            Ok(record) => record,
            Err(err) => {
                state.add_error(format!("Tool caller error: {err}"));
                return;
            }
        };

        if let Some(output) = record.output() {
            state
                .current_tool_outputs
                .insert(record.name.clone(), output.clone());
        } else if let Some(error) = record.error() {
            state.add_error(format!("Tool {} failed: {error}", record.name));
        }
        state.tool_calls.push(record);
    }

    fn record_progress(&self, state: &mut SessionState) {
        if !state.current_tool_outputs.is_empty() && !state.steps_exhausted() {
            if let Some(step) = state.complete_next_step() {
                debug!(step = %step, "Completed step");
            }
            state.intermediate_results.push(IntermediateResult {
                timestamp: Utc::now(),
                step: state.completed_steps.len(),
                results: state.current_tool_outputs.clone(),
            });
        }
        state.increment_iteration();
        debug!(iteration = state.iteration_count, "Iteration completed");
    }

    async fn evaluate(&self, state: &mut SessionState) {
        let max_iterations = self.max_iterations();
        if state.iteration_count >= max_iterations {
            warn!(max_iterations, "Iteration ceiling reached");
            state.add_error(format!("Maximum iterations ({max_iterations}) reached"));
            state.is_complete = true;
            return;
        }

        // `finish` surfaces the pending prompt verbatim.
        if state.needs_user_input {
            return;
        }

        if !state.execution_steps.is_empty() && state.steps_exhausted() {
            info!("All execution steps completed");
            self.complete_with_final_response(state).await;
            return;
        }

        if let Some(guidance) = self.validation_guidance(state) {
            info!("Completing with input guidance");
            state.mark_complete(guidance);
            return;
        }

        let evaluation = match self.planner().evaluate_progress(state).await {
            Ok(evaluation) => evaluation,
            Err(err) => {
                warn!(%err, "Evaluation failed, continuing under the ceilings");
                let message = err.to_string();
                state.add_error(message.clone());
                Evaluation {
                    evaluation: "Unable to evaluate progress".to_string(),
                    next_action: NextAction::Error,
                    reasoning: "LLM evaluation failed".to_string(),
                    response: Some(message),
                }
            }
        };
        debug!(next_action = ?evaluation.next_action, "Evaluation result");
        if !evaluation.evaluation.is_empty() {
            state.add_message(
                MessageRole::Assistant,
                format!("Progress update: {}", evaluation.evaluation),
            );
        }

        if evaluation.next_action == NextAction::Continue
            && state.steps_exhausted()
            && state.tool_calls.is_empty()
        {
            info!("Nothing left to execute, completing run");
            self.complete_with_final_response(state).await;
        }
    }

    fn validation_guidance(&self, state: &SessionState) -> Option<String> {
        let candidates: [Option<FailedCall>; 2] = [
            guidance::recent_validation_failure(state),
            guidance::last_rejected_call(state),
        ];
        candidates
            .into_iter()
            .flatten()
            .find_map(|failed| self.planner().enhanced_error_guidance(state, &failed))
    }

    async fn complete_with_final_response(&self, state: &mut SessionState) {
        if state.has_final_response() {
            state.is_complete = true;
            return;
        }
        let response = self.planner().generate_final_response(state).await;
        state.mark_complete(response);
    }

    async fn finish(&self, state: &mut SessionState) {
        if state.needs_user_input {
            let prompt = state
                .messages
                .last()
                .filter(|message| message.role == MessageRole::Assistant)
                .map(|message| message.content.clone())
                .unwrap_or_else(|| AWAITING_INPUT_FALLBACK.to_string());
            state.mark_complete(prompt);
            info!("Session completed with user input request");
            return;
        }

        self.complete_with_final_response(state).await;
        let response = state.final_response.clone().unwrap_or_default();
        state.add_message(MessageRole::Assistant, response);
        info!(
            session_id = state.session_id.as_deref(),
            iterations = state.iteration_count,
            "Session completed"
        );
    }
}

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::guidance::{self, FailedCall};
use super::models::{Evaluation, NextAction, PlanResponse, ToolSelection};
use super::prompts;
use crate::domain::{ChatMessage, LlmProvider, SessionState};
use crate::infrastructure::model::{GenerateOptions, LlmRouter, ModelError};

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Failed to create plan: {source}")]
    Plan {
        #[source]
        source: ModelError,
    },
    #[error("Failed to select next tool: {source}")]
    Selection {
        #[source]
        source: ModelError,
    },
    #[error("Failed to evaluate progress: {source}")]
    Evaluation {
        #[source]
        source: ModelError,
    },
}

/// Turns session state into model prompts and model text back into
/// structured decisions. Holds no per-run state.
pub struct Planner {
    router: Arc<LlmRouter>,
    options: GenerateOptions,
}

impl Planner {
    pub fn new(router: Arc<LlmRouter>) -> Self {
        Self {
            router,
            options: GenerateOptions::default(),
        }
    }

    pub fn router(&self) -> &LlmRouter {
        &self.router
    }

    async fn ask(
        &self,
        preferred: LlmProvider,
        messages: &[ChatMessage],
    ) -> Result<(String, LlmProvider), ModelError> {
        self.router
            .generate_with_fallback(messages, Some(preferred), &self.options)
            .await
    }

    /// Asks the model for a plan and stores it in the session. Output that
    /// cannot be read as a plan leaves the session with an empty plan.
    pub async fn create_initial_plan(
        &self,
        state: &mut SessionState,
    ) -> Result<PlanResponse, PlannerError> {
        let messages = prompts::plan_messages(state);
        let (text, provider) = self
            .ask(state.selected_provider, &messages)
            .await
            .map_err(|source| PlannerError::Plan { source })?;

        if provider != state.selected_provider {
            info!(
                requested = state.selected_provider.as_str(),
                used = provider.as_str(),
                "Planning answered by fallback provider"
            );
        }
        state.selected_provider = provider;

        let plan = PlanResponse::from_model_output(&text);
        if plan.degraded {
            warn!(reason = %plan.reasoning, "Model output was not a structured plan");
        }

        state.current_plan = Some(plan.analysis.clone());
        state.execution_steps = plan
            .plan
            .iter()
            .enumerate()
            .map(|(position, step)| step.render(position))
            .collect();
        state.original_plan_steps = plan.plan.clone();
        debug!(steps = state.execution_steps.len(), "Stored execution plan");
        Ok(plan)
    }

    /// Decides how to carry out the next uncompleted step. Prompt steps are
    /// answered from the stored plan without a model round-trip.
    pub async fn select_next_tool(
        &self,
        state: &SessionState,
    ) -> Result<Option<ToolSelection>, PlannerError> {
        if state.is_complete {
            return Ok(None);
        }
        let Some(index) = state.next_step_index() else {
            return Ok(None);
        };

        if let Some(step) = state.original_plan_steps.get(index).filter(|s| s.is_prompt()) {
            return Ok(Some(ToolSelection::PromptUser {
                prompt: step
                    .prompt
                    .clone()
                    .unwrap_or_else(|| "Please provide the required information.".to_string()),
                description: if step.description.is_empty() {
                    "Requesting user input".to_string()
                } else {
                    step.description.clone()
                },
            }));
        }

        let messages = prompts::selection_messages(state, &state.execution_steps[index]);
        let (text, _) = self
            .ask(state.selected_provider, &messages)
            .await
            .map_err(|source| PlannerError::Selection { source })?;
        Ok(Some(ToolSelection::from_model_output(&text)))
    }

    /// Asks the model how the run is going and applies its verdict to the
    /// session.
    pub async fn evaluate_progress(
        &self,
        state: &mut SessionState,
    ) -> Result<Evaluation, PlannerError> {
        let messages = prompts::evaluation_messages(state);
        let (text, _) = self
            .ask(state.selected_provider, &messages)
            .await
            .map_err(|source| PlannerError::Evaluation { source })?;

        let evaluation = Evaluation::from_model_output(&text);
        match evaluation.next_action {
            NextAction::Complete => {
                let response = evaluation
                    .response
                    .clone()
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| "Task completed successfully.".to_string());
                state.mark_complete(response);
            }
            NextAction::UserInput => state.needs_user_input = true,
            NextAction::Error => {
                let message = evaluation
                    .response
                    .clone()
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| "An error occurred during execution.".to_string());
                state.add_error(message);
            }
            NextAction::Continue => {}
        }
        Ok(evaluation)
    }

    /// Final answer for the session. An answer already on the session is
    /// returned unchanged; a model failure is folded into the text.
    pub async fn generate_final_response(&self, state: &SessionState) -> String {
        if let Some(existing) = state.final_response.as_deref().filter(|t| !t.trim().is_empty()) {
            return existing.to_string();
        }

        let messages = prompts::final_response_messages(state);
        match self.ask(state.selected_provider, &messages).await {
            Ok((text, _)) => text.trim().to_string(),
            Err(err) => {
                warn!(%err, "Final response generation failed");
                format!(
                    "Task execution completed with some issues. Error generating final response: {err}"
                )
            }
        }
    }

    /// Corrective guidance for a rejected call, without a model round-trip.
    pub fn enhanced_error_guidance(
        &self,
        state: &SessionState,
        failed: &FailedCall,
    ) -> Option<String> {
        guidance::enhanced_error_guidance(&state.available_tools, failed)
    }
}

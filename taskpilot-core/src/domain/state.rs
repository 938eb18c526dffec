//! Per-run session state.
//!
//! A `SessionState` is owned by exactly one run of the agent state machine.
//! Every node receives it by mutable reference; nothing here is shared across
//! runs.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::provider::LlmProvider;
use super::tool::ToolDescriptor;
use super::types::MessageRole;

/// Text used when a run is completed without any usable answer.
const EMPTY_FINAL_RESPONSE: &str = "Task completed with errors: no response was produced.";

const CONTEXT_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of one tool call. Output and error are mutually exclusive;
/// `Pending` means the call has not resolved yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ToolCallOutcome {
    Pending,
    Output(Value),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub endpoint: Option<String>,
    pub input: Value,
    pub outcome: ToolCallOutcome,
    pub timestamp: DateTime<Utc>,
}

impl ToolCallRecord {
    pub fn pending(name: impl Into<String>, endpoint: Option<String>, input: Value) -> Self {
        Self {
            name: name.into(),
            endpoint,
            input,
            outcome: ToolCallOutcome::Pending,
            timestamp: Utc::now(),
        }
    }

    /// Settles a pending record. Returns `false` and leaves the record
    /// untouched when it has already resolved.
    pub fn resolve(&mut self, outcome: Result<Value, String>) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.outcome = match outcome {
            Ok(value) => ToolCallOutcome::Output(value),
            Err(message) => ToolCallOutcome::Error(message),
        };
        true
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.outcome, ToolCallOutcome::Pending)
    }

    pub fn output(&self) -> Option<&Value> {
        match &self.outcome {
            ToolCallOutcome::Output(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ToolCallOutcome::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.outcome {
            ToolCallOutcome::Pending => "Pending",
            ToolCallOutcome::Output(_) => "Success",
            ToolCallOutcome::Error(_) => "Error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    #[default]
    ToolCall,
    PromptUser,
    #[serde(other)]
    Other,
}

/// One entry of the structured plan returned by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(default, deserialize_with = "lenient_step_number")]
    pub step: Option<u32>,
    #[serde(default)]
    pub action: StepAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
}

impl PlanStep {
    pub fn is_prompt(&self) -> bool {
        self.action == StepAction::PromptUser
    }

    /// Human readable rendering stored in `execution_steps`. Prompt steps
    /// carry their question so the log shows what was asked.
    pub fn render(&self, position: usize) -> String {
        let number = self.step.map(|n| n as usize).unwrap_or(position + 1);
        if self.is_prompt() {
            let prompt = self.prompt.as_deref().unwrap_or("Ask user for input");
            format!("Step {number}: {} (Prompt: {prompt})", self.description)
        } else {
            format!("Step {number}: {}", self.description)
        }
    }
}

fn lenient_step_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(number)) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntermediateResult {
    pub timestamp: DateTime<Utc>,
    pub step: usize,
    pub results: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub user_goal: String,
    pub user_message: String,
    pub selected_provider: LlmProvider,
    pub messages: Vec<AgentMessage>,
    pub available_tools: Vec<ToolDescriptor>,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Outputs keyed by tool name. Accumulates across iterations.
    pub current_tool_outputs: BTreeMap<String, Value>,
    pub current_plan: Option<String>,
    pub execution_steps: Vec<String>,
    pub completed_steps: Vec<String>,
    pub original_plan_steps: Vec<PlanStep>,
    pub iteration_count: u32,
    pub is_complete: bool,
    pub needs_user_input: bool,
    pub intermediate_results: Vec<IntermediateResult>,
    pub final_response: Option<String>,
    pub errors: Vec<String>,
    pub session_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new(
        goal: impl Into<String>,
        message: impl Into<String>,
        provider: LlmProvider,
    ) -> Self {
        Self {
            user_goal: goal.into(),
            user_message: message.into(),
            selected_provider: provider,
            messages: Vec::new(),
            available_tools: Vec::new(),
            tool_calls: Vec::new(),
            current_tool_outputs: BTreeMap::new(),
            current_plan: None,
            execution_steps: Vec::new(),
            completed_steps: Vec::new(),
            original_plan_steps: Vec::new(),
            iteration_count: 0,
            is_complete: false,
            needs_user_input: false,
            intermediate_results: Vec::new(),
            final_response: None,
            errors: Vec::new(),
            session_id: None,
            start_time: None,
        }
    }

    pub fn add_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(AgentMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn increment_iteration(&mut self) {
        self.iteration_count = self.iteration_count.saturating_add(1);
    }

    /// Marks the run complete. A blank response is replaced with a fixed
    /// floor so a completed run never carries an empty answer.
    pub fn mark_complete(&mut self, final_response: impl Into<String>) {
        let response = final_response.into();
        let response = if response.trim().is_empty() {
            EMPTY_FINAL_RESPONSE.to_string()
        } else {
            response
        };
        self.is_complete = true;
        self.final_response = Some(response);
    }

    pub fn has_final_response(&self) -> bool {
        self.final_response
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }

    /// Index of the next step to work on, if any remains.
    pub fn next_step_index(&self) -> Option<usize> {
        let index = self.completed_steps.len();
        (index < self.execution_steps.len()).then_some(index)
    }

    pub fn steps_exhausted(&self) -> bool {
        self.completed_steps.len() >= self.execution_steps.len()
    }

    /// Marks the next uncompleted step as done and returns its description.
    pub fn complete_next_step(&mut self) -> Option<String> {
        let index = self.next_step_index()?;
        let step = self.execution_steps[index].clone();
        self.completed_steps.push(step.clone());
        Some(step)
    }

    pub fn last_assistant_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == MessageRole::Assistant)
            .map(|message| message.content.as_str())
    }

    pub fn conversation_context(&self) -> String {
        let start = self.messages.len().saturating_sub(CONTEXT_WINDOW);
        self.messages[start..]
            .iter()
            .map(|message| format!("{}: {}", message.role, message.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_call_summary(&self) -> String {
        if self.tool_calls.is_empty() {
            return "No tools have been called yet.".to_string();
        }
        self.tool_calls
            .iter()
            .map(|call| format!("- {}: {}", call.name, call.status_label()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn recent_errors(&self, count: usize) -> &[String] {
        let start = self.errors.len().saturating_sub(count);
        &self.errors[start..]
    }

    /// Distinct tool names in first-call order.
    pub fn tools_used(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for call in &self.tool_calls {
            if !names.contains(&call.name.as_str()) {
                names.push(call.name.as_str());
            }
        }
        names
    }
}

impl fmt::Display for ToolCallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolCallOutcome::Pending => write!(f, "pending"),
            ToolCallOutcome::Output(value) => write!(f, "{value}"),
            ToolCallOutcome::Error(message) => write!(f, "error: {message}"),
        }
    }
}

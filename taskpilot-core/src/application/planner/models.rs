//! Structured results of the planner operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parse::{DegradeReason, Parsed, parse_or_degrade, preview};
use crate::constants::PLAN_PREVIEW_CHARS;
use crate::domain::PlanStep;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub plan: Vec<PlanStep>,
    #[serde(default)]
    pub reasoning: String,
    /// Set when the model output could not be read as a plan.
    #[serde(skip)]
    pub degraded: bool,
}

impl PlanResponse {
    pub fn from_model_output(text: &str) -> Self {
        match parse_or_degrade::<PlanResponse>(text) {
            Parsed::Structured(plan) => plan,
            Parsed::Degraded { raw, reason } => Self {
                analysis: preview(&raw, PLAN_PREVIEW_CHARS),
                plan: Vec::new(),
                reasoning: match reason {
                    DegradeReason::NoObject => "Unable to parse structured plan from response",
                    DegradeReason::InvalidJson => "Invalid JSON in plan response",
                }
                .to_string(),
                degraded: true,
            },
        }
    }
}

/// What the tool caller should do for the next step.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolSelection {
    /// The step asks the user for information instead of calling a tool.
    PromptUser { prompt: String, description: String },
    Invoke {
        tool_name: Option<String>,
        inputs: Value,
        reasoning: Option<String>,
    },
    /// The model answer named no usable tool.
    Unparsed { reason: String },
}

#[derive(Debug, Deserialize)]
struct RawSelection {
    tool_name: Option<String>,
    #[serde(default)]
    inputs: Option<Value>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ToolSelection {
    pub fn from_model_output(text: &str) -> Self {
        match parse_or_degrade::<RawSelection>(text) {
            Parsed::Structured(RawSelection {
                error: Some(reason),
                ..
            }) => ToolSelection::Unparsed { reason },
            Parsed::Structured(raw) => ToolSelection::Invoke {
                tool_name: raw.tool_name.filter(|name| !name.trim().is_empty()),
                inputs: raw
                    .inputs
                    .filter(|inputs| !inputs.is_null())
                    .unwrap_or_else(|| Value::Object(Default::default())),
                reasoning: raw.reasoning,
            },
            Parsed::Degraded { reason, .. } => ToolSelection::Unparsed {
                reason: match reason {
                    DegradeReason::NoObject => "Unable to parse tool selection",
                    DegradeReason::InvalidJson => "Invalid JSON in tool selection response",
                }
                .to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Complete,
    UserInput,
    Error,
    #[default]
    #[serde(other)]
    Continue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default)]
    pub evaluation: String,
    #[serde(default)]
    pub next_action: NextAction,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub response: Option<String>,
}

impl Evaluation {
    /// Unreadable evaluations default to `continue` so the loop keeps going
    /// under its ceilings.
    pub fn from_model_output(text: &str) -> Self {
        match parse_or_degrade::<Evaluation>(text) {
            Parsed::Structured(evaluation) => evaluation,
            Parsed::Degraded { raw, reason } => Self {
                evaluation: preview(&raw, PLAN_PREVIEW_CHARS),
                next_action: NextAction::Continue,
                reasoning: match reason {
                    DegradeReason::NoObject => "Unable to parse structured evaluation",
                    DegradeReason::InvalidJson => "Invalid JSON in evaluation response",
                }
                .to_string(),
                response: Some(raw),
            },
        }
    }
}

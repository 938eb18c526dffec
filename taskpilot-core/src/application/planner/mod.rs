//! Planner and evaluator: prompts the model and reads its answers back as
//! plans, tool selections, evaluations and final responses.

pub mod guidance;
mod models;
mod parse;
mod prompts;
mod service;

pub use guidance::FailedCall;
pub use models::{Evaluation, NextAction, PlanResponse, ToolSelection};
pub use parse::{DegradeReason, Parsed, parse_or_degrade};
pub use service::{Planner, PlannerError};

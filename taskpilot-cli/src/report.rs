//! Plain-text rendering of run results, streaming updates and the
//! configuration report.

use std::fmt::Write;

use taskpilot_core::config::AppConfig;
use taskpilot_core::domain::{LlmProvider, SessionState, ToolCallRecord};
use taskpilot_core::{AgentNode, AgentUpdate};

const RULE: &str = "==================================================";
const STREAM_PREVIEW_CHARS: usize = 100;

pub fn render_summary(state: &SessionState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{RULE}\nEXECUTION SUMMARY\n{RULE}");
    let _ = writeln!(out, "Completed:  {}", state.is_complete);
    let _ = writeln!(out, "Iterations: {}", state.iteration_count);
    let used = state.tools_used();
    if used.is_empty() {
        let _ = writeln!(out, "Tools used: 0");
    } else {
        let _ = writeln!(out, "Tools used: {} ({})", state.tool_calls.len(), used.join(", "));
    }
    let _ = writeln!(out, "Errors:     {}", state.errors.len());

    if !state.execution_steps.is_empty() {
        let _ = writeln!(
            out,
            "\nExecution steps ({}/{} completed):",
            state.completed_steps.len(),
            state.execution_steps.len()
        );
        for (index, step) in state.execution_steps.iter().enumerate() {
            let mark = if index < state.completed_steps.len() { "x" } else { " " };
            let _ = writeln!(out, "  [{mark}] {step}");
        }
    }

    if !state.tool_calls.is_empty() {
        let _ = writeln!(out, "\nTool calls:");
        for call in &state.tool_calls {
            let _ = writeln!(out, "  [{}] {}", call_mark(call), call.name);
            if let Some(error) = call.error() {
                let _ = writeln!(out, "      error: {error}");
            }
        }
    }

    if !state.errors.is_empty() {
        let _ = writeln!(out, "\nErrors:");
        for error in &state.errors {
            let _ = writeln!(out, "  - {error}");
        }
    }

    let _ = writeln!(out, "\nFinal response:\n------------------------------");
    let _ = write!(
        out,
        "{}",
        state
            .final_response
            .as_deref()
            .unwrap_or("No final response generated.")
    );
    out
}

fn call_mark(call: &ToolCallRecord) -> &'static str {
    if call.output().is_some() {
        "ok"
    } else if call.error().is_some() {
        "failed"
    } else {
        "pending"
    }
}

/// One progress line per node, or nothing when the node changed nothing
/// worth showing.
pub fn render_update(update: &AgentUpdate) -> Option<String> {
    let state = &update.state;
    match update.node {
        AgentNode::Initialize => Some(format!(
            "[initialize] session {} with {} tools",
            state.session_id.as_deref().unwrap_or("-"),
            state.available_tools.len()
        )),
        AgentNode::Planner => state
            .current_plan
            .as_ref()
            .map(|plan| format!("[planner] {plan} ({} steps)", state.execution_steps.len())),
        AgentNode::ToolCaller => state.tool_calls.last().map(|call| {
            let detail = call
                .output()
                .map(|value| preview(&value.to_string()))
                .or_else(|| call.error().map(|error| format!("error: {error}")))
                .unwrap_or_else(|| "pending".to_string());
            format!("[tool] {}: {detail}", call.name)
        }),
        AgentNode::Executor => Some(format!(
            "[executor] iteration {} ({}/{} steps)",
            state.iteration_count,
            state.completed_steps.len(),
            state.execution_steps.len()
        )),
        AgentNode::Evaluator => state
            .last_assistant_message()
            .filter(|message| message.starts_with("Progress update:"))
            .map(|message| format!("[evaluator] {message}")),
        AgentNode::Finish => Some(format!(
            "\nTask completed.\nFinal response: {}",
            state.final_response.as_deref().unwrap_or("")
        )),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= STREAM_PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(STREAM_PREVIEW_CHARS).collect();
    format!("{cut}...")
}

pub fn render_config(config: &AppConfig) -> String {
    let mut out = String::from("Checking configuration...\n\nAPI keys:\n");
    for provider in &config.providers {
        let _ = writeln!(
            out,
            "  {:<10} {:<11} ({})",
            provider.provider.as_str(),
            provider.credential_status(),
            provider.model
        );
    }
    let available = config.available_providers();
    let _ = writeln!(out, "\nAvailable providers: {}", provider_list(&available));
    let _ = writeln!(out, "Default provider:    {}", config.default_provider);
    let _ = writeln!(
        out,
        "Tool server ({}):   {}",
        config.tool_server.mode,
        config.tool_server.describe()
    );
    let _ = write!(
        out,
        "Max iterations:      {}",
        config.agent.max_iterations
    );
    out
}

pub fn provider_list(providers: &[LlmProvider]) -> String {
    if providers.is_empty() {
        return "none".to_string();
    }
    providers
        .iter()
        .map(|provider| provider.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

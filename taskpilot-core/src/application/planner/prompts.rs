//! Prompt text sent to the model by each planner operation.

use serde_json::Value;

use super::parse::preview;
use crate::application::tooling::catalogue;
use crate::constants::TOOL_OUTPUT_PREVIEW_CHARS;
use crate::domain::{ChatMessage, SessionState};

pub const PLANNER_SYSTEM_PROMPT: &str = r#"You are the planner of an autonomous agent. Analyse the user's goal and build an execution plan from the tools you are given.

You can:
- break a request down into concrete, ordered steps
- choose suitable tools from the toolkit
- evaluate results and decide what happens next
- give the user clear, helpful answers

Constraints:
- Use ONLY tools listed under AVAILABLE TOOLS.
- Never assume calculation tools such as "python", "length", "count" or "math" exist.
- For counting, totals or analysis, first retrieve the data with an available tool and then work the numbers out in the final response instead of planning a separate tool call.

When a tool needs parameters the user has not given:
- add a step with action "prompt_user" that asks for exactly the missing information
- follow it with the tool call that uses the answer

To create a plan, reply with a JSON object:
{
    "analysis": "Short analysis of the request",
    "plan": [
        {
            "step": 1,
            "action": "prompt_user" | "tool_call",
            "tool_name": "tool name (tool_call steps only)",
            "description": "What this step achieves",
            "inputs": {"key": "value"},
            "prompt": "Question for the user (prompt_user steps only)",
            "expected_output": "What the step should produce"
        }
    ],
    "reasoning": "Why this approach"
}

To evaluate progress, reply with a JSON object:
{
    "evaluation": "Assessment of the progress so far",
    "next_action": "continue" | "complete" | "error" | "user_input",
    "reasoning": "Why",
    "response": "Message for the user when completing or asking for input"
}
"#;

pub const FINAL_RESPONSE_SYSTEM_PROMPT: &str = r#"You are an autonomous agent writing the final answer for the user. Summarise what was done, point out the key results and answer the request clearly.

If the user asked for a count, a total or any other analysis of data:
- work it out directly from the tool results below
- give the exact number or result
- do not mention missing tools, process the data you have

For example, asked "How many books are there in total?" with a list of books retrieved, count the books and state the number."#;

fn or_none(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join("\n")
    }
}

fn outputs_json(state: &SessionState) -> String {
    serde_json::to_string_pretty(&state.current_tool_outputs).unwrap_or_else(|_| "{}".to_string())
}

pub fn plan_messages(state: &SessionState) -> Vec<ChatMessage> {
    let body = format!(
        "USER GOAL: {goal}\nUSER MESSAGE: {message}\n\nAVAILABLE TOOLS:\n{tools}\n\nCONVERSATION CONTEXT:\n{context}\n\nCreate a detailed execution plan that accomplishes the user's goal.",
        goal = state.user_goal,
        message = state.user_message,
        tools = catalogue::render_catalogue(&state.available_tools),
        context = state.conversation_context(),
    );
    vec![
        ChatMessage::system(PLANNER_SYSTEM_PROMPT),
        ChatMessage::user(body),
    ]
}

pub fn selection_messages(state: &SessionState, step: &str) -> Vec<ChatMessage> {
    let body = format!(
        "CURRENT STEP: {step}\nAVAILABLE TOOLS:\n{tools}\n\nCONTEXT:\n- Goal: {goal}\n- Previous outputs: {outputs}\n\nName exactly one tool and the inputs that carry out this step.\nReply with JSON: {{\"tool_name\": \"name\", \"inputs\": {{\"key\": \"value\"}}, \"reasoning\": \"why\"}}",
        tools = catalogue::render_catalogue(&state.available_tools),
        goal = state.user_goal,
        outputs = outputs_json(state),
    );
    vec![
        ChatMessage::system(PLANNER_SYSTEM_PROMPT),
        ChatMessage::user(body),
    ]
}

pub fn evaluation_messages(state: &SessionState) -> Vec<ChatMessage> {
    let completed: Vec<String> = state
        .completed_steps
        .iter()
        .map(|step| format!("✓ {step}"))
        .collect();
    let outputs = if state.current_tool_outputs.is_empty() {
        "No recent outputs".to_string()
    } else {
        outputs_json(state)
    };
    let body = format!(
        "ORIGINAL GOAL: {goal}\nCURRENT PLAN: {plan}\n\nEXECUTION PROGRESS:\nCompleted Steps: {done}/{total}\n{completed}\n\nTOOL EXECUTION SUMMARY:\n{summary}\n\nRECENT TOOL OUTPUTS:\n{outputs}\n\nERRORS (if any):\n{errors}\n\nEvaluate the progress so far and decide what to do next.",
        goal = state.user_goal,
        plan = state.current_plan.as_deref().unwrap_or(""),
        done = state.completed_steps.len(),
        total = state.execution_steps.len(),
        completed = completed.join("\n"),
        summary = state.tool_call_summary(),
        errors = or_none(&state.errors, "No errors"),
    );
    vec![
        ChatMessage::system(PLANNER_SYSTEM_PROMPT),
        ChatMessage::user(body),
    ]
}

pub fn final_response_messages(state: &SessionState) -> Vec<ChatMessage> {
    let body = format!(
        "USER'S ORIGINAL GOAL: {goal}\n\nEXECUTION SUMMARY:\n- Steps completed: {steps}\n- Tools used: {tools}\n- Errors encountered: {error_count}\n\nTOOL RESULTS:\n{results}\n\nERRORS (if any):\n{errors}\n\nWrite a complete final answer for the user describing what was accomplished.",
        goal = state.user_goal,
        steps = state.completed_steps.len(),
        tools = state.tool_calls.len(),
        error_count = state.errors.len(),
        results = tool_results(state),
        errors = or_none(&state.errors, "No errors"),
    );
    vec![
        ChatMessage::system(FINAL_RESPONSE_SYSTEM_PROMPT),
        ChatMessage::user(body),
    ]
}

/// Tool call history for the final answer. Data retrieval output is kept
/// whole so the model can count it; anything else is cut to a preview.
pub fn tool_results(state: &SessionState) -> String {
    if state.tool_calls.is_empty() {
        return "No tools were executed.".to_string();
    }
    state
        .tool_calls
        .iter()
        .map(|call| {
            let mut entry = format!("Tool: {}", call.name);
            if let Some(output) = call.output() {
                let text = render_output(output);
                let text = if catalogue::is_data_retrieval_tool(&call.name) {
                    text
                } else {
                    preview(&text, TOOL_OUTPUT_PREVIEW_CHARS)
                };
                entry.push_str(&format!("\nResult: {text}"));
            } else if let Some(error) = call.error() {
                entry.push_str(&format!("\nError: {error}"));
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_output(output: &Value) -> String {
    match output {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

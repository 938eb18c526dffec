// End-to-end runs of the agent against a fake model and library server.

mod support;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use support::{FakeModel, LibraryServer, client, router, seven_books};
use taskpilot_core::domain::LlmProvider;
use taskpilot_core::{AgentNode, AutonomousAgent, Planner, RunRequest};
use tokio_stream::StreamExt;

fn agent(model: Arc<FakeModel>, server: Arc<LibraryServer>, max_iterations: u32) -> AutonomousAgent {
    AutonomousAgent::new(
        Arc::new(Planner::new(router(vec![model]))),
        client(server, Duration::from_secs(300)),
        max_iterations,
    )
}

const COUNT_PLAN: &str = r#"Here is my plan:
```json
{"analysis": "List every book and count them", "plan": [
  {"step": 1, "action": "tool_call", "tool_name": "list_books", "description": "Retrieve all books", "inputs": {}}
], "reasoning": "There is no count tool"}
```"#;

#[tokio::test]
async fn counting_question_is_answered_from_retrieved_records() {
    let model = FakeModel::with_prompt(LlmProvider::Gemini, |kind, messages| match kind {
        "plan" => COUNT_PLAN.to_string(),
        "select" => r#"{"tool_name": "list_books", "inputs": {}, "reasoning": "fetch"}"#.to_string(),
        _ => {
            let context = &messages[1].content;
            let count = context.matches("\"title\"").count();
            format!("There are {count} books in the library.")
        }
    });
    let server = LibraryServer::new();
    server.answer("list_books", seven_books());

    let state = agent(model, server.clone(), 10)
        .run(RunRequest::new("How many books are in the library?"))
        .await;

    assert!(state.is_complete);
    assert_eq!(state.final_response.as_deref(), Some("There are 7 books in the library."));
    assert_eq!(state.current_plan.as_deref(), Some("List every book and count them"));
    assert_eq!(state.completed_steps, vec!["Step 1: Retrieve all books"]);
    assert!(state.errors.is_empty());
    assert_eq!(server.tool_calls().len(), 1);
}

#[tokio::test]
async fn missing_book_details_produce_field_guidance() {
    let model = FakeModel::by_kind(LlmProvider::Gemini, |kind| match kind {
        "plan" => r#"{"analysis": "Create the book", "plan": [
            {"step": 1, "action": "tool_call", "tool_name": "create_book", "description": "Create the book"}
        ]}"#
        .to_string(),
        "select" => r#"{"tool_name": "create_book", "inputs": {"title": "Emma"}}"#.to_string(),
        _ => "unreachable".to_string(),
    });
    let server = LibraryServer::new();

    let state = agent(model, server.clone(), 10)
        .run(RunRequest::new("Add the book Emma"))
        .await;

    assert!(state.is_complete);
    let answer = state.final_response.expect("guidance");
    assert!(answer.contains("**Author**"));
    assert!(answer.contains("**Title**"));
    assert!(server.tool_calls().is_empty());
    assert!(state.tool_calls.is_empty());
}

#[tokio::test]
async fn prompt_step_stops_for_user_input() {
    let model = FakeModel::by_kind(LlmProvider::Gemini, |kind| match kind {
        "plan" => r#"{"analysis": "Need the details", "plan": [
            {"step": 1, "action": "prompt_user", "description": "Ask for details", "prompt": "Which title and author should I add?"},
            {"step": 2, "action": "tool_call", "tool_name": "create_book", "description": "Create it"}
        ]}"#
        .to_string(),
        _ => "unexpected".to_string(),
    });

    let state = agent(model.clone(), LibraryServer::new(), 10)
        .run(RunRequest::new("Add a book"))
        .await;

    assert!(state.needs_user_input);
    assert!(state.is_complete);
    assert_eq!(
        state.final_response.as_deref(),
        Some("Which title and author should I add?")
    );
    assert!(state.tool_calls.is_empty());
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn run_terminates_within_the_iteration_ceiling() {
    let model = FakeModel::by_kind(LlmProvider::Gemini, |kind| match kind {
        "plan" => json!({"analysis": "list forever", "plan": (1..=20)
            .map(|n| json!({"step": n, "action": "tool_call", "tool_name": "list_books", "description": format!("Pass {n}")}))
            .collect::<Vec<_>>()})
        .to_string(),
        "select" => r#"{"tool_name": "list_books", "inputs": {}}"#.to_string(),
        "evaluate" => r#"{"evaluation": "more to do", "next_action": "continue"}"#.to_string(),
        _ => "Stopped early.".to_string(),
    });
    let server = LibraryServer::new();
    server.answer("list_books", seven_books());

    let state = agent(model, server, 3)
        .run(RunRequest::new("List the books twenty times"))
        .await;

    assert!(state.is_complete);
    assert_eq!(state.iteration_count, 3);
    assert!(state.completed_steps.len() <= state.execution_steps.len());
    assert!(state.errors.contains(&"Maximum iterations (3) reached".to_string()));
    assert_eq!(state.final_response.as_deref(), Some("Stopped early."));
}

#[tokio::test]
async fn total_model_failure_still_completes() {
    let state = agent(FakeModel::broken(LlmProvider::Gemini), LibraryServer::new(), 10)
        .run(RunRequest::new("How many books?"))
        .await;

    assert!(state.is_complete);
    assert!(state.final_response.is_some());
    assert!(state.errors[0].starts_with("Failed to create plan: All LLM providers failed."));
}

#[tokio::test]
async fn streaming_ends_with_the_finished_session() {
    let model = FakeModel::by_kind(LlmProvider::Gemini, |kind| match kind {
        "plan" => COUNT_PLAN.to_string(),
        "select" => r#"{"tool_name": "list_books", "inputs": {}}"#.to_string(),
        _ => "Seven.".to_string(),
    });
    let server = LibraryServer::new();
    server.answer("list_books", seven_books());

    let updates: Vec<_> = agent(model, server, 10)
        .run_streaming(RunRequest::new("How many books?"))
        .collect()
        .await;

    assert_eq!(updates.first().map(|u| u.node), Some(AgentNode::Initialize));
    let last = updates.last().expect("updates");
    assert_eq!(last.node, AgentNode::Finish);
    assert!(last.state.is_complete);
    assert_eq!(last.state.final_response.as_deref(), Some("Seven."));
}

#[tokio::test]
async fn sessions_share_one_discovery() {
    let model = FakeModel::by_kind(LlmProvider::Gemini, |kind| match kind {
        "plan" => r#"{"analysis": "nothing", "plan": []}"#.to_string(),
        "evaluate" => r#"{"evaluation": "", "next_action": "complete"}"#.to_string(),
        _ => "Nothing to do.".to_string(),
    });
    let server = LibraryServer::new();
    let agent = agent(model, server.clone(), 10);

    let first = agent.run(RunRequest::new("one")).await;
    let second = agent.run(RunRequest::new("two")).await;

    assert_ne!(first.session_id, second.session_id);
    assert_eq!(server.count("tools/list"), 1);
}

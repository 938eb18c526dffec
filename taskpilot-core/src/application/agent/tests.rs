use super::*;
use crate::application::planner::Planner;
use crate::application::test_support::{
    ScriptedLlm, StubToolServer, prompt_kind, scripted_router, tool_client,
};
use crate::domain::{ChatMessage, LlmProvider, MessageRole};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_stream::StreamExt;

fn library_tools() -> Value {
    json!([
        {"name": "list_books", "description": "List all books",
         "inputSchema": {"type": "object", "properties": {}}},
        {"name": "add_book", "description": "Add a book",
         "inputSchema": {"type": "object",
            "properties": {"title": {"type": "string"}, "author": {"type": "string"}},
            "required": ["title", "author"]}}
    ])
}

fn seven_books() -> Value {
    let titles = [
        "Dune", "Emma", "Ulysses", "Beloved", "Hamlet", "Middlemarch", "Persuasion",
    ];
    json!({"books": titles.iter().enumerate()
        .map(|(i, t)| json!({"id": i + 1, "title": t}))
        .collect::<Vec<_>>()})
}

fn agent(llm: Arc<ScriptedLlm>, server: Arc<StubToolServer>, max_iterations: u32) -> AutonomousAgent {
    AutonomousAgent::new(
        Arc::new(Planner::new(scripted_router(vec![llm]))),
        tool_client(server),
        max_iterations,
    )
}

const LIST_PLAN: &str = r#"{"analysis": "Retrieve every book, then count", "plan": [
    {"step": 1, "action": "tool_call", "tool_name": "list_books", "description": "Retrieve all books", "inputs": {}}
], "reasoning": "no count tool"}"#;

#[tokio::test]
async fn counts_retrieved_records_in_final_answer() {
    let llm = ScriptedLlm::new(
        LlmProvider::Gemini,
        [
            LIST_PLAN,
            r#"{"tool_name": "list_books", "inputs": {}, "reasoning": "fetch"}"#,
            "There are 7 books in the library.",
        ],
    );
    let server = StubToolServer::new(library_tools());
    server.answer("list_books", seven_books());
    let agent = agent(llm.clone(), server.clone(), 10);

    let state = agent.run(RunRequest::new("How many books are there?")).await;

    assert!(state.is_complete);
    assert_eq!(state.final_response.as_deref(), Some("There are 7 books in the library."));
    assert_eq!(state.iteration_count, 1);
    assert_eq!(state.completed_steps, vec!["Step 1: Retrieve all books"]);
    assert_eq!(state.tool_calls.len(), 1);
    assert_eq!(state.intermediate_results.len(), 1);
    assert!(state.errors.is_empty());
    assert!(state.session_id.is_some());
    assert_eq!(server.calls().len(), 1);

    let final_prompt = llm.prompts().pop().unwrap();
    assert_eq!(prompt_kind(&final_prompt), "final");
    assert!(final_prompt[1].content.contains("Persuasion"));

    let last = state.messages.last().unwrap();
    assert_eq!(last.role, MessageRole::Assistant);
    assert_eq!(last.content, "There are 7 books in the library.");
}

#[tokio::test]
async fn prompt_step_ends_run_awaiting_input() {
    let llm = ScriptedLlm::new(
        LlmProvider::Gemini,
        [r#"{"analysis": "Need details", "plan": [
            {"step": 1, "action": "prompt_user", "description": "Ask for the book", "prompt": "Which title and author?"},
            {"step": 2, "action": "tool_call", "tool_name": "create_book", "description": "Create it"}
        ], "reasoning": "missing input"}"#],
    );
    let agent = agent(llm.clone(), StubToolServer::new(library_tools()), 10);

    let state = agent.run(RunRequest::new("Add a book")).await;

    assert!(state.needs_user_input);
    assert!(state.is_complete);
    assert_eq!(state.final_response.as_deref(), Some("Which title and author?"));
    assert_eq!(state.last_assistant_message(), Some("Which title and author?"));
    assert_eq!(
        state.completed_steps,
        vec!["Step 1: Ask for the book (Prompt: Which title and author?)"]
    );
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn rejected_create_call_yields_field_guidance() {
    let llm = ScriptedLlm::new(
        LlmProvider::Gemini,
        [
            r#"{"analysis": "Create the book", "plan": [
                {"step": 1, "action": "tool_call", "tool_name": "create_book", "description": "Create the book"}
            ], "reasoning": ""}"#,
            r#"{"tool_name": "create_book", "inputs": {"title": "X"}}"#,
        ],
    );
    let server = StubToolServer::new(library_tools());
    let agent = agent(llm.clone(), server.clone(), 10);

    let state = agent.run(RunRequest::new("Add the book X")).await;

    assert!(state.is_complete);
    assert_eq!(
        state.errors,
        vec!["Tool caller error: Invalid input for tool create_book: Missing required field: author"]
    );
    let answer = state.final_response.unwrap();
    assert!(answer.starts_with("I was unable to add a book"));
    assert!(answer.contains("**Author**"));
    assert!(server.calls().is_empty());
    assert_eq!(state.iteration_count, 1);
    assert_eq!(llm.calls(), 2);
}

#[tokio::test]
async fn total_provider_failure_still_answers() {
    let agent = agent(
        ScriptedLlm::failing(LlmProvider::Gemini),
        StubToolServer::new(library_tools()),
        10,
    );

    let state = agent.run(RunRequest::new("How many books?")).await;

    assert!(state.is_complete);
    assert!(state.errors[0].starts_with("Failed to create plan: All LLM providers failed."));
    assert_eq!(state.errors[1], "No tool selected");
    assert!(state.errors[2].starts_with("Failed to evaluate progress: All LLM providers failed."));
    assert_eq!(state.errors.len(), 6);
    assert_eq!(state.iteration_count, 2);
    assert!(state
        .final_response
        .unwrap()
        .starts_with("Task execution completed with some issues."));
}

#[tokio::test]
async fn transient_evaluation_failure_keeps_the_run_going() {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let seen = evaluations.clone();
    let llm = ScriptedLlm::fallible(LlmProvider::Gemini, move |messages: &[ChatMessage]| {
        let reply = match prompt_kind(messages) {
            "plan" => json!({"analysis": "list three times", "plan": (1..=3)
                .map(|n| json!({"step": n, "action": "tool_call", "tool_name": "list_books", "description": format!("List pass {n}")}))
                .collect::<Vec<_>>()})
            .to_string(),
            "select" => r#"{"tool_name": "list_books", "inputs": {}}"#.to_string(),
            "evaluate" if seen.fetch_add(1, Ordering::SeqCst) == 0 => return None,
            "evaluate" => r#"{"evaluation": "on track", "next_action": "continue"}"#.to_string(),
            _ => "done".to_string(),
        };
        Some(reply)
    });
    let server = StubToolServer::new(library_tools());
    server.answer("list_books", seven_books());
    let agent = agent(llm, server.clone(), 10);

    let state = agent.run(RunRequest::new("List books three times")).await;

    assert!(state.is_complete);
    assert_eq!(state.errors.len(), 1);
    assert!(state.errors[0].starts_with("Failed to evaluate progress:"));
    assert_eq!(state.completed_steps.len(), 3);
    assert_eq!(state.execution_steps.len(), 3);
    assert_eq!(state.iteration_count, 3);
    assert_eq!(server.calls().len(), 3);
    assert_eq!(evaluations.load(Ordering::SeqCst), 2);
    assert_eq!(state.final_response.as_deref(), Some("done"));
}

#[tokio::test]
async fn iteration_ceiling_forces_finish() {
    let llm = ScriptedLlm::responding(LlmProvider::Gemini, |messages| {
        match prompt_kind(messages) {
            "plan" => json!({"analysis": "list repeatedly", "plan": (1..=5)
                .map(|n| json!({"step": n, "action": "tool_call", "tool_name": "list_books", "description": format!("List pass {n}")}))
                .collect::<Vec<_>>()})
            .to_string(),
            "select" => r#"{"tool_name": "list_books", "inputs": {}}"#.to_string(),
            "evaluate" => r#"{"evaluation": "keep going", "next_action": "continue"}"#.to_string(),
            _ => "done".to_string(),
        }
    });
    let server = StubToolServer::new(library_tools());
    server.answer("list_books", seven_books());
    let agent = agent(llm, server, 2);

    let state = agent.run(RunRequest::new("List books five times")).await;

    assert!(state.is_complete);
    assert_eq!(state.iteration_count, 2);
    assert_eq!(state.completed_steps.len(), 2);
    assert_eq!(state.errors, vec!["Maximum iterations (2) reached"]);
    assert_eq!(state.final_response.as_deref(), Some("done"));
    assert!(state.completed_steps.len() <= state.execution_steps.len());
}

#[tokio::test]
async fn prose_only_model_output_still_completes() {
    let llm = ScriptedLlm::responding(LlmProvider::Gemini, |_| "I am not sure.".to_string());
    let agent = agent(llm, StubToolServer::new(library_tools()), 10);

    let state = agent.run(RunRequest::new("Do something")).await;

    assert!(state.is_complete);
    assert!(state.execution_steps.is_empty());
    assert_eq!(state.errors, vec!["No tool selected"]);
    assert_eq!(state.iteration_count, 1);
    assert_eq!(state.final_response.as_deref(), Some("I am not sure."));
}

#[tokio::test]
async fn repeated_failures_hit_the_error_ceiling() {
    let llm = ScriptedLlm::responding(LlmProvider::Gemini, |messages| match prompt_kind(messages) {
        "plan" => r#"{"analysis": "a", "plan": [
            {"step": 1, "action": "tool_call", "tool_name": "delete_book", "description": "Delete"}
        ]}"#
        .to_string(),
        "select" => r#"{"tool_name": "shred_book", "inputs": {}}"#.to_string(),
        "evaluate" => r#"{"evaluation": "retry", "next_action": "continue"}"#.to_string(),
        _ => "Could not delete the book.".to_string(),
    });
    let agent = agent(llm, StubToolServer::new(library_tools()), 10);

    let state = agent.run(RunRequest::new("Delete book 3")).await;

    assert!(state.is_complete);
    assert_eq!(state.errors.len(), 4);
    assert!(state.errors[0].starts_with("Tool caller error: Tool 'shred_book' not found."));
    assert_eq!(state.iteration_count, 4);
    assert_eq!(state.final_response.as_deref(), Some("Could not delete the book."));
}

#[tokio::test]
async fn discovery_failure_is_recorded_not_fatal() {
    let llm = ScriptedLlm::responding(LlmProvider::Gemini, |messages| {
        match prompt_kind(messages) {
            "plan" => r#"{"analysis": "Nothing to do", "plan": []}"#.to_string(),
            "evaluate" => r#"{"evaluation": "", "next_action": "continue"}"#.to_string(),
            _ => "No tools were available, so nothing was done.".to_string(),
        }
    });
    let agent = agent(llm, StubToolServer::unreachable(), 10);

    let state = agent.run(RunRequest::new("Count books")).await;

    assert!(state.errors[0].starts_with("Failed to initialize tools:"));
    assert!(state.is_complete);
    assert_eq!(
        state.final_response.as_deref(),
        Some("No tools were available, so nothing was done.")
    );
}

#[tokio::test]
async fn streaming_yields_every_node_in_order() {
    let llm = ScriptedLlm::new(
        LlmProvider::Gemini,
        [
            LIST_PLAN,
            r#"{"tool_name": "list_books", "inputs": {}}"#,
            "Seven books.",
        ],
    );
    let server = StubToolServer::new(library_tools());
    server.answer("list_books", seven_books());
    let agent = agent(llm, server, 10);

    let updates: Vec<AgentUpdate> = agent
        .run_streaming(RunRequest::new("How many books?"))
        .collect()
        .await;
    let nodes: Vec<AgentNode> = updates.iter().map(|u| u.node).collect();

    assert_eq!(
        nodes,
        vec![
            AgentNode::Initialize,
            AgentNode::Planner,
            AgentNode::ToolCaller,
            AgentNode::Executor,
            AgentNode::Evaluator,
            AgentNode::Finish
        ]
    );
    let last = &updates.last().unwrap().state;
    assert!(last.is_complete);
    assert_eq!(last.final_response.as_deref(), Some("Seven books."));
}

#[tokio::test]
async fn explicit_provider_and_message_are_kept() {
    let llm = ScriptedLlm::responding(LlmProvider::OpenAI, |messages| match prompt_kind(messages) {
        "plan" => "{}".to_string(),
        _ => "ok".to_string(),
    });
    let agent = agent(llm, StubToolServer::new(library_tools()), 10);

    let state = agent
        .run(
            RunRequest::new("goal")
                .with_message("actual message")
                .with_provider(LlmProvider::OpenAI),
        )
        .await;

    assert_eq!(state.user_message, "actual message");
    assert_eq!(state.selected_provider, LlmProvider::OpenAI);
    assert_eq!(state.messages[0].content, "actual message");
}

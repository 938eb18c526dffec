// Shared doubles for the integration tests: a language model that answers
// by prompt kind and an in-process JSON-RPC tool server.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskpilot_core::domain::{ChatMessage, LlmProvider};
use taskpilot_core::model::{GenerateOptions, LlmClient, LlmRouter, ModelError};
use taskpilot_core::rpc::{RpcRequest, RpcResponse, RpcTransport};
use taskpilot_core::tooling::{ToolClient, ToolClientSettings, ToolInvokeError};

type Reply = Box<dyn Fn(&str, &[ChatMessage]) -> Result<String, ModelError> + Send + Sync>;

pub struct FakeModel {
    provider: LlmProvider,
    reply: Reply,
    calls: Mutex<u32>,
}

impl FakeModel {
    /// Answers by the kind of prompt: plan, select, evaluate or final.
    pub fn by_kind<F>(provider: LlmProvider, reply: F) -> Arc<Self>
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Arc::new(Self {
            provider,
            reply: Box::new(move |kind: &str, _: &[ChatMessage]| Ok(reply(kind))),
            calls: Mutex::new(0),
        })
    }

    /// Sees the whole prompt as well as its kind.
    pub fn with_prompt<F>(provider: LlmProvider, reply: F) -> Arc<Self>
    where
        F: Fn(&str, &[ChatMessage]) -> String + Send + Sync + 'static,
    {
        Arc::new(Self {
            provider,
            reply: Box::new(move |kind: &str, messages: &[ChatMessage]| Ok(reply(kind, messages))),
            calls: Mutex::new(0),
        })
    }

    pub fn broken(provider: LlmProvider) -> Arc<Self> {
        Arc::new(Self {
            provider,
            reply: Box::new(move |_: &str, _: &[ChatMessage]| {
                Err(ModelError::Api {
                    provider,
                    status: 500,
                    body: "internal error".into(),
                })
            }),
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LlmClient for FakeModel {
    fn provider(&self) -> LlmProvider {
        self.provider
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        _options: &GenerateOptions,
    ) -> Result<String, ModelError> {
        *self.calls.lock().unwrap() += 1;
        (self.reply)(prompt_kind(messages), messages)
    }
}

pub fn prompt_kind(messages: &[ChatMessage]) -> &'static str {
    let body = messages.last().map(|m| m.content.as_str()).unwrap_or("");
    if body.starts_with("USER GOAL:") {
        "plan"
    } else if body.starts_with("CURRENT STEP:") {
        "select"
    } else if body.starts_with("ORIGINAL GOAL:") {
        "evaluate"
    } else {
        "final"
    }
}

pub fn router(models: Vec<Arc<FakeModel>>) -> Arc<LlmRouter> {
    let default = models.first().map(|m| m.provider).unwrap_or_default();
    Arc::new(LlmRouter::new(
        models.into_iter().map(|m| m as Arc<dyn LlmClient>).collect(),
        default,
    ))
}

/// Book library server: answers `tools/list` with a fixed catalogue and
/// `tools/call` from a table of canned text results.
pub struct LibraryServer {
    tools: Value,
    answers: Mutex<Vec<(String, Value)>>,
    requests: Mutex<Vec<RpcRequest>>,
}

impl LibraryServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tools: json!([
                {"name": "list_books", "description": "List every book",
                 "inputSchema": {"type": "object", "properties": {}}},
                {"name": "add_book", "description": "Add a book",
                 "inputSchema": {"type": "object",
                    "properties": {"title": {"type": "string"}, "author": {"type": "string"}},
                    "required": ["title", "author"]}},
                {"name": "get_book_details", "description": "One book by id",
                 "inputSchema": {"type": "object",
                    "properties": {"book_id": {"type": "integer"}},
                    "required": ["book_id"]}}
            ]),
            answers: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn answer(&self, tool: &str, value: Value) {
        self.answers.lock().unwrap().push((tool.to_string(), value));
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    pub fn tool_calls(&self) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == "tools/call")
            .map(|r| r.params.clone())
            .collect()
    }
}

#[async_trait]
impl RpcTransport for LibraryServer {
    fn describe(&self) -> String {
        "library-server".to_string()
    }

    async fn send(&self, request: RpcRequest) -> Result<RpcResponse, ToolInvokeError> {
        self.requests.lock().unwrap().push(request.clone());
        let id = request.id;
        Ok(match request.method.as_str() {
            "initialize" => RpcResponse::success(id, json!({"serverInfo": {"name": "library"}})),
            "tools/list" => RpcResponse::success(id, json!({"tools": self.tools.clone()})),
            "tools/call" => {
                let name = request.params["name"].as_str().unwrap_or_default();
                let answer = self
                    .answers
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|(tool, _)| tool == name)
                    .map(|(_, value)| value.clone());
                match answer {
                    Some(value) => RpcResponse::success(
                        id,
                        json!({"content": [{"type": "text", "text": value.to_string()}]}),
                    ),
                    None => RpcResponse::error(id, -32602, format!("unknown tool {name}")),
                }
            }
            other => RpcResponse::error(id, -32601, format!("unknown method {other}")),
        })
    }
}

pub fn client(server: Arc<LibraryServer>, cache_ttl: Duration) -> Arc<ToolClient> {
    Arc::new(ToolClient::new(
        server,
        ToolClientSettings {
            timeout: Duration::from_secs(30),
            cache_ttl,
            base_url: "http://library.local".into(),
        },
    ))
}

pub fn seven_books() -> Value {
    let titles = [
        "Dune", "Emma", "Ulysses", "Beloved", "Hamlet", "Middlemarch", "Persuasion",
    ];
    json!({"books": titles.iter().enumerate()
        .map(|(i, t)| json!({"id": i + 1, "title": t}))
        .collect::<Vec<_>>()})
}

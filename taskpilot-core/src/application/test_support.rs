//! Scripted doubles shared by the application tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::application::tooling::{ToolClient, ToolClientSettings, ToolInvokeError};
use crate::domain::{ChatMessage, LlmProvider};
use crate::infrastructure::model::{GenerateOptions, LlmClient, LlmRouter, ModelError};
use crate::infrastructure::rpc::{RpcRequest, RpcResponse, RpcTransport};

type Responder = Box<dyn Fn(&[ChatMessage]) -> Option<String> + Send + Sync>;

/// Replies with queued responses in order, or computes them from the prompt.
/// A client created with [`ScriptedLlm::failing`] or one whose queue has run
/// dry fails every call; a [`ScriptedLlm::fallible`] responder fails the calls
/// it answers with `None`.
pub struct ScriptedLlm {
    provider: LlmProvider,
    replies: Mutex<VecDeque<String>>,
    responder: Option<Responder>,
    fail: bool,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    fn build(provider: LlmProvider, replies: VecDeque<String>, responder: Option<Responder>, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            provider,
            replies: Mutex::new(replies),
            responder,
            fail,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn new<I, S>(provider: LlmProvider, replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(provider, replies.into_iter().map(Into::into).collect(), None, false)
    }

    pub fn responding<F>(provider: LlmProvider, responder: F) -> Arc<Self>
    where
        F: Fn(&[ChatMessage]) -> String + Send + Sync + 'static,
    {
        Self::fallible(provider, move |messages: &[ChatMessage]| Some(responder(messages)))
    }

    pub fn fallible<F>(provider: LlmProvider, responder: F) -> Arc<Self>
    where
        F: Fn(&[ChatMessage]) -> Option<String> + Send + Sync + 'static,
    {
        Self::build(provider, VecDeque::new(), Some(Box::new(responder)), false)
    }

    pub fn failing(provider: LlmProvider) -> Arc<Self> {
        Self::build(provider, VecDeque::new(), None, true)
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
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
        self.seen.lock().unwrap().push(messages.to_vec());
        let unavailable = || ModelError::Api {
            provider: self.provider,
            status: 503,
            body: "unavailable".into(),
        };
        if self.fail {
            return Err(unavailable());
        }
        if let Some(responder) = &self.responder {
            return responder(messages).ok_or_else(unavailable);
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ModelError::invalid_response(self.provider, "script exhausted"))
    }
}

pub fn scripted_router(clients: Vec<Arc<ScriptedLlm>>) -> Arc<LlmRouter> {
    let default = clients
        .first()
        .map(|client| client.provider)
        .unwrap_or_default();
    Arc::new(LlmRouter::new(
        clients
            .into_iter()
            .map(|client| client as Arc<dyn LlmClient>)
            .collect(),
        default,
    ))
}

/// Classifies a planner prompt by the section headers it carries.
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

/// In-process tool server: a fixed `tools/list` answer and `tools/call`
/// results keyed by tool name.
pub struct StubToolServer {
    tools: Value,
    results: Mutex<Vec<(String, Value)>>,
    fail_discovery: bool,
    calls: Mutex<Vec<(String, Value)>>,
}

impl StubToolServer {
    pub fn new(tools: Value) -> Arc<Self> {
        Arc::new(Self {
            tools,
            results: Mutex::new(Vec::new()),
            fail_discovery: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            tools: json!([]),
            results: Mutex::new(Vec::new()),
            fail_discovery: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Text content returned for `tools/call` of `tool`.
    pub fn answer(&self, tool: &str, text: Value) {
        self.results.lock().unwrap().push((tool.to_string(), text));
    }

    /// `(name, arguments)` of every `tools/call` received.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RpcTransport for StubToolServer {
    fn describe(&self) -> String {
        "stub-server".to_string()
    }

    async fn send(&self, request: RpcRequest) -> Result<RpcResponse, ToolInvokeError> {
        if self.fail_discovery {
            return Err(ToolInvokeError::Transport {
                server: self.describe(),
                message: "connection refused".into(),
            });
        }
        let id = request.id;
        Ok(match request.method.as_str() {
            "initialize" => RpcResponse::success(id, json!({"serverInfo": {"name": "stub"}})),
            "tools/list" => RpcResponse::success(id, json!({"tools": self.tools.clone()})),
            "tools/call" => {
                let name = request.params["name"].as_str().unwrap_or_default().to_string();
                let arguments = request.params["arguments"].clone();
                self.calls.lock().unwrap().push((name.clone(), arguments));
                let result = self
                    .results
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|(tool, _)| *tool == name)
                    .map(|(_, value)| value.clone());
                match result {
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

pub fn tool_client(server: Arc<StubToolServer>) -> Arc<ToolClient> {
    Arc::new(ToolClient::new(
        server,
        ToolClientSettings {
            timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
            base_url: "http://stub.local".into(),
        },
    ))
}

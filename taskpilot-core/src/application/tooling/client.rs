//! Tool protocol client: discovery, validation and dispatch.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest_eventsource::{Event, EventSource};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::cache::{DiscoveryCache, ToolSnapshot};
use super::catalogue;
use super::error::{ToolError, ToolInvokeError};
use super::local::AuthorStore;
use super::validation::validate_input;
use crate::config::AppConfig;
use crate::domain::{ToolCallRecord, ToolDescriptor};
use crate::infrastructure::rpc::{RpcRequest, RpcTransport, transport_from_config};

pub type ToolEventStream = Pin<Box<dyn Stream<Item = Result<Value, ToolInvokeError>> + Send>>;

/// Settings the client needs beyond its transport.
#[derive(Debug, Clone)]
pub struct ToolClientSettings {
    pub timeout: Duration,
    pub cache_ttl: Duration,
    /// Base for relative streaming endpoints
    pub base_url: String,
}

impl ToolClientSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout: config.agent.tool_timeout,
            cache_ttl: config.agent.cache_ttl,
            base_url: config.tool_server.base_url.clone(),
        }
    }
}

/// One per process. Runs share the discovery cache; every other piece of
/// per-run state lives in the session.
pub struct ToolClient {
    transport: Arc<dyn RpcTransport>,
    cache: DiscoveryCache,
    timeout: Duration,
    base_url: String,
    request_id: AtomicU64,
    http: reqwest::Client,
    authors: AuthorStore,
}

impl ToolClient {
    pub fn new(transport: Arc<dyn RpcTransport>, settings: ToolClientSettings) -> Self {
        Self {
            transport,
            cache: DiscoveryCache::new(settings.cache_ttl),
            timeout: settings.timeout,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            request_id: AtomicU64::new(1),
            http: reqwest::Client::new(),
            authors: AuthorStore::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ToolInvokeError> {
        let transport = transport_from_config(&config.tool_server)?;
        Ok(Self::new(transport, ToolClientSettings::from_config(config)))
    }

    pub fn server(&self) -> String {
        self.transport.describe()
    }

    pub fn cache(&self) -> &DiscoveryCache {
        &self.cache
    }

    /// Current catalogue, served from cache while it is fresh.
    pub async fn discover_tools(
        &self,
        force_refresh: bool,
    ) -> Result<Arc<ToolSnapshot>, ToolInvokeError> {
        let (snapshot, refreshed) = self
            .cache
            .get_or_refresh(force_refresh, || self.fetch_catalogue())
            .await?;
        if refreshed {
            info!(
                server = %self.server(),
                tools = snapshot.tools.len(),
                "Discovered tools"
            );
        } else {
            debug!(tools = snapshot.tools.len(), "Using cached tool catalogue");
        }
        Ok(snapshot)
    }

    pub async fn refresh_tools(&self) -> Result<Arc<ToolSnapshot>, ToolInvokeError> {
        self.discover_tools(true).await
    }

    /// The handshake and the listing share one timeout.
    async fn fetch_catalogue(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError> {
        tokio::time::timeout(self.timeout, self.list_catalogue())
            .await
            .map_err(|_| self.timed_out())?
    }

    async fn list_catalogue(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError> {
        let init = self.exchange("initialize", json!({})).await?;
        debug!(server_info = %init, "Tool server initialised");

        let listing = self.exchange("tools/list", json!({})).await?;
        let mut tools: Vec<ToolDescriptor> = listing
            .get("tools")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(ToolDescriptor::from_listing).collect())
            .unwrap_or_default();
        let reported = tools.len();
        catalogue::augment(&mut tools);
        debug!(
            reported,
            supplemented = tools.len() - reported,
            "Augmented tool catalogue"
        );
        Ok(tools)
    }

    /// Case-insensitive lookup in a snapshot.
    pub fn find_tool<'a>(tools: &'a [ToolDescriptor], name: &str) -> Option<&'a ToolDescriptor> {
        tools.iter().find(|tool| tool.name.eq_ignore_ascii_case(name))
    }

    /// Dispatches one call without validation. Local author tools never
    /// reach the server; aliases and parameter renames are applied first.
    pub async fn call_tool(
        &self,
        tool: &ToolDescriptor,
        input: &Value,
    ) -> Result<Value, ToolInvokeError> {
        if catalogue::is_local_tool(&tool.name) {
            return Ok(self.authors.handle(&tool.name, input));
        }

        let method_name = catalogue::resolve_alias(&tool.name);
        let arguments = catalogue::remap_arguments(&tool.name, input);
        debug!(tool = %tool.name, server_tool = method_name, "Calling tool");

        let result = self
            .request(
                "tools/call",
                json!({"name": method_name, "arguments": arguments}),
            )
            .await?;
        extract_content(&tool.name, result)
    }

    /// Validates and dispatches a call by name against a discovered snapshot.
    /// A call that fails validation is never dispatched. Transport and tool
    /// failures are captured in the returned record.
    pub async fn execute(
        &self,
        tools: &[ToolDescriptor],
        name: &str,
        input: Value,
    ) -> Result<ToolCallRecord, ToolError> {
        let tool = Self::find_tool(tools, name).ok_or_else(|| ToolError::NotFound {
            name: name.to_string(),
            available: tools.iter().map(|t| t.name.clone()).collect(),
        })?;

        if let Err(failure) = validate_input(tool, &input) {
            warn!(tool = %tool.name, problems = ?failure.problems, "Rejected tool input");
            return Err(failure.into());
        }

        let mut record = ToolCallRecord::pending(tool.name.clone(), tool.endpoint.clone(), input);
        let outcome = self
            .call_tool(tool, &record.input)
            .await
            .map_err(|err| err.to_string());
        match &outcome {
            Ok(_) => info!(tool = %tool.name, "Tool call succeeded"),
            Err(err) => warn!(tool = %tool.name, error = %err, "Tool call failed"),
        }
        record.resolve(outcome);
        Ok(record)
    }

    /// Server-Sent Events variant for tools that declare an endpoint. Each
    /// `data:` frame is yielded as JSON, or as `{"text": ...}` when it is not
    /// JSON; a `[DONE]` frame ends the stream.
    pub fn call_tool_streaming(
        &self,
        tool: &ToolDescriptor,
        input: &Value,
    ) -> Result<ToolEventStream, ToolInvokeError> {
        let endpoint = tool
            .endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ToolInvokeError::NoEndpoint {
                tool: tool.name.clone(),
            })?;
        let url = if endpoint.starts_with("http") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.base_url, endpoint)
        };
        debug!(tool = %tool.name, url = %url, "Opening tool event stream");

        let request = self
            .http
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .timeout(self.timeout)
            .json(input);
        let source = EventSource::new(request).map_err(|err| ToolInvokeError::Stream {
            tool: tool.name.clone(),
            message: err.to_string(),
        })?;

        let tool_name = tool.name.clone();
        let stream = futures::stream::unfold(Some(source), move |state| {
            let tool_name = tool_name.clone();
            async move {
                let mut source = state?;
                loop {
                    match source.next().await {
                        None => return None,
                        Some(Ok(Event::Open)) => continue,
                        Some(Ok(Event::Message(message))) => {
                            let data = message.data.trim();
                            if data == "[DONE]" {
                                source.close();
                                return None;
                            }
                            let value = serde_json::from_str(data)
                                .unwrap_or_else(|_| json!({"text": message.data}));
                            return Some((Ok(value), Some(source)));
                        }
                        Some(Err(reqwest_eventsource::Error::StreamEnded)) => return None,
                        Some(Err(err)) => {
                            source.close();
                            let failure = ToolInvokeError::Stream {
                                tool: tool_name,
                                message: err.to_string(),
                            };
                            return Some((Err(failure), None));
                        }
                    }
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ToolInvokeError> {
        tokio::time::timeout(self.timeout, self.exchange(method, params))
            .await
            .map_err(|_| self.timed_out())?
    }

    async fn exchange(&self, method: &str, params: Value) -> Result<Value, ToolInvokeError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let response = self
            .transport
            .send(RpcRequest::new(id, method, params))
            .await?;
        response.into_result(&self.server())
    }

    fn timed_out(&self) -> ToolInvokeError {
        ToolInvokeError::Timeout {
            server: self.server(),
            secs: self.timeout.as_secs(),
        }
    }
}

/// Joins the text items of a `tools/call` result and parses them as JSON,
/// falling back to `{"text": ...}`. Results flagged `isError` become a
/// typed failure.
fn extract_content(tool: &str, result: Value) -> Result<Value, ToolInvokeError> {
    let Some(items) = result.get("content").and_then(Value::as_array) else {
        return Ok(result);
    };
    let text: String = items
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect();

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(ToolInvokeError::ToolFailed {
            tool: tool.to_string(),
            message: text,
        });
    }
    Ok(serde_json::from_str(&text).unwrap_or_else(|_| json!({"text": text})))
}

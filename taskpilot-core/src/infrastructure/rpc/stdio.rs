//! Tool server running as a long-lived child process, speaking
//! newline-delimited JSON-RPC over its standard streams.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, info, warn};

use super::error::ToolInvokeError;
use super::transport::RpcTransport;
use super::types::{RpcRequest, RpcResponse};
use crate::config::ToolServerConfig;

type Responder = oneshot::Sender<Result<RpcResponse, ToolInvokeError>>;
type PendingTable = HashMap<String, Responder>;

/// Spawns the server on first use and keeps it running. Responses are
/// matched to requests by id; when the process exits every outstanding
/// request fails and the next request respawns it.
#[derive(Clone)]
pub struct StdioTransport {
    inner: Arc<ProcessInner>,
}

struct ProcessInner {
    config: ToolServerConfig,
    label: String,
    child: AsyncMutex<Option<Child>>,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    pending: Mutex<PendingTable>,
}

impl StdioTransport {
    pub fn new(config: ToolServerConfig) -> Self {
        let label = config.describe();
        Self {
            inner: Arc::new(ProcessInner {
                config,
                label,
                child: AsyncMutex::new(None),
                writer: AsyncMutex::new(None),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Stops the child process and fails anything still waiting on it.
    pub async fn shutdown(&self) {
        self.inner.reset().await;
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.inner.pending().len()
    }
}

#[async_trait]
impl RpcTransport for StdioTransport {
    fn describe(&self) -> String {
        self.inner.label.clone()
    }

    async fn send(&self, request: RpcRequest) -> Result<RpcResponse, ToolInvokeError> {
        self.inner.ensure_running().await?;
        self.inner.send_request(request).await
    }
}

impl ProcessInner {
    async fn ensure_running(self: &Arc<Self>) -> Result<(), ToolInvokeError> {
        let mut child_slot = self.child.lock().await;
        if child_slot.is_some() {
            return Ok(());
        }

        let program = self
            .config
            .command
            .as_ref()
            .ok_or_else(|| self.transport_error("no command configured"))?;

        let mut command = Command::new(program);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.workdir {
            command.current_dir(dir);
        }
        if !self.config.args.is_empty() {
            command.args(&self.config.args);
        }
        for (key, value) in &self.config.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| ToolInvokeError::Spawn {
            server: self.label.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.transport_error("failed to capture server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.transport_error("failed to capture server stdout"))?;

        *self.writer.lock().await = Some(BufWriter::new(stdin));
        *child_slot = Some(child);
        drop(child_slot);

        info!(server = %self.label, "Started tool server process");

        let reader_self = Arc::clone(self);
        tokio::spawn(async move {
            reader_self.reader_loop(stdout).await;
        });
        Ok(())
    }

    async fn send_request(&self, request: RpcRequest) -> Result<RpcResponse, ToolInvokeError> {
        let key = request.id.to_string();
        let (tx, rx) = oneshot::channel();
        self.pending().insert(key.clone(), tx);
        // Removes the entry however this future ends, including when the
        // caller drops it on timeout.
        let _slot = PendingSlot { owner: self, key };

        let payload = serde_json::to_value(&request).map_err(|source| {
            ToolInvokeError::InvalidJson {
                server: self.label.clone(),
                source,
            }
        })?;
        self.write_message(&payload).await?;

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(ToolInvokeError::Cancelled {
                server: self.label.clone(),
            }),
        }
    }

    async fn reader_loop(self: Arc<Self>, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(raw)) = lines.next_line().await {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('\u{1b}') {
                debug!(server = %self.label, line = trimmed, "skipping ANSI log line from tool server");
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => {
                    if let Err(err) = self.process_inbound_message(value).await {
                        warn!(server = %self.label, %err, "failed to process message from tool server");
                    }
                }
                Err(source) => {
                    warn!(server = %self.label, line = trimmed, %source, "received invalid JSON from tool server");
                }
            }
        }

        warn!(server = %self.label, "Tool server output closed");
        self.reset().await;
    }

    async fn process_inbound_message(&self, value: Value) -> Result<(), ToolInvokeError> {
        let id = value.get("id").cloned();
        let method = value.get("method").and_then(Value::as_str).map(str::to_string);
        match (id, method) {
            (Some(id), Some(method)) => self.handle_server_request(id, &method).await,
            (Some(id), None) => {
                self.handle_response(id, value).await;
                Ok(())
            }
            (None, Some(method)) => {
                debug!(server = %self.label, method, "received notification from tool server");
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }

    async fn handle_response(&self, id: Value, value: Value) {
        let Some(key) = response_key(&id) else {
            return;
        };
        let responder = self.pending().remove(&key);
        let Some(sender) = responder else {
            debug!(server = %self.label, response_id = key, "received response for unknown request");
            return;
        };

        let parsed = serde_json::from_value::<RpcResponse>(value).map_err(|source| {
            ToolInvokeError::InvalidJson {
                server: self.label.clone(),
                source,
            }
        });
        let _ = sender.send(parsed);
    }

    async fn handle_server_request(&self, id: Value, method: &str) -> Result<(), ToolInvokeError> {
        let reply = if method == "ping" {
            json!({"jsonrpc": "2.0", "id": id, "result": {}})
        } else {
            warn!(server = %self.label, method, "tool server sent unsupported request");
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {
                    "code": -32601,
                    "message": format!("client does not implement method '{method}'"),
                }
            })
        };
        self.write_message(&reply).await
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolInvokeError> {
        let mut encoded =
            serde_json::to_string(message).map_err(|source| ToolInvokeError::InvalidJson {
                server: self.label.clone(),
                source,
            })?;
        encoded.push('\n');

        let mut writer = self.writer.lock().await;
        let stream = writer
            .as_mut()
            .ok_or_else(|| self.transport_error("writer not initialised"))?;
        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|source| self.transport_error(source.to_string()))
    }

    async fn reset(&self) {
        *self.writer.lock().await = None;

        let running = self.child.lock().await.take();
        if let Some(mut child) = running {
            if let Err(err) = child.kill().await {
                debug!(server = %self.label, %err, "failed to kill tool server (may have already exited)");
            }
            let _ = child.wait().await;
        }

        self.fail_all_pending();
    }

    fn fail_all_pending(&self) {
        let drained: Vec<Responder> = self.pending().drain().map(|(_, sender)| sender).collect();
        for sender in drained {
            let _ = sender.send(Err(ToolInvokeError::Terminated {
                server: self.label.clone(),
            }));
        }
    }

    fn pending(&self) -> MutexGuard<'_, PendingTable> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Transport {
            server: self.label.clone(),
            message: message.into(),
        }
    }
}

struct PendingSlot<'a> {
    owner: &'a ProcessInner,
    key: String,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.owner.pending().remove(&self.key);
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::ToolInvokeError;
use super::transport::RpcTransport;
use super::types::{RpcRequest, RpcResponse};

/// POSTs each request as JSON to a fixed endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    url: String,
    http: Client,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn send(&self, request: RpcRequest) -> Result<RpcResponse, ToolInvokeError> {
        debug!(url = %self.url, method = %request.method, id = request.id, "Sending JSON-RPC request");

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|source| ToolInvokeError::Http {
                server: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolInvokeError::Status {
                server: self.url.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| ToolInvokeError::Http {
                server: self.url.clone(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| ToolInvokeError::InvalidJson {
            server: self.url.clone(),
            source,
        })
    }
}

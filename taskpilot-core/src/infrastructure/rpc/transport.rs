use std::sync::Arc;

use async_trait::async_trait;

use super::error::ToolInvokeError;
use super::http::HttpTransport;
use super::types::{RpcRequest, RpcResponse};
use crate::config::{ServerMode, ToolServerConfig};

/// Carries one JSON-RPC request to the tool server and returns its response.
/// The message shape is fixed; only the carrier differs.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Label used in errors and logs
    fn describe(&self) -> String;

    async fn send(&self, request: RpcRequest) -> Result<RpcResponse, ToolInvokeError>;
}

/// Builds the transport selected by the tool server configuration.
pub fn transport_from_config(
    config: &ToolServerConfig,
) -> Result<Arc<dyn RpcTransport>, ToolInvokeError> {
    match config.mode {
        ServerMode::Http => Ok(Arc::new(HttpTransport::new(config.rpc_url()))),
        #[cfg(feature = "native-transport")]
        ServerMode::Stdio => Ok(Arc::new(super::stdio::StdioTransport::new(config.clone()))),
        #[cfg(not(feature = "native-transport"))]
        ServerMode::Stdio => Err(ToolInvokeError::Transport {
            server: config.describe(),
            message: "stdio transport requires the native-transport feature".to_string(),
        }),
    }
}

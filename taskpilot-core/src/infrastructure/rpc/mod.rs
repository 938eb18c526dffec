//! JSON-RPC 2.0 plumbing for the tool protocol: message types, errors and
//! pluggable transports.

mod error;
mod http;
#[cfg(feature = "native-transport")]
mod stdio;
mod transport;
pub mod types;

pub use error::ToolInvokeError;
pub use http::HttpTransport;
#[cfg(feature = "native-transport")]
pub use stdio::StdioTransport;
pub use transport::{RpcTransport, transport_from_config};
pub use types::{RpcError, RpcRequest, RpcResponse};

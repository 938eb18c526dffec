use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("failed to spawn tool server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("tool server '{server}' transport error: {message}")]
    Transport { server: String, message: String },
    #[error("failed to reach tool server '{server}': {source}")]
    Http {
        server: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("tool server '{server}' returned error {status}: {body}")]
    Status {
        server: String,
        status: u16,
        body: String,
    },
    #[error("tool server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("tool server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("tool '{tool}' reported an error: {message}")]
    ToolFailed { tool: String, message: String },
    #[error("tool server '{server}' terminated unexpectedly")]
    Terminated { server: String },
    #[error("tool server '{server}' request cancelled")]
    Cancelled { server: String },
    #[error("tool server '{server}' did not answer within {secs}s")]
    Timeout { server: String, secs: u64 },
    #[error("tool '{tool}' has no endpoint defined")]
    NoEndpoint { tool: String },
    #[error("failed to stream from tool '{tool}': {message}")]
    Stream { tool: String, message: String },
}

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use super::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_RPC_PATH: &str = "/mcp/message";

/// How the tool server is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerMode {
    #[default]
    Http,
    Stdio,
}

impl ServerMode {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(ServerMode::Http),
            "stdio" => Ok(ServerMode::Stdio),
            _ => Err(ConfigError::UnknownServerMode {
                value: value.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerMode::Http => "http",
            ServerMode::Stdio => "stdio",
        }
    }
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolServerConfig {
    pub mode: ServerMode,
    pub base_url: String,
    pub rpc_path: String,
    pub command: Option<PathBuf>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
}

impl Default for ToolServerConfig {
    fn default() -> Self {
        Self {
            mode: ServerMode::Http,
            base_url: DEFAULT_BASE_URL.to_string(),
            rpc_path: DEFAULT_RPC_PATH.to_string(),
            command: None,
            args: Vec::new(),
            env: HashMap::new(),
            workdir: None,
        }
    }
}

impl ToolServerConfig {
    /// Full JSON-RPC endpoint for HTTP mode.
    pub fn rpc_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.rpc_path.trim_start_matches('/')
        )
    }

    /// Short human readable location, used in logs and the config report.
    pub fn describe(&self) -> String {
        match self.mode {
            ServerMode::Http => self.rpc_url(),
            ServerMode::Stdio => {
                let command = self
                    .command
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default();
                if self.args.is_empty() {
                    format!("stdio: {command}")
                } else {
                    format!("stdio: {command} {}", self.args.join(" "))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct RawToolServer {
    #[serde(default)]
    pub(super) mode: Option<String>,
    #[serde(default)]
    pub(super) base_url: Option<String>,
    #[serde(default)]
    pub(super) rpc_path: Option<String>,
    #[serde(default)]
    pub(super) command: Option<String>,
    #[serde(default)]
    pub(super) args: Vec<String>,
    #[serde(default)]
    pub(super) env: HashMap<String, String>,
    #[serde(default)]
    pub(super) workdir: Option<String>,
}

impl TryFrom<RawToolServer> for ToolServerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawToolServer) -> Result<Self, Self::Error> {
        let expand = |s: &str| -> String {
            shellexpand::full(s)
                .map(|cow| cow.into_owned())
                .unwrap_or_else(|_| s.to_string())
        };

        let mode = match raw.mode.as_deref() {
            Some(value) => ServerMode::parse(value)?,
            None => ServerMode::default(),
        };
        let command = raw
            .command
            .filter(|c| !c.trim().is_empty())
            .map(|c| PathBuf::from(expand(&c)));
        if mode == ServerMode::Stdio && command.is_none() {
            return Err(ConfigError::MissingCommand);
        }

        Ok(Self {
            mode,
            base_url: raw
                .base_url
                .filter(|u| !u.trim().is_empty())
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            rpc_path: raw
                .rpc_path
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_RPC_PATH.to_string()),
            command,
            args: raw.args.iter().map(|arg| expand(arg)).collect(),
            env: raw.env,
            workdir: raw.workdir.map(|dir| PathBuf::from(expand(&dir))),
        })
    }
}

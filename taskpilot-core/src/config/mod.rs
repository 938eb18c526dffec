//! Runtime configuration: provider credentials, tool server location and the
//! agent's ceilings. Loaded from an optional TOML file plus environment
//! overrides.

pub mod app;
pub mod error;
pub mod loader;
pub mod provider;
pub mod server;

/// Default config file path - can be overridden via CLI argument
pub const CONFIG_PATH: &str = "config/agent.toml";

pub use app::{AgentSettings, AppConfig};
pub use error::ConfigError;
pub use provider::ProviderConfig;
pub use server::{ServerMode, ToolServerConfig};

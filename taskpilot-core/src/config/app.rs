use std::path::Path;
use std::time::Duration;

use super::error::ConfigError;
use super::provider::ProviderConfig;
use super::server::ToolServerConfig;
use crate::constants::{DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_ITERATIONS, DEFAULT_TOOL_TIMEOUT_SECS};
use crate::domain::LlmProvider;

/// Ceilings and timeouts applied to every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    pub max_iterations: u32,
    pub tool_timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

/// Application configuration loaded from agent.toml and the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub default_provider: LlmProvider,
    pub agent: AgentSettings,
    pub tool_server: ToolServerConfig,
    /// One entry per provider, in discovery order.
    pub providers: Vec<ProviderConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: LlmProvider::default(),
            agent: AgentSettings::default(),
            tool_server: ToolServerConfig::default(),
            providers: LlmProvider::ALL
                .iter()
                .map(|provider| ProviderConfig::defaults(*provider))
                .collect(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a file path (or default path if None)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    pub fn provider(&self, provider: LlmProvider) -> Option<&ProviderConfig> {
        self.providers.iter().find(|config| config.provider == provider)
    }

    pub fn available_providers(&self) -> Vec<LlmProvider> {
        self.providers
            .iter()
            .filter(|config| config.is_configured())
            .map(|config| config.provider)
            .collect()
    }
}

use super::CONFIG_PATH;
use super::app::{AgentSettings, AppConfig};
use super::error::ConfigError;
use super::provider::{ProviderConfig, RawProviderConfig};
use super::server::{RawToolServer, ToolServerConfig};
use crate::domain::LlmProvider;
use dotenvy::{dotenv, from_filename};
use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;
use std::time::Duration;
use tracing::debug;

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
pub(super) struct RawConfig {
    pub default_provider: Option<String>,
    #[serde(default)]
    pub agent: RawAgent,
    #[serde(default)]
    pub tool_server: RawToolServer,
    #[serde(default)]
    pub providers: Vec<RawProviderConfig>,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct RawAgent {
    pub max_iterations: Option<i64>,
    pub tool_timeout_secs: Option<i64>,
    pub cache_ttl_secs: Option<i64>,
}

/// Ensures environment variables are loaded from config/.env or ./.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        if from_filename("config/.env").is_err() {
            let _ = dotenv();
        }
    });
}

/// Load and validate configuration from a file path.
///
/// A missing default file is not an error: defaults plus environment
/// overrides are used instead. A missing explicit file is.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    ensure_env_loaded();
    let lookup = |name: &str| env::var(name).ok().filter(|value| !value.trim().is_empty());

    let raw = match path {
        Some(path) => read_raw(path)?,
        None => match read_raw(Path::new(CONFIG_PATH)) {
            Err(ConfigError::NotFound { .. }) => {
                debug!(path = CONFIG_PATH, "No config file, using defaults");
                RawConfig::default()
            }
            other => other?,
        },
    };
    build_config(raw, &lookup)
}

/// Parses TOML text and applies overrides from `lookup` instead of the
/// process environment.
pub fn parse_config<F>(content: &str, path: &Path, lookup: &F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    build_config(raw, lookup)
}

fn read_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    debug!(path = %path.display(), "Reading agent configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn build_config<F>(mut raw: RawConfig, lookup: &F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(&mut raw, lookup)?;
    validate_and_build(raw, lookup)
}

fn apply_env_overrides<F>(raw: &mut RawConfig, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("DEFAULT_LLM_PROVIDER") {
        raw.default_provider = Some(value);
    }
    if let Some(value) = lookup("MCP_SERVER_MODE") {
        raw.tool_server.mode = Some(value);
    }
    if let Some(value) = lookup("MCP_SERVER_BASE_URL") {
        raw.tool_server.base_url = Some(value);
    }
    if let Some(value) = lookup("MCP_SERVER_COMMAND") {
        raw.tool_server.command = Some(value);
    }
    if let Some(value) = lookup("MAX_ITERATIONS") {
        raw.agent.max_iterations = Some(parse_number("MAX_ITERATIONS", &value)?);
    }
    if let Some(value) = lookup("TOOL_TIMEOUT") {
        raw.agent.tool_timeout_secs = Some(parse_number("TOOL_TIMEOUT", &value)?);
    }
    Ok(())
}

fn parse_number(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn positive(key: &str, value: Option<i64>, default: u64) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(number) if number > 0 => Ok(number as u64),
        Some(number) => Err(ConfigError::InvalidNumber {
            key: key.to_string(),
            value: number.to_string(),
        }),
    }
}

fn validate_and_build<F>(parsed: RawConfig, lookup: &F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = AgentSettings::default();

    let default_provider = match parsed.default_provider.as_deref() {
        Some(value) => value
            .parse::<LlmProvider>()
            .map_err(|_| ConfigError::UnknownProvider {
                value: value.to_string(),
            })?,
        None => LlmProvider::default(),
    };

    let max_iterations = positive(
        "max_iterations",
        parsed.agent.max_iterations,
        u64::from(defaults.max_iterations),
    )?;
    let max_iterations = u32::try_from(max_iterations).map_err(|_| ConfigError::InvalidNumber {
        key: "max_iterations".to_string(),
        value: max_iterations.to_string(),
    })?;
    let tool_timeout = positive(
        "tool_timeout_secs",
        parsed.agent.tool_timeout_secs,
        defaults.tool_timeout.as_secs(),
    )?;
    let cache_ttl = positive(
        "cache_ttl_secs",
        parsed.agent.cache_ttl_secs,
        defaults.cache_ttl.as_secs(),
    )?;

    let mut raw_providers: Vec<(LlmProvider, RawProviderConfig)> = Vec::new();
    for raw in parsed.providers {
        let provider = raw
            .id
            .parse::<LlmProvider>()
            .map_err(|_| ConfigError::UnknownProvider {
                value: raw.id.clone(),
            })?;
        if raw_providers.iter().any(|(seen, _)| *seen == provider) {
            return Err(ConfigError::DuplicateProvider {
                provider: provider.to_string(),
            });
        }
        raw_providers.push((provider, raw));
    }

    let providers = LlmProvider::ALL
        .iter()
        .map(|provider| {
            let raw = raw_providers
                .iter()
                .position(|(seen, _)| seen == provider)
                .map(|index| raw_providers.swap_remove(index).1);
            ProviderConfig::from_raw(*provider, raw, lookup)
        })
        .collect();

    let tool_server = ToolServerConfig::try_from(parsed.tool_server)?;
    debug!(
        mode = %tool_server.mode,
        location = %tool_server.describe(),
        "Tool server configured"
    );

    Ok(AppConfig {
        default_provider,
        agent: AgentSettings {
            max_iterations,
            tool_timeout: Duration::from_secs(tool_timeout),
            cache_ttl: Duration::from_secs(cache_ttl),
        },
        tool_server,
        providers,
    })
}

//! # Provider Configuration
//!
//! One entry per LLM backend. Every provider always has an entry; a provider
//! without a usable credential is simply reported as unavailable.
//!
//! ```toml
//! [[providers]]
//! id = "anthropic"
//! api_key_env = "ANTHROPIC_API_KEY"
//! model = "claude-3-sonnet-20240229"
//! ```

use serde::Deserialize;

use crate::domain::LlmProvider;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com";
pub const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-sonnet-20240229";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct RawProviderConfig {
    pub(super) id: String,
    #[serde(default)]
    pub(super) api_key_env: Option<String>,
    #[serde(default)]
    pub(super) api_key: Option<String>,
    #[serde(default)]
    pub(super) model: Option<String>,
    #[serde(default)]
    pub(super) endpoint: Option<String>,
}

impl ProviderConfig {
    /// Built-in settings for a provider with no credential.
    pub fn defaults(provider: LlmProvider) -> Self {
        let (model, endpoint) = match provider {
            LlmProvider::Gemini => (DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_ENDPOINT),
            LlmProvider::OpenAI => (DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_ENDPOINT),
            LlmProvider::Anthropic => (DEFAULT_ANTHROPIC_MODEL, DEFAULT_ANTHROPIC_ENDPOINT),
        };
        Self {
            provider,
            api_key: None,
            model: model.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    pub(super) fn from_raw<F>(provider: LlmProvider, raw: Option<RawProviderConfig>, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::defaults(provider);
        let raw = raw.unwrap_or_default();

        let env_name = raw
            .api_key_env
            .as_deref()
            .unwrap_or_else(|| provider.api_key_env());
        config.api_key = lookup(env_name).or_else(|| raw.api_key.as_deref().map(expand));

        if let Some(model) = raw.model.filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(endpoint) = raw.endpoint.filter(|e| !e.trim().is_empty()) {
            config.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        config
    }

    /// True when a credential is present, non-blank and not a template
    /// placeholder such as `your_gemini_api_key_here`.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(is_real_credential)
    }

    pub fn credential_status(&self) -> &'static str {
        match self.api_key.as_deref() {
            Some(key) if is_real_credential(key) => "configured",
            Some(key) if !key.trim().is_empty() => "placeholder",
            _ => "missing",
        }
    }
}

pub fn is_real_credential(key: &str) -> bool {
    let key = key.trim();
    if key.is_empty() {
        return false;
    }
    let lowered = key.to_ascii_lowercase();
    !(lowered.starts_with("your_") && lowered.ends_with("_here"))
}

fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn placeholder_keys_are_not_configured() {
        let mut config = ProviderConfig::defaults(LlmProvider::OpenAI);
        config.api_key = Some("your_openai_api_key_here".into());
        assert!(!config.is_configured());
        assert_eq!(config.credential_status(), "placeholder");

        config.api_key = Some("   ".into());
        assert_eq!(config.credential_status(), "missing");

        config.api_key = Some("sk-live".into());
        assert!(config.is_configured());
    }

    #[test]
    fn environment_credential_wins_over_file_value() {
        let raw = RawProviderConfig {
            id: "anthropic".into(),
            api_key: Some("from-file".into()),
            ..Default::default()
        };
        let lookup = |name: &str| (name == "ANTHROPIC_API_KEY").then(|| "from-env".to_string());
        let config = ProviderConfig::from_raw(LlmProvider::Anthropic, Some(raw), &lookup);
        assert_eq!(config.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.model, DEFAULT_ANTHROPIC_MODEL);
    }

    #[test]
    fn custom_model_and_endpoint_are_kept() {
        let raw = RawProviderConfig {
            id: "gemini".into(),
            model: Some("gemini-2.0-flash".into()),
            endpoint: Some("http://localhost:9999/".into()),
            ..Default::default()
        };
        let config = ProviderConfig::from_raw(LlmProvider::Gemini, Some(raw), &no_env);
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.endpoint, "http://localhost:9999");
        assert!(config.api_key.is_none());
    }
}

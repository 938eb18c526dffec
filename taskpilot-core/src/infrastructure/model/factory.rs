//! Provider factory - creates clients from config

use std::sync::Arc;
use std::time::Duration;

use super::clients::{AnthropicClient, GeminiClient, OpenAIClient};
use super::traits::LlmClient;
use crate::config::{AppConfig, ProviderConfig};
use crate::constants::MODEL_TIMEOUT_SECS;
use crate::domain::LlmProvider;
use tracing::debug;

/// Factory for creating model clients from provider config.
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(config: &ProviderConfig, timeout: Duration) -> Arc<dyn LlmClient> {
        match config.provider {
            LlmProvider::Gemini => Arc::new(GeminiClient::from_config(config, timeout)),
            LlmProvider::OpenAI => Arc::new(OpenAIClient::from_config(config, timeout)),
            LlmProvider::Anthropic => Arc::new(AnthropicClient::from_config(config, timeout)),
        }
    }

    /// One client per provider, in discovery order.
    pub fn create_all(config: &AppConfig) -> Vec<Arc<dyn LlmClient>> {
        let timeout = Duration::from_secs(MODEL_TIMEOUT_SECS);
        LlmProvider::ALL
            .iter()
            .map(|provider| {
                let settings = config
                    .provider(*provider)
                    .cloned()
                    .unwrap_or_else(|| ProviderConfig::defaults(*provider));
                debug!(
                    provider = provider.as_str(),
                    model = settings.model.as_str(),
                    credential = settings.credential_status(),
                    "Creating LLM client"
                );
                Self::create(&settings, timeout)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_one_client_per_provider_in_order() {
        let mut config = AppConfig::default();
        config.providers[1].api_key = Some("sk-test".into());

        let clients = ProviderFactory::create_all(&config);
        let providers: Vec<_> = clients.iter().map(|c| c.provider()).collect();
        assert_eq!(providers, LlmProvider::ALL.to_vec());

        let available: Vec<_> = clients
            .iter()
            .filter(|c| c.is_available())
            .map(|c| c.provider())
            .collect();
        assert_eq!(available, vec![LlmProvider::OpenAI]);
    }
}

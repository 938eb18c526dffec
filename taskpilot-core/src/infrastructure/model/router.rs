//! Routes generation requests to one of several backends, with fallback.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::factory::ProviderFactory;
use super::traits::LlmClient;
use super::types::{GenerateOptions, ModelError};
use crate::config::AppConfig;
use crate::domain::{ChatMessage, LlmProvider};

/// Holds one client per provider. Clients are kept in discovery order, which
/// is also the fallback order.
pub struct LlmRouter {
    clients: Vec<Arc<dyn LlmClient>>,
    configured_default: LlmProvider,
}

impl LlmRouter {
    pub fn new(clients: Vec<Arc<dyn LlmClient>>, configured_default: LlmProvider) -> Self {
        Self {
            clients,
            configured_default,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ProviderFactory::create_all(config), config.default_provider)
    }

    /// Client for `provider`, if one is registered and configured.
    pub fn client(&self, provider: LlmProvider) -> Result<&Arc<dyn LlmClient>, ModelError> {
        self.clients
            .iter()
            .find(|client| client.provider() == provider && client.is_available())
            .ok_or(ModelError::NotConfigured { provider })
    }

    pub fn available_providers(&self) -> Vec<LlmProvider> {
        self.clients
            .iter()
            .filter(|client| client.is_available())
            .map(|client| client.provider())
            .collect()
    }

    pub fn is_available(&self, provider: LlmProvider) -> bool {
        self.client(provider).is_ok()
    }

    /// Configured default when available, else the first available provider.
    pub fn default_provider(&self) -> Result<LlmProvider, ModelError> {
        let available = self.available_providers();
        if available.contains(&self.configured_default) {
            return Ok(self.configured_default);
        }
        available
            .first()
            .copied()
            .ok_or(ModelError::NoProviderConfigured)
    }

    pub async fn generate(
        &self,
        provider: LlmProvider,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<String, ModelError> {
        let client = self.client(provider)?;
        client.generate(messages, options).await
    }

    /// Tries `preferred` first (when available), then every other available
    /// provider in discovery order. Returns the first success together with
    /// the provider that produced it.
    pub async fn generate_with_fallback(
        &self,
        messages: &[ChatMessage],
        preferred: Option<LlmProvider>,
        options: &GenerateOptions,
    ) -> Result<(String, LlmProvider), ModelError> {
        let available = self.available_providers();
        let mut order: Vec<LlmProvider> = Vec::with_capacity(available.len());
        if let Some(preferred) = preferred.filter(|p| available.contains(p)) {
            order.push(preferred);
        }
        for provider in available {
            if !order.contains(&provider) {
                order.push(provider);
            }
        }

        if order.is_empty() {
            return Err(ModelError::NoProviderConfigured);
        }

        let mut last_error = None;
        for provider in &order {
            debug!(provider = provider.as_str(), "Attempting LLM generation");
            match self.generate(*provider, messages, options).await {
                Ok(text) => {
                    if preferred.is_some_and(|p| p != *provider) {
                        info!(
                            provider = provider.as_str(),
                            "Fell back to alternate LLM provider"
                        );
                    }
                    return Ok((text, *provider));
                }
                Err(err) => {
                    warn!(provider = provider.as_str(), %err, "LLM provider failed");
                    last_error = Some(err);
                }
            }
        }

        let last = last_error.unwrap_or(ModelError::NoProviderConfigured);
        Err(ModelError::AllProvidersFailed {
            attempted: order,
            last: Box::new(last),
        })
    }
}

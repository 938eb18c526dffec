//! Model types - per-call options and errors

use crate::domain::LlmProvider;
use thiserror::Error;

/// Per-call overrides. Unset fields fall back to the client's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl GenerateOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("LLM provider '{provider}' is not properly configured")]
    NotConfigured { provider: LlmProvider },

    #[error("no LLM providers are properly configured")]
    NoProviderConfigured,

    #[error("network error calling provider '{provider}': {source}")]
    Network {
        provider: LlmProvider,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to provider '{provider}' timed out")]
    Timeout { provider: LlmProvider },

    #[error("provider '{provider}' returned HTTP {status}: {body}")]
    Api {
        provider: LlmProvider,
        status: u16,
        body: String,
    },

    #[error("provider '{provider}' returned invalid response: {reason}")]
    InvalidResponse {
        provider: LlmProvider,
        reason: String,
    },

    #[error("All LLM providers failed. Last error: {last}")]
    AllProvidersFailed {
        attempted: Vec<LlmProvider>,
        #[source]
        last: Box<ModelError>,
    },
}

impl ModelError {
    pub fn network(provider: LlmProvider, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { provider }
        } else {
            Self::Network { provider, source }
        }
    }

    pub fn invalid_response(provider: LlmProvider, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider,
            reason: reason.into(),
        }
    }

    /// Provider the error originated from, when there is a single one.
    pub fn provider(&self) -> Option<LlmProvider> {
        match self {
            ModelError::NotConfigured { provider }
            | ModelError::Network { provider, .. }
            | ModelError::Timeout { provider }
            | ModelError::Api { provider, .. }
            | ModelError::InvalidResponse { provider, .. } => Some(*provider),
            ModelError::NoProviderConfigured => None,
            ModelError::AllProvidersFailed { last, .. } => last.provider(),
        }
    }
}

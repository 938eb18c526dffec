//! Anthropic messages API client

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::config::ProviderConfig;
use crate::constants::DEFAULT_MAX_TOKENS;
use crate::domain::{ChatMessage, LlmProvider};
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::traits::LlmClient;
use crate::infrastructure::model::types::{GenerateOptions, ModelError};

const MESSAGES_PATH: &str = "/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicClient {
    base: HttpClientBase,
}

impl AnthropicClient {
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Self {
        Self {
            base: HttpClientBase::new(config, timeout),
        }
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> AnthropicRequest {
        let (system, turns) = MessageAdapter::to_anthropic_format(messages);
        AnthropicRequest {
            model: options
                .model
                .clone()
                .unwrap_or_else(|| self.base.model.clone()),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages: turns,
            temperature: options.temperature,
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> LlmProvider {
        LlmProvider::Anthropic
    }

    fn is_available(&self) -> bool {
        self.base.is_available()
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<String, ModelError> {
        let url = self.base.build_url(MESSAGES_PATH);
        let payload = self.build_request(messages, options);

        info!(
            provider = self.base.provider.as_str(),
            model = payload.model.as_str(),
            messages = messages.len(),
            "Sending request to Anthropic"
        );

        let response: AnthropicResponse = self
            .base
            .post_with_header(
                &url,
                "x-api-key",
                &[("anthropic-version", API_VERSION)],
                &payload,
            )
            .await?;
        debug!("Received response from Anthropic");

        response
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| ModelError::invalid_response(self.base.provider, "missing text block"))
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    text: Option<String>,
}

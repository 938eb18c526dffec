//! OpenAI chat completions client

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::config::ProviderConfig;
use crate::constants::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::domain::{ChatMessage, LlmProvider};
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::traits::LlmClient;
use crate::infrastructure::model::types::{GenerateOptions, ModelError};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

#[derive(Clone)]
pub struct OpenAIClient {
    base: HttpClientBase,
}

impl OpenAIClient {
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Self {
        Self {
            base: HttpClientBase::new(config, timeout),
        }
    }

    fn build_request(&self, messages: &[ChatMessage], options: &GenerateOptions) -> OpenAIRequest {
        OpenAIRequest {
            model: options
                .model
                .clone()
                .unwrap_or_else(|| self.base.model.clone()),
            messages: MessageAdapter::to_openai_format(messages),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    fn provider(&self) -> LlmProvider {
        LlmProvider::OpenAI
    }

    fn is_available(&self) -> bool {
        self.base.is_available()
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<String, ModelError> {
        let url = self.base.build_url(CHAT_COMPLETIONS_PATH);
        let payload = self.build_request(messages, options);

        info!(
            provider = self.base.provider.as_str(),
            model = payload.model.as_str(),
            messages = messages.len(),
            "Sending request to OpenAI"
        );

        let response: OpenAIResponse = self.base.post_with_bearer(&url, &payload).await?;
        debug!("Received response from OpenAI");

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| ModelError::invalid_response(self.base.provider, "missing content"))
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<serde_json::Value>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessage>,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_defaults_unless_overridden() {
        let client = OpenAIClient::from_config(
            &ProviderConfig::defaults(LlmProvider::OpenAI),
            Duration::from_secs(1),
        );
        let request = client.build_request(&[ChatMessage::user("hi")], &GenerateOptions::default());
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.max_tokens, 1000);
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);

        let request = client.build_request(
            &[ChatMessage::user("hi")],
            &GenerateOptions::default().with_model("gpt-4o").with_max_tokens(50),
        );
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.max_tokens, 50);
    }
}

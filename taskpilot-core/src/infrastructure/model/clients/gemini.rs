//! Gemini client implementation

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::config::ProviderConfig;
use crate::domain::{ChatMessage, LlmProvider};
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::traits::LlmClient;
use crate::infrastructure::model::types::{GenerateOptions, ModelError};

const GEMINI_API_PATH: &str = "v1beta/models";

/// Gemini client for Google AI. The conversation is sent as one flattened
/// prompt rather than as separate turns.
#[derive(Clone)]
pub struct GeminiClient {
    base: HttpClientBase,
}

impl GeminiClient {
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Self {
        Self {
            base: HttpClientBase::new(config, timeout),
        }
    }

    fn build_model_url(&self, model: &str) -> String {
        self.base
            .build_url(&format!("{GEMINI_API_PATH}/{model}:generateContent"))
    }

    pub(crate) fn build_payload(messages: &[ChatMessage], options: &GenerateOptions) -> Value {
        let prompt = MessageAdapter::to_transcript(messages);
        let mut payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }]
        });

        let mut generation = serde_json::Map::new();
        if let Some(max_tokens) = options.max_tokens {
            generation.insert("maxOutputTokens".into(), json!(max_tokens));
        }
        if let Some(temperature) = options.temperature {
            generation.insert("temperature".into(), json!(temperature));
        }
        if !generation.is_empty() {
            payload["generationConfig"] = Value::Object(generation);
        }
        payload
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn provider(&self) -> LlmProvider {
        LlmProvider::Gemini
    }

    fn is_available(&self) -> bool {
        self.base.is_available()
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<String, ModelError> {
        let model = options.model.as_deref().unwrap_or(&self.base.model);
        let url = self.build_model_url(model);
        let payload = Self::build_payload(messages, options);

        info!(
            provider = self.base.provider.as_str(),
            model,
            messages = messages.len(),
            "Sending request to Gemini"
        );

        let response: GeminiResponse = self.base.post_with_query_key(&url, &payload).await?;
        debug!("Received response from Gemini");

        let text: String = response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .flat_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            return Err(ModelError::invalid_response(self.base.provider, "missing text"));
        }
        Ok(text)
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

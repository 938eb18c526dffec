use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language-model backends known to the router, in discovery order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    pub const ALL: [LlmProvider; 3] = [
        LlmProvider::Gemini,
        LlmProvider::OpenAI,
        LlmProvider::Anthropic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini",
            LlmProvider::OpenAI => "openai",
            LlmProvider::Anthropic => "anthropic",
        }
    }

    /// Conventional environment variable holding this provider's API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            LlmProvider::Gemini => "GEMINI_API_KEY",
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown LLM provider '{0}' (expected gemini, openai or anthropic)")]
pub struct UnknownProvider(pub String);

impl FromStr for LlmProvider {
    type Err = UnknownProvider;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            "openai" => Ok(LlmProvider::OpenAI),
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            _ => Err(UnknownProvider(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<LlmProvider>(), Ok(LlmProvider::OpenAI));
        assert_eq!(" gemini ".parse::<LlmProvider>(), Ok(LlmProvider::Gemini));
        assert!("mistral".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn serializes_lowercase_ids() {
        let value = serde_json::to_value(LlmProvider::OpenAI).expect("serializes");
        assert_eq!(value, serde_json::json!("openai"));
    }
}

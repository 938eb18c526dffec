//! Message adapters - convert role-tagged messages to each backend's format

use crate::domain::{ChatMessage, MessageRole};
use serde_json::{Value, json};

pub struct MessageAdapter;

impl MessageAdapter {
    /// OpenAI chat format: `[{"role": "...", "content": "..."}]`
    pub fn to_openai_format(messages: &[ChatMessage]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.as_str(),
                    "content": msg.content.clone()
                })
            })
            .collect()
    }

    /// Anthropic format: system content travels separately from the
    /// user/assistant turns.
    pub fn to_anthropic_format(messages: &[ChatMessage]) -> (Option<String>, Vec<Value>) {
        let mut system_parts = Vec::new();
        let mut turns = Vec::new();

        for message in messages {
            match message.role {
                MessageRole::System => system_parts.push(message.content.clone()),
                MessageRole::User | MessageRole::Assistant => turns.push(json!({
                    "role": message.role.as_str(),
                    "content": message.content.clone()
                })),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, turns)
    }

    /// Single prompt transcript with one `Role: content` line per message.
    pub fn to_transcript(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .map(|message| {
                let label = match message.role {
                    MessageRole::System => "System",
                    MessageRole::User => "User",
                    MessageRole::Assistant => "Assistant",
                };
                format!("{label}: {}", message.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

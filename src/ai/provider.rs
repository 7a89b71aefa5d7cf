use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Generation settings shared by the HTTP providers.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Retries for transient HTTP statuses, below the response-shape retry loop.
    pub http_max_retries: u32,
}

impl GenerationSettings {
    pub fn messages(&self, prompt: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage::system(&self.system_prompt));
        }
        messages.push(ChatMessage::user(prompt));
        messages
    }
}

/// The text-generation collaborator: one prompt in, one free-text response out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_include_system_prompt() {
        let settings = GenerationSettings {
            system_prompt: "You are a sizing expert.".into(),
            max_tokens: 750,
            temperature: Some(0.3),
            http_max_retries: 0,
        };
        let messages = settings.messages("Analyze");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1], ChatMessage::user("Analyze"));
    }

    #[test]
    fn test_messages_without_system_prompt() {
        let settings = GenerationSettings {
            system_prompt: String::new(),
            max_tokens: 750,
            temperature: None,
            http_max_retries: 0,
        };
        assert_eq!(settings.messages("x").len(), 1);
    }
}

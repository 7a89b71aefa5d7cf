use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai::provider::{ChatMessage, GenerationSettings, TextGenerator};
use crate::ai::retry::send_with_retry;
use crate::error::AppError;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    model: String,
    settings: GenerationSettings,
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: String, settings: GenerationSettings) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            settings,
        }
    }

    /// The Messages API takes system text as a top-level field, not a role.
    fn build_body(&self, messages: &[ChatMessage]) -> ClaudeRequest {
        let mut system_text: Option<String> = None;
        let mut claude_messages = Vec::new();

        for msg in messages {
            if msg.role == "system" {
                match &mut system_text {
                    Some(existing) => {
                        existing.push_str("\n\n");
                        existing.push_str(&msg.content);
                    }
                    None => system_text = Some(msg.content.clone()),
                }
            } else {
                claude_messages.push(ClaudeMessage {
                    role: msg.role.clone(),
                    content: msg.content.clone(),
                });
            }
        }

        ClaudeRequest {
            model: self.model.clone(),
            max_tokens: self.settings.max_tokens,
            system: system_text,
            messages: claude_messages,
            temperature: self.settings.temperature,
        }
    }
}

// --- Request / Response types for the Anthropic Messages API ---

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContentBlock>,
}

#[derive(Deserialize)]
struct ClaudeContentBlock {
    text: Option<String>,
}

impl ClaudeResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[async_trait]
impl TextGenerator for ClaudeProvider {
    async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let body = self.build_body(&self.settings.messages(prompt));

        let response = send_with_retry(
            || {
                self.client
                    .post(ANTHROPIC_API_URL)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .header("content-type", "application/json")
                    .json(&body)
            },
            "Anthropic",
            self.settings.http_max_retries,
        )
        .await?;

        let resp: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| AppError::AiProviderError(format!("Failed to parse response: {}", e)))?;

        Ok(resp.text())
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai::provider::{ChatMessage, GenerationSettings, TextGenerator};
use crate::ai::retry::send_with_retry;
use crate::error::AppError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Any OpenAI-compatible Chat Completions endpoint (OpenAI, DeepSeek, Ollama's `/v1`).
pub struct OpenAiProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    settings: GenerationSettings,
}

impl OpenAiProvider {
    pub fn new(
        api_key: Option<String>,
        model: String,
        base_url: Option<String>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            settings,
        }
    }

    fn chat_endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_body(&self, messages: &[ChatMessage]) -> OpenAiRequest {
        OpenAiRequest {
            model: self.model.clone(),
            messages: messages.iter().map(OpenAiMessage::from).collect(),
            max_tokens: Some(self.settings.max_tokens),
            temperature: self.settings.temperature,
        }
    }
}

// --- Request / Response types for the OpenAI Chat Completions API ---

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.clone(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: Option<OpenAiMessageContent>,
}

#[derive(Deserialize)]
struct OpenAiMessageContent {
    content: Option<String>,
    /// Reasoning models may leave `content` empty and answer here instead.
    reasoning_content: Option<String>,
}

impl OpenAiResponse {
    fn text(&self) -> String {
        let message = self.choices.first().and_then(|c| c.message.as_ref());
        message
            .and_then(|m| {
                m.content
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .or(m.reasoning_content.as_deref())
            })
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl TextGenerator for OpenAiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let body = self.build_body(&self.settings.messages(prompt));
        let endpoint = self.chat_endpoint();

        let response = send_with_retry(
            || {
                let request = self
                    .client
                    .post(&endpoint)
                    .header("Content-Type", "application/json")
                    .json(&body);
                match &self.api_key {
                    Some(key) => request.header("Authorization", format!("Bearer {}", key)),
                    None => request,
                }
            },
            "OpenAI",
            self.settings.http_max_retries,
        )
        .await?;

        let resp: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| AppError::AiProviderError(format!("Failed to parse response: {}", e)))?;

        let text = resp.text();
        if text.is_empty() {
            log::warn!(
                "[openai] API returned empty text. Choices: {}, model: {}",
                resp.choices.len(),
                self.model
            );
        }
        Ok(text)
    }
}

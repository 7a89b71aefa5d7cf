pub mod claude;
pub mod openai;
pub mod provider;
pub mod retry;

use crate::ai::claude::ClaudeProvider;
use crate::ai::openai::OpenAiProvider;
use crate::ai::provider::{GenerationSettings, TextGenerator};
use crate::analysis::prompts::SYSTEM_PROMPT;
use crate::config::EngineConfig;
use crate::error::AppError;

/// Build the configured text-generation provider.
pub fn create_generator(config: &EngineConfig) -> Result<Box<dyn TextGenerator>, AppError> {
    let settings = GenerationSettings {
        system_prompt: SYSTEM_PROMPT.to_string(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        http_max_retries: config.http_max_retries,
    };

    match config.ai_provider.as_str() {
        "claude" => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| AppError::ConfigError("Anthropic API key not set".into()))?;
            Ok(Box::new(ClaudeProvider::new(
                api_key,
                config.model.clone(),
                settings,
            )))
        }
        "openai" => Ok(Box::new(OpenAiProvider::new(
            config.api_key.clone(),
            config.model.clone(),
            config.openai_base_url.clone(),
            settings,
        ))),
        other => Err(AppError::ConfigError(format!(
            "Unknown AI provider: {}",
            other
        ))),
    }
}

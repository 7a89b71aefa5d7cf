use crate::error::AppError;
use crate::measure::vocabulary::Vocabulary;
use crate::recommend::policy::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub ai_provider: String,
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default)]
    pub openai_base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
    #[serde(default = "default_max_generation_attempts")]
    pub max_generation_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_http_max_retries")]
    pub http_max_retries: u32,
    #[serde(default)]
    pub generation_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub vocabulary_path: Option<String>,
}

fn default_max_tokens() -> u32 {
    750
}

fn default_temperature() -> Option<f32> {
    Some(0.3)
}

fn default_max_generation_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_http_max_retries() -> u32 {
    2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ai_provider: "claude".to_string(),
            api_key: None,
            model: "claude-sonnet-4-5-20250929".to_string(),
            openai_base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_generation_attempts: default_max_generation_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            http_max_retries: default_http_max_retries(),
            generation_timeout_seconds: None,
            vocabulary_path: None,
        }
    }
}

impl EngineConfig {
    /// Get the path to the config file in the user's config dir
    pub fn config_path() -> Result<PathBuf, AppError> {
        let data_dir = dirs::config_dir()
            .ok_or_else(|| AppError::ConfigError("Cannot find config directory".into()))?;
        Ok(data_dir.join("fitwise").join("config.json"))
    }

    /// Load config from the default location, or return defaults if not found
    pub fn load() -> Result<Self, AppError> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| AppError::ConfigError(e.to_string()))
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), AppError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_generation_attempts.max(1),
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn generation_timeout(&self) -> Option<Duration> {
        self.generation_timeout_seconds
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    /// The configured vocabulary file, or the embedded default.
    pub fn vocabulary(&self) -> Result<Vocabulary, AppError> {
        match &self.vocabulary_path {
            Some(path) => Vocabulary::load_from_file(Path::new(path)),
            None => Vocabulary::builtin(),
        }
    }
}

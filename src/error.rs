use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No relevant measurements found for this garment type. Add your measurements first")]
    NoRelevantMeasurements,

    #[error("Invalid AI response format: {0}")]
    InvalidAiResponseFormat(String),

    #[error("Analysis already in progress")]
    AnalysisInProgress,

    #[error("Generation cancelled: {0}")]
    Cancelled(String),

    #[error("AI provider error: {0}")]
    AiProviderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl AppError {
    /// Errors that end a generation loop immediately instead of consuming another attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Cancelled(_) | AppError::ConfigError(_))
    }
}

// Serialized as the Display string so a host UI can show it directly.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Read a level from the first word of a section body
    /// (`"high - chest matches"` is `High`).
    pub fn from_text(text: &str) -> Option<Self> {
        let lower = text.trim().to_lowercase();
        let word = lower
            .split(|c: char| !c.is_alphabetic())
            .find(|w| !w.is_empty())?;
        match word {
            "high" => Some(Self::High),
            "medium" | "moderate" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitType {
    Fitted,
    Regular,
    Loose,
}

impl FitType {
    pub fn from_text(text: &str) -> Option<Self> {
        let lower = text.trim().to_lowercase();
        let word = lower
            .split(|c: char| !c.is_alphabetic())
            .find(|w| !w.is_empty())?;
        match word {
            "fitted" => Some(Self::Fitted),
            "regular" => Some(Self::Regular),
            "loose" => Some(Self::Loose),
            _ => None,
        }
    }
}

/// An alternative the model offered, with or without a reason attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlternativeSize {
    Described { size: String, description: String },
    Bare(String),
}

impl AlternativeSize {
    /// `"L: if loose fit preferred"` splits on the first colon; anything else stays bare.
    pub fn from_line(line: &str) -> Self {
        match line.split_once(':') {
            Some((size, description)) => Self::Described {
                size: size.trim().to_string(),
                description: description.trim().to_string(),
            },
            None => Self::Bare(line.trim().to_string()),
        }
    }

    pub fn size(&self) -> &str {
        match self {
            Self::Described { size, .. } => size,
            Self::Bare(size) => size,
        }
    }
}

/// A validated size recommendation parsed from a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRecord {
    pub size: String,
    pub confidence: ConfidenceLevel,
    pub reasoning: String,
    pub fit_type: Option<FitType>,
    pub key_measurements: Vec<String>,
    pub potential_issues: Vec<String>,
    pub alternative_sizes: Vec<AlternativeSize>,
}

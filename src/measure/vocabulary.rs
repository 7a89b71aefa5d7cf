use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::AppError;
use crate::measure::chart::SizeChartNormalizer;
use crate::measure::headers::HeaderCanonicalizer;
use crate::measure::selector::MeasurementSelector;
use crate::measure::stretch::MaterialStretchEstimator;

/// Lookup tables the normalization components are built from.
/// Matches the schema of `vocabularies/default.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Vocabulary {
    pub version: Option<u32>,
    pub header_rules: Vec<HeaderRule>,
    pub categories: Vec<CategoryMeasurements>,
    pub fallback_measurements: Vec<String>,
    pub stretch: StretchTable,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeaderRule {
    pub canonical: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryMeasurements {
    pub name: String,
    pub measurements: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StretchTable {
    #[serde(default = "default_coefficient")]
    pub default_coefficient: f64,
    pub coefficients: HashMap<String, f64>,
    #[serde(default)]
    pub promotional_terms: Vec<String>,
}

fn default_coefficient() -> f64 {
    1.0
}

pub(crate) const DEFAULT_YAML: &str = include_str!("../../vocabularies/default.yaml");

impl Vocabulary {
    /// Load a vocabulary from a YAML file.
    pub fn load_from_file(path: &Path) -> Result<Self, AppError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, AppError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse vocabulary: {}", e)))
    }

    /// The embedded default vocabulary.
    pub fn builtin() -> Result<Self, AppError> {
        Self::from_yaml(DEFAULT_YAML)
    }

    pub fn header_canonicalizer(&self) -> HeaderCanonicalizer {
        HeaderCanonicalizer::new(self.header_rules.clone())
    }

    pub fn chart_normalizer(&self) -> SizeChartNormalizer {
        SizeChartNormalizer::new(self.header_canonicalizer())
    }

    pub fn measurement_selector(&self) -> MeasurementSelector {
        MeasurementSelector::new(self.categories.clone(), self.fallback_measurements.clone())
    }

    pub fn stretch_estimator(&self) -> MaterialStretchEstimator {
        MaterialStretchEstimator::new(self.stretch.clone())
    }
}

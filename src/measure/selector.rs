use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::AppError;
use crate::measure::vocabulary::CategoryMeasurements;

/// A profile entry as stored by the popup form: usually a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

fn leading_float() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?")
            .expect("valid float regex")
    })
}

impl ProfileValue {
    /// Numeric value, reading a leading number out of text (`"94cm"` -> 94).
    pub fn coerce(&self) -> Option<f64> {
        let value = match self {
            ProfileValue::Number(n) => *n,
            ProfileValue::Text(s) => leading_float().find(s)?.as_str().trim().parse().ok()?,
            ProfileValue::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for ProfileValue {
    fn from(n: f64) -> Self {
        ProfileValue::Number(n)
    }
}

impl From<&str> for ProfileValue {
    fn from(s: &str) -> Self {
        ProfileValue::Text(s.to_string())
    }
}

/// The user's saved body measurements (centimeters) and fit preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_fit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_preference: Option<String>,
    #[serde(flatten)]
    pub measurements: HashMap<String, ProfileValue>,
}

impl UserProfile {
    pub fn with_measurement(mut self, key: &str, value: impl Into<ProfileValue>) -> Self {
        self.measurements.insert(key.to_string(), value.into());
        self
    }
}

pub type RelevantMeasurements = BTreeMap<String, f64>;

/// Picks the profile measurements that matter for a garment category.
#[derive(Debug, Clone)]
pub struct MeasurementSelector {
    categories: Vec<CategoryMeasurements>,
    fallback: Vec<String>,
}

impl MeasurementSelector {
    pub fn new(categories: Vec<CategoryMeasurements>, fallback: Vec<String>) -> Self {
        Self {
            categories,
            fallback,
        }
    }

    /// Measurement keys for a category; unknown categories use the fallback list.
    pub fn keys_for(&self, category: &str) -> &[String] {
        let normalized = category.trim().to_lowercase();
        self.categories
            .iter()
            .find(|c| c.name == normalized)
            .map(|c| c.measurements.as_slice())
            .unwrap_or(self.fallback.as_slice())
    }

    /// Entries that are missing or not numeric are left out, never zero-filled.
    pub fn select(&self, category: &str, profile: &UserProfile) -> RelevantMeasurements {
        self.keys_for(category)
            .iter()
            .filter_map(|key| {
                let value = profile.measurements.get(key)?.coerce()?;
                Some((key.clone(), value))
            })
            .collect()
    }

    /// Like [`select`](Self::select), failing when nothing usable is left.
    pub fn select_required(
        &self,
        category: &str,
        profile: &UserProfile,
    ) -> Result<RelevantMeasurements, AppError> {
        let selected = self.select(category, profile);
        if selected.is_empty() {
            return Err(AppError::NoRelevantMeasurements);
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::vocabulary::Vocabulary;

    fn selector() -> MeasurementSelector {
        Vocabulary::builtin().unwrap().measurement_selector()
    }

    #[test]
    fn test_tshirt_drops_neck_and_non_numeric() {
        let profile = UserProfile::default()
            .with_measurement("chest", "94")
            .with_measurement("neck", "37")
            .with_measurement("waist", "abc");
        let selected = selector().select("t-shirt", &profile);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected["chest"], 94.0);
    }

    #[test]
    fn test_category_is_trimmed_and_lowercased() {
        let profile = UserProfile::default()
            .with_measurement("neck", 37.0)
            .with_measurement("chest", 94.0);
        let selected = selector().select("  Shirt ", &profile);
        assert_eq!(selected["neck"], 37.0);
        assert_eq!(selected["chest"], 94.0);
    }

    #[test]
    fn test_unknown_category_uses_fallback() {
        let s = selector();
        assert_eq!(s.keys_for("Kurta"), ["chest", "waist", "hips", "shoulders"]);
        let profile = UserProfile::default()
            .with_measurement("hips", "106")
            .with_measurement("inseam", "80");
        let selected = s.select("kurta", &profile);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected["hips"], 106.0);
    }

    #[test]
    fn test_leading_number_coercion() {
        assert_eq!(ProfileValue::from("94cm").coerce(), Some(94.0));
        assert_eq!(ProfileValue::from(" 78.5").coerce(), Some(78.5));
        assert_eq!(ProfileValue::from("").coerce(), None);
        assert_eq!(ProfileValue::from("cm94").coerce(), None);
        assert_eq!(ProfileValue::Other(serde_json::Value::Null).coerce(), None);
    }

    #[test]
    fn test_empty_profile_is_fatal() {
        let err = selector()
            .select_required("pants", &UserProfile::default())
            .unwrap_err();
        assert!(matches!(err, AppError::NoRelevantMeasurements));
    }

    #[test]
    fn test_profile_deserializes_from_stored_json() {
        let json = r#"{"chest":"94","waist":78,"hips":null,"preferredFit":"Loose"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.preferred_fit.as_deref(), Some("Loose"));
        let selected = selector().select("dress", &profile);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected["waist"], 78.0);
    }
}

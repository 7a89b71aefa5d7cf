use crate::measure::vocabulary::HeaderRule;

/// Maps vendor column labels onto canonical measurement names.
#[derive(Debug, Clone)]
pub struct HeaderCanonicalizer {
    rules: Vec<HeaderRule>,
}

impl HeaderCanonicalizer {
    pub fn new(rules: Vec<HeaderRule>) -> Self {
        Self { rules }
    }

    /// First rule with a keyword contained in the lower-cased label wins.
    /// Unrecognized labels come back unchanged so their column is not lost.
    pub fn canonicalize(&self, label: &str) -> String {
        let lower = label.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|rule| rule.canonical.clone())
            .unwrap_or_else(|| label.to_string())
    }
}

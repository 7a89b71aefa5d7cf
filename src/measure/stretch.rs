use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use regex::Regex;

use crate::measure::vocabulary::StretchTable;

/// One line of a garment's fabric composition, e.g. `95% cotton`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub material: String,
    pub percentage: f64,
}

impl Material {
    pub fn new(material: &str, percentage: f64) -> Self {
        Self {
            material: material.to_string(),
            percentage,
        }
    }
}

/// Aggregate elasticity of a composition; 1 is ordinary woven fabric.
pub type StretchFactor = u32;

#[derive(Debug, Clone)]
pub struct MaterialStretchEstimator {
    table: StretchTable,
}

impl MaterialStretchEstimator {
    pub fn new(table: StretchTable) -> Self {
        Self { table }
    }

    pub fn coefficient(&self, material: &str) -> f64 {
        self.table
            .coefficients
            .get(&material.trim().to_lowercase())
            .copied()
            .unwrap_or(self.table.default_coefficient)
    }

    pub fn is_promotional(&self, material: &str) -> bool {
        let lower = material.to_lowercase();
        self.table
            .promotional_terms
            .iter()
            .any(|term| lower.contains(term.as_str()))
    }

    /// Weighted stretch factor over the composition.
    ///
    /// Entries outside (0, 100] or naming a promotional term are ignored. Mass
    /// short of 100% counts as default fabric; mass above 100% is not rescaled.
    pub fn estimate(&self, materials: &[Material]) -> StretchFactor {
        if materials.is_empty() {
            return 0;
        }

        let mut weighted = 0.0;
        let mut mass = 0.0;
        for entry in materials {
            let pct = entry.percentage;
            if !(pct > 0.0 && pct <= 100.0) || entry.material.trim().is_empty() {
                continue;
            }
            if self.is_promotional(&entry.material) {
                log::debug!("[stretch] Ignoring non-material entry: {}", entry.material);
                continue;
            }
            weighted += pct * self.coefficient(&entry.material);
            mass += pct;
        }

        if mass < 100.0 {
            weighted += (100.0 - mass) * self.table.default_coefficient;
        }

        (weighted / 100.0).round().max(0.0) as StretchFactor
    }

    /// Pull `NN% name` pairs out of free composition text such as
    /// `"Shell: 95% Cotton, 5% Elastane"`.
    pub fn parse_materials(&self, text: &str) -> Vec<Material> {
        let matches: Vec<_> = percentage_token().captures_iter(text).collect();
        let mut materials = Vec::new();

        for (i, cap) in matches.iter().enumerate() {
            let whole = match cap.get(0) {
                Some(m) => m,
                None => continue,
            };
            let end = matches
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(text.len());

            let name: String = text[whole.end()..end]
                .chars()
                .take_while(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
                .collect();
            let name = name.trim();
            let percentage: f64 = match cap[1].parse() {
                Ok(p) => p,
                Err(_) => continue,
            };

            if name.is_empty() || self.is_promotional(name) {
                continue;
            }
            materials.push(Material::new(name, percentage));
        }
        materials
    }
}

fn percentage_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("valid percentage regex"))
}

use crate::analysis::ProductData;
use crate::measure::chart::NormalizedSizeChart;
use crate::measure::selector::{RelevantMeasurements, UserProfile};
use crate::measure::stretch::StretchFactor;

pub const SYSTEM_PROMPT: &str = r#"You are a clothing size recommendation expert. Your task is to analyze measurements and provide accurate size recommendations.

Rules:
1. Always respond in English
2. Use exact measurements in centimeters
3. Consider both user measurements and garment measurements
4. Account for fabric stretch and fit preferences
5. Be precise with numbers and calculations

Analyze the measurements provided and respond EXACTLY in this format:

MEASUREMENTS ANALYSIS:
[Compare user measurements with size chart measurements]

BEST SIZE: [Recommend specific size]
CONFIDENCE: [high/medium/low]
REASONING: [Brief explanation with numbers]
FIT TYPE: [fitted/regular/loose]

KEY MEASUREMENTS:
- [List key differences]

POTENTIAL ISSUES:
- [List potential fit problems]

ALTERNATIVE SIZES:
- [Size]: [reason]"#;

const CHART_UNAVAILABLE: &str = "Size chart data not available";

fn or_default<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
}

/// Compose the user prompt for one product analysis.
pub fn build_analysis_prompt(
    product: &ProductData,
    chart: Option<&NormalizedSizeChart>,
    measurements: &RelevantMeasurements,
    profile: &UserProfile,
    stretch: StretchFactor,
) -> String {
    let sizes = product.available_sizes.join(", ");
    let mut prompt = format!(
        "Analyze these measurements for {}:\n\nPRODUCT DETAILS:\n- Category: {}\n- Brand: {}\n- Fit: {}\n- Available Sizes: {}",
        or_default(&product.title, "this garment"),
        or_default(&product.category, "Clothing"),
        or_default(&product.brand, "Not specified"),
        or_default(&product.fit, "Regular Fit"),
        sizes,
    );

    if !product.materials.is_empty() {
        prompt.push_str("\n\nMATERIALS:\n");
        for m in &product.materials {
            prompt.push_str(&format!("- {}: {}%\n", m.material, m.percentage));
        }
        prompt.push_str(&format!("Calculated Stretch Factor: {}", stretch));
    }

    if !product.fit_feedback.is_empty() {
        prompt.push_str("\n\nCUSTOMER FEEDBACK:");
        for f in &product.fit_feedback {
            prompt.push_str(&format!(
                "\n- {}: {} ({}% of customers)",
                f.aspect, f.response, f.percentage
            ));
        }
    }

    prompt.push_str("\n\nSIZE CHART:\n");
    match chart {
        Some(chart) => prompt.push_str(chart.format().trim_end()),
        None => prompt.push_str(CHART_UNAVAILABLE),
    }

    prompt.push_str("\n\nUSER MEASUREMENTS:");
    for (key, value) in measurements {
        prompt.push_str(&format!("\n- {}: {}cm", key, value));
    }

    prompt.push_str(&format!(
        "\n\nPREFERENCES:\n- Preferred Fit: {}\n- Size Preference: {}",
        or_default(&profile.preferred_fit, "Regular"),
        or_default(&profile.size_preference, "Standard"),
    ));

    prompt.push_str(&format!(
        "\n\nProvide a size recommendation using only these available sizes: {}\nInclude exact measurements in your reasoning.\nRespond in English only.",
        sizes
    ));
    prompt
}

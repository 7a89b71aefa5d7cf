use crate::error::AppError;
use crate::recommend::record::{AlternativeSize, ConfidenceLevel, FitType, RecommendationRecord};

/// Section headings the model is instructed to emit, each followed by a colon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    MeasurementsAnalysis,
    BestSize,
    Confidence,
    Reasoning,
    FitType,
    KeyMeasurements,
    PotentialIssues,
    AlternativeSizes,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::MeasurementsAnalysis,
        Section::BestSize,
        Section::Confidence,
        Section::Reasoning,
        Section::FitType,
        Section::KeyMeasurements,
        Section::PotentialIssues,
        Section::AlternativeSizes,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Section::MeasurementsAnalysis => "MEASUREMENTS ANALYSIS",
            Section::BestSize => "BEST SIZE",
            Section::Confidence => "CONFIDENCE",
            Section::Reasoning => "REASONING",
            Section::FitType => "FIT TYPE",
            Section::KeyMeasurements => "KEY MEASUREMENTS",
            Section::PotentialIssues => "POTENTIAL ISSUES",
            Section::AlternativeSizes => "ALTERNATIVE SIZES",
        }
    }
}

/// Recognize `LABEL:` at the start of a line, tolerating markdown heading and
/// bold markers around the label. Returns the section and the text after the colon.
fn heading(line: &str) -> Option<(Section, &str)> {
    let rest = line.trim_start().trim_start_matches('#').trim_start();
    let rest = rest.strip_prefix("**").unwrap_or(rest);

    Section::ALL.iter().find_map(|section| {
        let after = rest.strip_prefix(section.label())?;
        let after = after.strip_prefix("**").unwrap_or(after).trim_start();
        let body = after.strip_prefix(':')?;
        let body = body.strip_prefix("**").unwrap_or(body);
        Some((*section, body))
    })
}

enum State {
    SeekingHeader,
    InBody(usize),
}

/// Split a response into (section, body) pairs with a line-oriented state
/// machine. Only known labels at line start open a section, so a colon inside
/// list content never splits a body.
pub fn split_sections(text: &str) -> Vec<(Section, String)> {
    let mut sections: Vec<(Section, Vec<&str>)> = Vec::new();
    let mut state = State::SeekingHeader;

    for line in text.lines() {
        if let Some((section, inline)) = heading(line) {
            sections.push((section, vec![inline]));
            state = State::InBody(sections.len() - 1);
            continue;
        }
        match state {
            State::SeekingHeader => {}
            State::InBody(idx) => sections[idx].1.push(line),
        }
    }

    sections
        .into_iter()
        .map(|(section, lines)| (section, lines.join("\n").trim().to_string()))
        .collect()
}

/// Bulleted lines (`-`, `*`, `•`) of a section body, markers stripped.
fn bullet_items(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| {
            let line = line.trim();
            let item = line
                .strip_prefix('-')
                .or_else(|| line.strip_prefix('*'))
                .or_else(|| line.strip_prefix('•'))?;
            let item = item.trim();
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}

fn first_line(body: &str) -> String {
    body.lines()
        .map(|l| l.trim().trim_matches('*').trim())
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Parse a model response into a validated [`RecommendationRecord`].
///
/// Later occurrences of a section replace earlier ones. Fails with
/// `InvalidAiResponseFormat` when the best size or confidence is missing.
pub fn parse_recommendation(text: &str) -> Result<RecommendationRecord, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::InvalidAiResponseFormat(
            "empty response from AI model".into(),
        ));
    }

    let mut size = String::new();
    let mut confidence_text = String::new();
    let mut reasoning = String::new();
    let mut fit_type = None;
    let mut key_measurements = Vec::new();
    let mut potential_issues = Vec::new();
    let mut alternative_sizes = Vec::new();

    for (section, body) in split_sections(text) {
        match section {
            Section::MeasurementsAnalysis => {}
            Section::BestSize => size = first_line(&body),
            Section::Confidence => confidence_text = body.to_lowercase(),
            Section::Reasoning => reasoning = body,
            Section::FitType => fit_type = FitType::from_text(&body),
            Section::KeyMeasurements => key_measurements = bullet_items(&body),
            Section::PotentialIssues => potential_issues = bullet_items(&body),
            Section::AlternativeSizes => {
                alternative_sizes = bullet_items(&body)
                    .iter()
                    .map(|item| AlternativeSize::from_line(item))
                    .collect()
            }
        }
    }

    if size.is_empty() {
        return Err(AppError::InvalidAiResponseFormat(
            "missing BEST SIZE section".into(),
        ));
    }
    if confidence_text.is_empty() {
        return Err(AppError::InvalidAiResponseFormat(
            "missing CONFIDENCE section".into(),
        ));
    }
    let confidence = ConfidenceLevel::from_text(&confidence_text).ok_or_else(|| {
        AppError::InvalidAiResponseFormat(format!(
            "unrecognized confidence level: {}",
            confidence_text
        ))
    })?;

    Ok(RecommendationRecord {
        size,
        confidence,
        reasoning,
        fit_type,
        key_measurements,
        potential_issues,
        alternative_sizes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RESPONSE: &str = "BEST SIZE: M\nCONFIDENCE: high\nREASONING: chest matches\nFIT TYPE: regular\nKEY MEASUREMENTS:\n- chest: 94cm matches\nPOTENTIAL ISSUES:\n- sleeves may be short\nALTERNATIVE SIZES:\n- L: if loose fit preferred";

    #[test]
    fn test_parse_full_response() {
        let record = parse_recommendation(FULL_RESPONSE).unwrap();
        assert_eq!(record.size, "M");
        assert_eq!(record.confidence, ConfidenceLevel::High);
        assert_eq!(record.reasoning, "chest matches");
        assert_eq!(record.fit_type, Some(FitType::Regular));
        assert_eq!(record.key_measurements, vec!["chest: 94cm matches"]);
        assert_eq!(record.potential_issues, vec!["sleeves may be short"]);
        assert_eq!(
            record.alternative_sizes,
            vec![AlternativeSize::Described {
                size: "L".into(),
                description: "if loose fit preferred".into()
            }]
        );
    }

    #[test]
    fn test_missing_best_size_fails() {
        let err = parse_recommendation("CONFIDENCE: high\nREASONING: fine").unwrap_err();
        assert!(matches!(err, AppError::InvalidAiResponseFormat(_)));
    }

    #[test]
    fn test_missing_confidence_fails() {
        let err = parse_recommendation("BEST SIZE: M\nREASONING: fine").unwrap_err();
        assert!(matches!(err, AppError::InvalidAiResponseFormat(_)));
    }

    #[test]
    fn test_empty_body_counts_as_missing() {
        let err = parse_recommendation("BEST SIZE:\nCONFIDENCE: low").unwrap_err();
        assert!(err.to_string().contains("BEST SIZE"));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(parse_recommendation("").is_err());
        assert!(parse_recommendation("   \n ").is_err());
    }

    #[test]
    fn test_sections_in_any_order_with_preamble() {
        let text = "Here is my analysis.\n\nMEASUREMENTS ANALYSIS:\nYour chest is 94cm.\n\nCONFIDENCE: Medium\nBEST SIZE: L\n";
        let record = parse_recommendation(text).unwrap();
        assert_eq!(record.size, "L");
        assert_eq!(record.confidence, ConfidenceLevel::Medium);
        assert_eq!(record.fit_type, None);
        assert!(record.key_measurements.is_empty());
    }

    #[test]
    fn test_multiline_reasoning_and_uppercase_inside_body() {
        let text = "BEST SIZE: M\nCONFIDENCE: high\nREASONING: Chest 94cm vs 96cm.\nNOTE: sleeves run long.\nFIT TYPE: Loose";
        let record = parse_recommendation(text).unwrap();
        assert_eq!(record.reasoning, "Chest 94cm vs 96cm.\nNOTE: sleeves run long.");
        assert_eq!(record.fit_type, Some(FitType::Loose));
    }

    #[test]
    fn test_heading_inside_list_item_does_not_split() {
        let text = "BEST SIZE: M\nCONFIDENCE: low\nPOTENTIAL ISSUES:\n- BEST SIZE: depends on fabric\n* waist may gap\n• hips tight\nnot a bullet";
        let record = parse_recommendation(text).unwrap();
        assert_eq!(record.size, "M");
        assert_eq!(
            record.potential_issues,
            vec!["BEST SIZE: depends on fabric", "waist may gap", "hips tight"]
        );
    }

    #[test]
    fn test_bare_and_described_alternatives() {
        let text = "BEST SIZE: 32\nCONFIDENCE: medium\nALTERNATIVE SIZES:\n- 34\n- 30: if you prefer a snug waist";
        let record = parse_recommendation(text).unwrap();
        assert_eq!(record.alternative_sizes[0], AlternativeSize::Bare("34".into()));
        assert_eq!(record.alternative_sizes[1].size(), "30");
    }

    #[test]
    fn test_markdown_decorated_headings() {
        let text = "**BEST SIZE:** M\n## CONFIDENCE: High\n**REASONING**: fits";
        let record = parse_recommendation(text).unwrap();
        assert_eq!(record.size, "M");
        assert_eq!(record.confidence, ConfidenceLevel::High);
        assert_eq!(record.reasoning, "fits");
    }

    #[test]
    fn test_best_size_keeps_first_line_only() {
        let text = "BEST SIZE:\n**M**\nbecause the chest fits\nCONFIDENCE: high";
        let record = parse_recommendation(text).unwrap();
        assert_eq!(record.size, "M");
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        let err = parse_recommendation("best size: M\nconfidence: high").unwrap_err();
        assert!(matches!(err, AppError::InvalidAiResponseFormat(_)));
    }

    #[test]
    fn test_unrecognized_confidence_rejected() {
        let err = parse_recommendation("BEST SIZE: M\nCONFIDENCE: certain").unwrap_err();
        assert!(err.to_string().contains("unrecognized confidence"));
    }

    #[test]
    fn test_split_sections_keeps_order() {
        let sections = split_sections(FULL_RESPONSE);
        let labels: Vec<&str> = sections.iter().map(|(s, _)| s.label()).collect();
        assert_eq!(
            labels,
            vec![
                "BEST SIZE",
                "CONFIDENCE",
                "REASONING",
                "FIT TYPE",
                "KEY MEASUREMENTS",
                "POTENTIAL ISSUES",
                "ALTERNATIVE SIZES"
            ]
        );
    }
}

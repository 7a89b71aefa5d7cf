use std::sync::OnceLock;

use regex::Regex;

pub const CM_PER_INCH: f64 = 2.54;

fn numeric_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d*)?|\.\d+").expect("valid numeric regex"))
}

/// `in`, `inch` or `inches` standing alone, so `36in` and `Chest (in)` match
/// but `inseam` or `lining` do not.
fn inch_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:^|[^a-z])in(?:ch(?:es)?)?(?:[^a-z]|$)").expect("valid inch regex")
    })
}

fn cm_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:^|[^a-z])cms?(?:[^a-z]|$)").expect("valid cm regex"))
}

/// A unit written as a parenthetical (`(in)`, `[cm]`), a trailing unit word
/// or a trailing inch mark.
fn unit_annotation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)\s*[(\[]\s*(?:inch(?:es)?|in|cms?|"|\x{2033})\s*[)\]]|\s+(?:inch(?:es)?|in|cms?)\s*$|\s*["\x{2033}]\s*$"#,
        )
        .expect("valid unit annotation regex")
    })
}

/// Drop unit annotations from a column label, e.g. `Thigh (in)` -> `Thigh`.
/// Labels that are nothing but a unit come back trimmed and otherwise unchanged.
pub fn strip_unit_annotation(label: &str) -> String {
    let mut current = label.trim().to_string();
    loop {
        let stripped = unit_annotation().replace_all(&current, "").trim().to_string();
        if stripped == current {
            break;
        }
        if stripped.is_empty() {
            return label.trim().to_string();
        }
        current = stripped;
    }
    current
}

/// Round to one decimal place, the precision charts are stored at.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// First numeric token in the cell (digits with at most one decimal point).
pub fn extract_number(cell: &str) -> Option<f64> {
    let token = numeric_token().find(cell)?;
    let value: f64 = token.as_str().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Whether a cell, or the column it sits in, is expressed in inches.
///
/// Only a standalone `in`/`inch`/`inches` counts, so `Inseam` is not inches.
/// A unit written in the cell beats the one in the header; a header naming
/// both units is read as centimeters.
pub fn is_inches(cell: &str, header: Option<&str>) -> bool {
    if cell.contains('"') || cell.contains('\u{2033}') || inch_marker().is_match(cell) {
        return true;
    }
    if cm_marker().is_match(cell) {
        return false;
    }
    header.is_some_and(|h| inch_marker().is_match(h) && !cm_marker().is_match(h))
}

/// Convert a chart cell to centimeters, rounded to one decimal.
///
/// Returns `None` when the cell holds no number; callers skip the cell rather
/// than storing a placeholder.
pub fn to_centimeters(cell: &str, header: Option<&str>) -> Option<f64> {
    let value = extract_number(cell)?;
    let cm = if is_inches(cell, header) {
        value * CM_PER_INCH
    } else {
        value
    };
    let cm = round1(cm);
    cm.is_finite().then_some(cm)
}

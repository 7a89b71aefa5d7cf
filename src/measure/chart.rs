use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::measure::headers::HeaderCanonicalizer;
use crate::measure::units;

const SIZE_COLUMN: &str = "Size";
const MISSING_VALUE: &str = "-";

/// A vendor size chart reduced to canonical headers and centimeter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSizeChart {
    /// Canonical measurement headers in column order, size column excluded.
    pub headers: Vec<String>,
    pub entries: Vec<SizeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeEntry {
    pub size: String,
    pub measurements: BTreeMap<String, f64>,
}

impl NormalizedSizeChart {
    /// Minimal chart listing only the sizes a product is sold in, used when the
    /// scraped chart could not be normalized.
    pub fn from_sizes(sizes: &[String]) -> Self {
        let mut chart = Self {
            headers: Vec::new(),
            entries: Vec::new(),
        };
        for size in sizes {
            let size = size.trim();
            if !size.is_empty() {
                chart.upsert(size, BTreeMap::new());
            }
        }
        chart
    }

    pub fn entry(&self, size: &str) -> Option<&SizeEntry> {
        self.entries.iter().find(|e| e.size == size)
    }

    pub fn value(&self, size: &str, header: &str) -> Option<f64> {
        self.entry(size)?.measurements.get(header).copied()
    }

    pub fn sizes(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.size.as_str()).collect()
    }

    /// Render as a `Size | h1 | h2` table, the form embedded in analysis prompts.
    /// Absent values print as `-`.
    pub fn format(&self) -> String {
        let mut header_line = String::from(SIZE_COLUMN);
        for header in &self.headers {
            header_line.push_str(" | ");
            header_line.push_str(header);
        }

        let mut out = String::new();
        out.push_str(&header_line);
        out.push('\n');
        out.push_str(&"-".repeat(header_line.chars().count()));
        out.push('\n');

        for entry in &self.entries {
            out.push_str(&entry.size);
            for header in &self.headers {
                out.push_str(" | ");
                match entry.measurements.get(header) {
                    Some(value) => out.push_str(&format!("{:.1}", value)),
                    None => out.push_str(MISSING_VALUE),
                }
            }
            out.push('\n');
        }
        out
    }

    fn upsert(&mut self, size: &str, measurements: BTreeMap<String, f64>) {
        // A repeated size label replaces the earlier row.
        match self.entries.iter_mut().find(|e| e.size == size) {
            Some(existing) => existing.measurements = measurements,
            None => self.entries.push(SizeEntry {
                size: size.to_string(),
                measurements,
            }),
        }
    }

    fn has_measurements(&self) -> bool {
        self.entries.iter().any(|e| !e.measurements.is_empty())
    }
}

/// A chart table already split into cells by the scraper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Serialize into the pipe-delimited chart text. Rows without any digit are
    /// dropped; pipes and line breaks inside cells are flattened so columns stay aligned.
    pub fn to_chart_text(&self) -> String {
        let clean = |cell: &String| cell.replace('|', "/").replace(['\n', '\r'], " ").trim().to_string();

        let headers: Vec<String> = self.headers.iter().map(clean).collect();
        let mut lines = vec![
            headers.join(" | "),
            headers.iter().map(|_| "---").collect::<Vec<_>>().join(" | "),
        ];
        for row in &self.rows {
            if !row.iter().any(|cell| cell.chars().any(|c| c.is_ascii_digit())) {
                continue;
            }
            lines.push(row.iter().map(clean).collect::<Vec<_>>().join(" | "));
        }
        lines.join("\n")
    }
}

fn is_separator(line: &str) -> bool {
    line.chars()
        .all(|c| matches!(c, '-' | '|' | ':' | '+') || c.is_whitespace())
}

/// Split a table line on `|`, ignoring the empty cells produced by outer pipes.
fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').map(|c| c.trim().to_string()).collect()
}

/// Parses raw chart text into a [`NormalizedSizeChart`].
#[derive(Debug, Clone)]
pub struct SizeChartNormalizer {
    headers: HeaderCanonicalizer,
}

impl SizeChartNormalizer {
    pub fn new(headers: HeaderCanonicalizer) -> Self {
        Self { headers }
    }

    /// Normalize pipe-delimited chart text.
    ///
    /// Returns `None` ("no chart") when fewer than two usable lines remain or no
    /// cell yields a number.
    pub fn normalize(&self, raw: &str) -> Option<NormalizedSizeChart> {
        let lines: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !is_separator(line))
            .collect();

        if lines.len() < 2 {
            log::debug!("[chart] Rejected: {} usable line(s)", lines.len());
            return None;
        }

        let raw_labels = split_cells(lines[0]);
        // Column 0 is the size label whatever its header says. Values end up in
        // centimeters, so unit annotations are dropped from the stored labels.
        let canonical: Vec<String> = raw_labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                if i == 0 {
                    "size".to_string()
                } else {
                    self.headers.canonicalize(&units::strip_unit_annotation(label))
                }
            })
            .collect();
        for (i, _) in canonical.iter().enumerate().skip(1).filter(|(_, h)| h.is_empty()) {
            log::debug!("[chart] Ignoring unlabeled column {}", i);
        }

        let mut chart = NormalizedSizeChart {
            headers: canonical
                .iter()
                .skip(1)
                .filter(|h| !h.is_empty())
                .cloned()
                .collect(),
            entries: Vec::new(),
        };

        for line in &lines[1..] {
            let cells = split_cells(line);
            if cells.iter().filter(|c| !c.is_empty()).count() < 2 {
                log::debug!("[chart] Skipping sparse row: {}", line);
                continue;
            }
            let size = cells[0].as_str();
            if size.is_empty() {
                continue;
            }

            let mut measurements = BTreeMap::new();
            for (i, cell) in cells.iter().enumerate().skip(1) {
                let header = match canonical.get(i) {
                    Some(h) if !h.is_empty() => h,
                    _ => continue,
                };
                let label = raw_labels.get(i).map(String::as_str);
                if let Some(cm) = units::to_centimeters(cell, label) {
                    measurements.insert(header.clone(), cm);
                }
            }
            chart.upsert(size, measurements);
        }

        if !chart.has_measurements() {
            log::debug!("[chart] Rejected: no numeric cells");
            return None;
        }
        Some(chart)
    }

    pub fn normalize_table(&self, table: &RawTable) -> Option<NormalizedSizeChart> {
        self.normalize(&table.to_chart_text())
    }
}

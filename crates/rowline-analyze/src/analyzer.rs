//! Column analysis over a bounded sample of raw rows.
//!
//! For each column the analyzer computes null and distinct counts, keeps the
//! first few non-null values as a preview, and infers a semantic type by
//! evaluating candidate parsers in a fixed priority order. Inference is
//! precision-biased: a candidate type is selected only when every non-null
//! sampled value parses under it, so one malformed value downgrades the
//! column toward `text`. The analyzer is a pure function of its input and
//! always produces a result; the worst case is an all-text report.

use std::collections::BTreeSet;

use rowline_clean::parsers::{
    PhoneShape, is_valid_email, is_valid_phone, is_valid_url, looks_boolean, looks_date,
    parse_float, parse_integer,
};
use rowline_model::{AnalysisReport, ColumnConfig, ColumnPreview, ColumnType, RawRow};

/// How many non-null values a `ColumnPreview` carries.
pub const SAMPLE_VALUE_CAP: usize = 10;

/// Candidate types in detection priority order, most specific first.
const CANDIDATES: &[ColumnType] = &[
    ColumnType::Integer,
    ColumnType::Number,
    ColumnType::Boolean,
    ColumnType::Date,
    ColumnType::Email,
    ColumnType::Phone,
    ColumnType::Url,
];

/// Analyze a sample of rows against the header's column names.
pub fn analyze(rows: &[RawRow], columns: &[String]) -> AnalysisReport {
    let previews = columns
        .iter()
        .map(|name| analyze_column(name, rows))
        .collect();

    AnalysisReport {
        columns: previews,
        total_rows: rows.len(),
    }
}

/// Seed default column configs from an analysis report.
pub fn default_configs(report: &AnalysisReport) -> Vec<ColumnConfig> {
    report.columns.iter().map(ColumnConfig::from_preview).collect()
}

fn analyze_column(name: &str, rows: &[RawRow]) -> ColumnPreview {
    let mut null_count = 0usize;
    let mut distinct: BTreeSet<String> = BTreeSet::new();
    let mut sample_values = Vec::new();
    let mut non_null_texts = Vec::new();

    for row in rows {
        let value = row.get(name);
        match value {
            None => null_count += 1,
            Some(v) if v.is_empty() => null_count += 1,
            Some(v) => {
                let text = v.as_text();
                distinct.insert(text.clone());
                if sample_values.len() < SAMPLE_VALUE_CAP {
                    sample_values.push(v.clone());
                }
                non_null_texts.push(text);
            }
        }
    }

    let detected_type = detect_type(&non_null_texts);
    tracing::debug!(
        column = name,
        detected = %detected_type,
        nulls = null_count,
        distinct = distinct.len(),
        "column analyzed"
    );

    ColumnPreview {
        name: name.to_string(),
        detected_type,
        sample_values,
        unique_count: distinct.len(),
        null_count,
    }
}

/// Pick the most specific candidate under which every non-null value parses.
fn detect_type(values: &[String]) -> ColumnType {
    if values.is_empty() {
        return ColumnType::Text;
    }
    for candidate in CANDIDATES {
        if values.iter().all(|v| matches_candidate(v, *candidate)) {
            return *candidate;
        }
    }
    ColumnType::Text
}

fn matches_candidate(value: &str, candidate: ColumnType) -> bool {
    match candidate {
        ColumnType::Integer => parse_integer(value).is_some(),
        ColumnType::Number => parse_float(value).is_some(),
        ColumnType::Boolean => looks_boolean(value),
        ColumnType::Date => looks_date(value),
        ColumnType::Email => is_valid_email(value),
        ColumnType::Phone => is_valid_phone(value, PhoneShape::Any),
        ColumnType::Url => is_valid_url(value),
        ColumnType::Text => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowline_model::Value;

    fn rows_of(column: &str, values: &[&str]) -> Vec<RawRow> {
        values
            .iter()
            .map(|v| {
                let mut row = RawRow::new();
                row.insert(column.to_string(), Value::Text((*v).to_string()));
                row
            })
            .collect()
    }

    fn detect(values: &[&str]) -> ColumnType {
        let rows = rows_of("c", values);
        analyze(&rows, &["c".to_string()]).columns[0].detected_type
    }

    #[test]
    fn all_integers_detect_integer() {
        assert_eq!(detect(&["3", "4", "5"]), ColumnType::Integer);
    }

    #[test]
    fn one_malformed_value_downgrades_to_text() {
        assert_eq!(detect(&["3", "4", "abc"]), ColumnType::Text);
    }

    #[test]
    fn mixed_integer_and_decimal_detects_number() {
        assert_eq!(detect(&["3", "4.5"]), ColumnType::Number);
    }

    #[test]
    fn boolean_vocabulary_detects_boolean() {
        assert_eq!(detect(&["yes", "NO", "y"]), ColumnType::Boolean);
    }

    #[test]
    fn iso_and_us_dates_detect_date() {
        assert_eq!(detect(&["2026-01-15", "2026-02-01"]), ColumnType::Date);
        assert_eq!(detect(&["01/15/2026", "02/01/2026"]), ColumnType::Date);
    }

    #[test]
    fn emails_phones_urls() {
        assert_eq!(detect(&["a@example.com", "b@example.org"]), ColumnType::Email);
        assert_eq!(detect(&["555-123-4567", "(555) 987-6543"]), ColumnType::Phone);
        assert_eq!(
            detect(&["https://example.com", "http://example.org/x"]),
            ColumnType::Url
        );
    }

    #[test]
    fn all_null_column_is_text() {
        let rows = rows_of("c", &["", "  ", ""]);
        let report = analyze(&rows, &["c".to_string()]);
        assert_eq!(report.columns[0].detected_type, ColumnType::Text);
        assert_eq!(report.columns[0].null_count, 3);
        assert_eq!(report.columns[0].unique_count, 0);
    }

    #[test]
    fn counts_and_samples() {
        let values: Vec<String> = (0..25).map(|i| format!("v{}", i % 5)).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let rows = rows_of("c", &refs);
        let report = analyze(&rows, &["c".to_string()]);
        let preview = &report.columns[0];

        assert_eq!(report.total_rows, 25);
        assert_eq!(preview.unique_count, 5);
        assert_eq!(preview.sample_values.len(), SAMPLE_VALUE_CAP);
        assert_eq!(preview.sample_values[0], Value::Text("v0".to_string()));
    }

    #[test]
    fn missing_key_counts_as_null() {
        let mut with_value = RawRow::new();
        with_value.insert("c".to_string(), Value::Text("x".to_string()));
        let rows = vec![with_value, RawRow::new()];
        let report = analyze(&rows, &["c".to_string()]);
        assert_eq!(report.columns[0].null_count, 1);
    }

    #[test]
    fn analysis_is_deterministic() {
        let rows = rows_of("c", &["3", "4", "abc", ""]);
        let first = analyze(&rows, &["c".to_string()]);
        let second = analyze(&rows, &["c".to_string()]);
        assert_eq!(first, second);
    }

    #[test]
    fn default_configs_cover_every_column() {
        let rows = rows_of("age", &["30", "41"]);
        let report = analyze(&rows, &["age".to_string()]);
        let configs = default_configs(&report);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].column_type, ColumnType::Integer);
        assert!(configs[0].included);
    }
}

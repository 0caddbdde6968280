//! Typed parsing and format-validation predicates.
//!
//! Shared between the rule engine and the column analyzer so that type
//! inference and cleaning agree on what counts as a valid integer, number,
//! date, email, phone, or URL.

use chrono::{NaiveDate, NaiveDateTime};

/// Date formats the analyzer accepts when probing a column for date-ness.
///
/// Cleaning always uses the format declared on the `parse_date` rule; this
/// list only drives detection.
pub const DETECTION_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
];

/// Parse a trimmed value as i64. Conservative: no separators allowed.
pub fn parse_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

/// Parse a trimmed value as f64.
pub fn parse_float(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Strip currency symbols, thousands separators, and whitespace before a
/// numeric parse. `"$1,234.50"` becomes `"1234.50"`.
pub fn strip_numeric_noise(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',') && !c.is_whitespace())
        .collect()
}

/// Lenient numeric parse used by `parse_number`: integers stay integral.
pub fn parse_number_lenient(value: &str) -> Option<NumericValue> {
    let stripped = strip_numeric_noise(value);
    if stripped.is_empty() {
        return None;
    }
    if let Ok(i) = stripped.parse::<i64>() {
        return Some(NumericValue::Int(i));
    }
    stripped.parse::<f64>().ok().map(NumericValue::Float)
}

/// Result of a lenient numeric parse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericValue {
    Int(i64),
    Float(f64),
}

/// Parse a percentage like `"12%"` or `"12.5"`. The trailing percent sign
/// is optional; `as_decimal` divides the result by 100.
pub fn parse_percentage(value: &str, as_decimal: bool) -> Option<f64> {
    let trimmed = value.trim();
    let body = trimmed.strip_suffix('%').unwrap_or(trimmed);
    let parsed = strip_numeric_noise(body).parse::<f64>().ok()?;
    Some(if as_decimal { parsed / 100.0 } else { parsed })
}

/// Whether the value matches the boolean vocabulary used for detection.
pub fn looks_boolean(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "y" | "n"
    )
}

/// Parse a date or datetime against an explicit strftime format, returning
/// the canonical ISO 8601 rendering.
pub fn parse_date_with_format(value: &str, format: &str) -> Option<String> {
    let trimmed = value.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
        return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    NaiveDate::parse_from_str(trimmed, format)
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Whether the value parses as a date under any detection format.
pub fn looks_date(value: &str) -> bool {
    DETECTION_DATE_FORMATS
        .iter()
        .any(|f| parse_date_with_format(value, f).is_some())
}

/// Structural email check: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.contains(char::is_whitespace) {
        return false;
    }
    let mut parts = trimmed.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // Domain needs at least one dot with non-empty labels on both sides.
    if domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// Phone shapes accepted by [`is_valid_phone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneShape {
    /// 7-15 digits after stripping separators.
    Any,
    /// Leading `+` followed by 8-15 digits.
    E164,
    /// Exactly 10 digits after stripping separators.
    National,
}

/// Structural phone check against the requested shape.
///
/// Separators (spaces, dots, hyphens, parentheses) are ignored; any other
/// non-digit character is rejected.
pub fn is_valid_phone(value: &str, shape: PhoneShape) -> bool {
    let trimmed = value.trim();
    let has_plus = trimmed.starts_with('+');
    let body = if has_plus { &trimmed[1..] } else { trimmed };

    let mut digits = 0usize;
    for c in body.chars() {
        if c.is_ascii_digit() {
            digits += 1;
        } else if !matches!(c, ' ' | '.' | '-' | '(' | ')') {
            return false;
        }
    }

    match shape {
        PhoneShape::Any => (7..=15).contains(&digits),
        PhoneShape::E164 => has_plus && (8..=15).contains(&digits),
        PhoneShape::National => !has_plus && digits == 10,
    }
}

/// Structural URL check: http(s) scheme with a non-empty host.
pub fn is_valid_url(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.contains(char::is_whitespace) {
        return false;
    }
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    let Some(rest) = rest else {
        return false;
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    !host.is_empty() && !host.starts_with('.')
}

//! Cleaning rule definitions.
//!
//! A cleaning rule is one atomic, ordered transformation or validation
//! applied to a single column's value during row processing. The set is
//! closed: the engine dispatches exhaustively over this enum, so adding a
//! variant forces every match site to handle it.

use serde::{Deserialize, Serialize};

/// What to do when a `validate_*` rule rejects a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidPolicy {
    /// Drop the whole row.
    Skip,
    /// Replace the value with null and continue.
    Null,
    /// Keep the original invalid value, record a row-level error, continue.
    Error,
}

/// Accepted shapes for `validate_phone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneFormat {
    /// Any plausible phone number: 7-15 digits after stripping separators.
    #[default]
    Any,
    /// E.164: leading `+` followed by 8-15 digits.
    E164,
    /// National: exactly 10 digits after stripping separators.
    National,
}

/// One cleaning rule, tagged on the wire by its `type` field.
///
/// Rules are pure functions of the current value. `skip_if_empty` is the
/// only rule that exists purely to signal a row drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CleaningRule {
    Trim,
    CollapseWhitespace,
    Lowercase,
    Uppercase,
    TitleCase,
    NullToDefault {
        default_value: String,
    },
    EmptyToNull,
    SkipIfEmpty,
    ParseNumber,
    ParseBoolean {
        true_values: Vec<String>,
        false_values: Vec<String>,
    },
    ParseDate {
        /// strftime-style format the raw value must match, e.g. `%m/%d/%Y`.
        format: String,
    },
    ParsePercentage {
        /// When set, "12%" becomes 0.12 instead of 12.
        as_decimal: bool,
    },
    ValidateEmail {
        on_invalid: InvalidPolicy,
    },
    ValidatePhone {
        #[serde(default)]
        format: PhoneFormat,
        on_invalid: InvalidPolicy,
    },
    ValidateUrl {
        on_invalid: InvalidPolicy,
    },
    FindReplace {
        find: String,
        replace: String,
    },
}

impl CleaningRule {
    /// Wire-format tag for this rule, as used in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            CleaningRule::Trim => "trim",
            CleaningRule::CollapseWhitespace => "collapse_whitespace",
            CleaningRule::Lowercase => "lowercase",
            CleaningRule::Uppercase => "uppercase",
            CleaningRule::TitleCase => "title_case",
            CleaningRule::NullToDefault { .. } => "null_to_default",
            CleaningRule::EmptyToNull => "empty_to_null",
            CleaningRule::SkipIfEmpty => "skip_if_empty",
            CleaningRule::ParseNumber => "parse_number",
            CleaningRule::ParseBoolean { .. } => "parse_boolean",
            CleaningRule::ParseDate { .. } => "parse_date",
            CleaningRule::ParsePercentage { .. } => "parse_percentage",
            CleaningRule::ValidateEmail { .. } => "validate_email",
            CleaningRule::ValidatePhone { .. } => "validate_phone",
            CleaningRule::ValidateUrl { .. } => "validate_url",
            CleaningRule::FindReplace { .. } => "find_replace",
        }
    }
}

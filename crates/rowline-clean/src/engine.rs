//! The cleaning rule engine.
//!
//! Applies each included column's ordered rule list to one raw row,
//! threading the output of each rule into the next, and produces either a
//! cleaned row or a row-drop signal. Rule application is a pure function of
//! the current value; control flow is explicit through [`RuleOutcome`]
//! rather than errors, so short-circuits stay testable.

use rowline_model::{CleaningRule, ColumnConfig, InvalidPolicy, PhoneFormat, RawRow, Value};

use crate::parsers::{
    NumericValue, PhoneShape, is_valid_email, is_valid_phone, is_valid_url,
    parse_date_with_format, parse_number_lenient, parse_percentage,
};

/// Three-way result of applying one rule to one value.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// Keep processing with this (possibly transformed) value.
    Continue(Value),
    /// Exclude the whole row from output. Not a failure.
    Drop,
    /// Keep processing with this value, but record a row-level error.
    Flag { value: Value, message: String },
}

/// One recorded field-level problem on a kept row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub column: String,
    pub message: String,
}

/// Outcome of cleaning one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowResult {
    /// Row kept, possibly with field errors. Keyed by source column name.
    Cleaned { row: RawRow, errors: Vec<RowError> },
    /// Row intentionally excluded by `skip_if_empty` or `on_invalid: skip`.
    Dropped,
}

impl RowResult {
    pub fn is_dropped(&self) -> bool {
        matches!(self, RowResult::Dropped)
    }
}

/// Apply a single rule to a value.
pub fn apply_rule(rule: &CleaningRule, value: Value) -> RuleOutcome {
    match rule {
        CleaningRule::Trim => RuleOutcome::Continue(map_text(value, |s| s.trim().to_string())),
        CleaningRule::CollapseWhitespace => RuleOutcome::Continue(map_text(value, |s| {
            s.split_whitespace().collect::<Vec<_>>().join(" ")
        })),
        CleaningRule::Lowercase => RuleOutcome::Continue(map_text(value, str::to_lowercase)),
        CleaningRule::Uppercase => RuleOutcome::Continue(map_text(value, str::to_uppercase)),
        CleaningRule::TitleCase => RuleOutcome::Continue(map_text(value, title_case)),
        CleaningRule::NullToDefault { default_value } => {
            if value.is_empty() {
                RuleOutcome::Continue(Value::Text(default_value.clone()))
            } else {
                RuleOutcome::Continue(value)
            }
        }
        CleaningRule::EmptyToNull => {
            if value.is_empty() {
                RuleOutcome::Continue(Value::Null)
            } else {
                RuleOutcome::Continue(value)
            }
        }
        CleaningRule::SkipIfEmpty => {
            if value.is_empty() {
                RuleOutcome::Drop
            } else {
                RuleOutcome::Continue(value)
            }
        }
        CleaningRule::ParseNumber => {
            if value.is_empty() {
                return RuleOutcome::Continue(Value::Null);
            }
            match parse_number_lenient(&value.as_text()) {
                Some(NumericValue::Int(i)) => RuleOutcome::Continue(Value::Int(i)),
                Some(NumericValue::Float(f)) => RuleOutcome::Continue(Value::Float(f)),
                None => RuleOutcome::Flag {
                    value: Value::Null,
                    message: format!("not a number: '{}'", value.as_text()),
                },
            }
        }
        CleaningRule::ParseBoolean {
            true_values,
            false_values,
        } => {
            if value.is_empty() {
                return RuleOutcome::Continue(Value::Null);
            }
            let folded = value.as_text().trim().to_lowercase();
            if true_values.iter().any(|v| v.to_lowercase() == folded) {
                RuleOutcome::Continue(Value::Bool(true))
            } else if false_values.iter().any(|v| v.to_lowercase() == folded) {
                RuleOutcome::Continue(Value::Bool(false))
            } else {
                RuleOutcome::Flag {
                    value: Value::Null,
                    message: format!("unrecognized boolean: '{}'", value.as_text()),
                }
            }
        }
        CleaningRule::ParseDate { format } => {
            if value.is_empty() {
                return RuleOutcome::Continue(Value::Null);
            }
            match parse_date_with_format(&value.as_text(), format) {
                Some(iso) => RuleOutcome::Continue(Value::Text(iso)),
                None => RuleOutcome::Flag {
                    value: Value::Null,
                    message: format!(
                        "date '{}' does not match format '{format}'",
                        value.as_text()
                    ),
                },
            }
        }
        CleaningRule::ParsePercentage { as_decimal } => {
            if value.is_empty() {
                return RuleOutcome::Continue(Value::Null);
            }
            match parse_percentage(&value.as_text(), *as_decimal) {
                Some(f) => RuleOutcome::Continue(Value::Float(f)),
                None => RuleOutcome::Flag {
                    value: Value::Null,
                    message: format!("not a percentage: '{}'", value.as_text()),
                },
            }
        }
        CleaningRule::ValidateEmail { on_invalid } => {
            validate(value, *on_invalid, "invalid email", |s| is_valid_email(s))
        }
        CleaningRule::ValidatePhone { format, on_invalid } => {
            let shape = phone_shape(*format);
            validate(value, *on_invalid, "invalid phone number", move |s| {
                is_valid_phone(s, shape)
            })
        }
        CleaningRule::ValidateUrl { on_invalid } => {
            validate(value, *on_invalid, "invalid URL", |s| is_valid_url(s))
        }
        CleaningRule::FindReplace { find, replace } => {
            if find.is_empty() {
                return RuleOutcome::Continue(value);
            }
            RuleOutcome::Continue(map_text(value, |s| s.replace(find.as_str(), replace)))
        }
    }
}

/// Clean one raw row against the column configuration list.
///
/// Included columns are processed in list order; each column's rules run in
/// list order over that column's current value. A drop signal stops the row
/// immediately; downstream columns are not evaluated. Excluded columns are
/// omitted from the output.
pub fn clean_row(columns: &[ColumnConfig], raw: &RawRow) -> RowResult {
    let mut cleaned = RawRow::new();
    let mut errors = Vec::new();

    for column in columns.iter().filter(|c| c.included) {
        let mut value = raw.get(&column.source_name).cloned().unwrap_or(Value::Null);

        for rule in &column.cleaning_rules {
            match apply_rule(rule, value) {
                RuleOutcome::Continue(next) => value = next,
                RuleOutcome::Drop => {
                    tracing::trace!(
                        column = %column.source_name,
                        rule = rule.kind(),
                        "row dropped"
                    );
                    return RowResult::Dropped;
                }
                RuleOutcome::Flag {
                    value: next,
                    message,
                } => {
                    errors.push(RowError {
                        column: column.source_name.clone(),
                        message,
                    });
                    value = next;
                }
            }
        }

        cleaned.insert(column.source_name.clone(), value);
    }

    RowResult::Cleaned {
        row: cleaned,
        errors,
    }
}

/// Running tallies across one batch of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanTally {
    /// Rows emitted, clean or flagged.
    pub processed: u64,
    /// Rows emitted with at least one field error.
    pub flagged: u64,
    /// Rows excluded by a drop signal.
    pub dropped: u64,
}

impl CleanTally {
    pub fn record(&mut self, result: &RowResult) {
        match result {
            RowResult::Cleaned { errors, .. } => {
                self.processed += 1;
                if !errors.is_empty() {
                    self.flagged += 1;
                }
            }
            RowResult::Dropped => self.dropped += 1,
        }
    }

    pub fn merge(&mut self, other: CleanTally) {
        self.processed += other.processed;
        self.flagged += other.flagged;
        self.dropped += other.dropped;
    }
}

/// Stringify-and-transform helper for the pure string rules. Null passes
/// through untouched so downstream null handling still sees a null.
fn map_text(value: Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::Null => Value::Null,
        other => Value::Text(f(&other.as_text())),
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

fn phone_shape(format: PhoneFormat) -> PhoneShape {
    match format {
        PhoneFormat::Any => PhoneShape::Any,
        PhoneFormat::E164 => PhoneShape::E164,
        PhoneFormat::National => PhoneShape::National,
    }
}

/// Shared `validate_*` handling: empty values pass through unvalidated
/// (requiredness is a mapping-time concern), otherwise `on_invalid` decides.
fn validate(
    value: Value,
    on_invalid: InvalidPolicy,
    what: &str,
    check: impl Fn(&str) -> bool,
) -> RuleOutcome {
    if value.is_empty() {
        return RuleOutcome::Continue(value);
    }
    let text = value.as_text();
    if check(&text) {
        return RuleOutcome::Continue(value);
    }
    match on_invalid {
        InvalidPolicy::Skip => RuleOutcome::Drop,
        InvalidPolicy::Null => RuleOutcome::Continue(Value::Null),
        InvalidPolicy::Error => RuleOutcome::Flag {
            value,
            message: format!("{what}: '{text}'"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn column(name: &str, rules: Vec<CleaningRule>) -> ColumnConfig {
        ColumnConfig {
            source_name: name.to_string(),
            target_name: name.to_string(),
            column_type: rowline_model::ColumnType::Text,
            included: true,
            cleaning_rules: rules,
        }
    }

    #[test]
    fn trim_and_collapse() {
        assert_eq!(
            apply_rule(&CleaningRule::Trim, text("  a b  ")),
            RuleOutcome::Continue(text("a b"))
        );
        assert_eq!(
            apply_rule(&CleaningRule::CollapseWhitespace, text(" a   b\tc ")),
            RuleOutcome::Continue(text("a b c"))
        );
    }

    #[test]
    fn string_transforms_pass_null_through() {
        // A null must stay null so that null_to_default after an uppercase
        // still fires; see the rule-order tests.
        assert_eq!(
            apply_rule(&CleaningRule::Uppercase, Value::Null),
            RuleOutcome::Continue(Value::Null)
        );
    }

    #[test]
    fn string_transforms_stringify_scalars() {
        assert_eq!(
            apply_rule(&CleaningRule::Uppercase, Value::Bool(true)),
            RuleOutcome::Continue(text("TRUE"))
        );
    }

    #[test]
    fn title_case_words() {
        assert_eq!(
            apply_rule(&CleaningRule::TitleCase, text("jOHN  o'BRIEN")),
            RuleOutcome::Continue(text("John  O'brien"))
        );
    }

    #[test]
    fn null_to_default_only_fires_on_empty() {
        let rule = CleaningRule::NullToDefault {
            default_value: "N/A".to_string(),
        };
        assert_eq!(apply_rule(&rule, Value::Null), RuleOutcome::Continue(text("N/A")));
        assert_eq!(apply_rule(&rule, text("  ")), RuleOutcome::Continue(text("N/A")));
        assert_eq!(apply_rule(&rule, text("x")), RuleOutcome::Continue(text("x")));
    }

    #[test]
    fn empty_to_null() {
        assert_eq!(
            apply_rule(&CleaningRule::EmptyToNull, text("")),
            RuleOutcome::Continue(Value::Null)
        );
        assert_eq!(
            apply_rule(&CleaningRule::EmptyToNull, text("x")),
            RuleOutcome::Continue(text("x"))
        );
    }

    #[test]
    fn parse_number_outcomes() {
        assert_eq!(
            apply_rule(&CleaningRule::ParseNumber, text("$1,250")),
            RuleOutcome::Continue(Value::Int(1250))
        );
        assert_eq!(
            apply_rule(&CleaningRule::ParseNumber, text("3.14")),
            RuleOutcome::Continue(Value::Float(3.14))
        );
        // Parse failure keeps the row: null value plus a recorded error.
        match apply_rule(&CleaningRule::ParseNumber, text("abc")) {
            RuleOutcome::Flag { value, .. } => assert_eq!(value, Value::Null),
            other => panic!("expected Flag, got {other:?}"),
        }
        // Nothing to parse is not an error.
        assert_eq!(
            apply_rule(&CleaningRule::ParseNumber, Value::Null),
            RuleOutcome::Continue(Value::Null)
        );
    }

    #[test]
    fn parse_boolean_case_folds() {
        let rule = CleaningRule::ParseBoolean {
            true_values: vec!["yes".to_string(), "Y".to_string()],
            false_values: vec!["no".to_string(), "N".to_string()],
        };
        assert_eq!(apply_rule(&rule, text("YES")), RuleOutcome::Continue(Value::Bool(true)));
        assert_eq!(apply_rule(&rule, text("n")), RuleOutcome::Continue(Value::Bool(false)));
        assert!(matches!(
            apply_rule(&rule, text("maybe")),
            RuleOutcome::Flag { value: Value::Null, .. }
        ));
    }

    #[test]
    fn validate_email_policies() {
        let keep = CleaningRule::ValidateEmail {
            on_invalid: InvalidPolicy::Error,
        };
        match apply_rule(&keep, text("not-an-email")) {
            // error policy keeps the original invalid value
            RuleOutcome::Flag { value, .. } => assert_eq!(value, text("not-an-email")),
            other => panic!("expected Flag, got {other:?}"),
        }

        let null = CleaningRule::ValidateEmail {
            on_invalid: InvalidPolicy::Null,
        };
        assert_eq!(
            apply_rule(&null, text("not-an-email")),
            RuleOutcome::Continue(Value::Null)
        );

        let skip = CleaningRule::ValidateEmail {
            on_invalid: InvalidPolicy::Skip,
        };
        assert_eq!(apply_rule(&skip, text("not-an-email")), RuleOutcome::Drop);
        // Empty values are not validated; requiredness belongs to mapping.
        assert_eq!(apply_rule(&skip, Value::Null), RuleOutcome::Continue(Value::Null));
    }

    #[test]
    fn find_replace_replaces_all() {
        let rule = CleaningRule::FindReplace {
            find: "-".to_string(),
            replace: "".to_string(),
        };
        assert_eq!(
            apply_rule(&rule, text("555-123-4567")),
            RuleOutcome::Continue(text("5551234567"))
        );
    }

    #[test]
    fn clean_row_threads_rules_in_order() {
        let columns = vec![column(
            "name",
            vec![CleaningRule::Trim, CleaningRule::Lowercase],
        )];
        let mut raw = RawRow::new();
        raw.insert("name".to_string(), text("  ABC  "));

        match clean_row(&columns, &raw) {
            RowResult::Cleaned { row, errors } => {
                assert_eq!(row["name"], text("abc"));
                assert!(errors.is_empty());
            }
            RowResult::Dropped => panic!("row should be kept"),
        }
    }

    #[test]
    fn skip_if_empty_short_circuits_before_downstream_columns() {
        let columns = vec![
            column(
                "email",
                vec![
                    CleaningRule::SkipIfEmpty,
                    CleaningRule::NullToDefault {
                        default_value: "N/A".to_string(),
                    },
                ],
            ),
            column("name", vec![CleaningRule::Trim]),
        ];
        let mut raw = RawRow::new();
        raw.insert("email".to_string(), text(""));
        raw.insert("name".to_string(), text(" x "));

        // The empty value must drop the row before null_to_default runs.
        assert_eq!(clean_row(&columns, &raw), RowResult::Dropped);
    }

    #[test]
    fn rule_order_diverges_for_null_to_default_and_uppercase() {
        let default_then_upper = vec![column(
            "c",
            vec![
                CleaningRule::NullToDefault {
                    default_value: "x".to_string(),
                },
                CleaningRule::Uppercase,
            ],
        )];
        let upper_then_default = vec![column(
            "c",
            vec![
                CleaningRule::Uppercase,
                CleaningRule::NullToDefault {
                    default_value: "x".to_string(),
                },
            ],
        )];
        let mut raw = RawRow::new();
        raw.insert("c".to_string(), Value::Null);

        let first = clean_row(&default_then_upper, &raw);
        let second = clean_row(&upper_then_default, &raw);
        match (first, second) {
            (
                RowResult::Cleaned { row: a, .. },
                RowResult::Cleaned { row: b, .. },
            ) => {
                assert_eq!(a["c"], text("X"));
                assert_eq!(b["c"], text("x"));
            }
            other => panic!("both rows should be kept: {other:?}"),
        }
    }

    #[test]
    fn excluded_columns_are_omitted() {
        let mut excluded = column("internal", vec![]);
        excluded.included = false;
        let columns = vec![column("name", vec![]), excluded];

        let mut raw = RawRow::new();
        raw.insert("name".to_string(), text("a"));
        raw.insert("internal".to_string(), text("secret"));

        match clean_row(&columns, &raw) {
            RowResult::Cleaned { row, .. } => {
                assert!(row.contains_key("name"));
                assert!(!row.contains_key("internal"));
            }
            RowResult::Dropped => panic!("row should be kept"),
        }
    }

    #[test]
    fn missing_source_column_is_null() {
        let columns = vec![column(
            "missing",
            vec![CleaningRule::NullToDefault {
                default_value: "filled".to_string(),
            }],
        )];
        let raw = RawRow::new();
        match clean_row(&columns, &raw) {
            RowResult::Cleaned { row, .. } => assert_eq!(row["missing"], text("filled")),
            RowResult::Dropped => panic!("row should be kept"),
        }
    }

    #[test]
    fn tally_counts_processed_flagged_dropped() {
        let mut tally = CleanTally::default();
        tally.record(&RowResult::Cleaned {
            row: RawRow::new(),
            errors: vec![],
        });
        tally.record(&RowResult::Cleaned {
            row: RawRow::new(),
            errors: vec![RowError {
                column: "c".to_string(),
                message: "bad".to_string(),
            }],
        });
        tally.record(&RowResult::Dropped);

        assert_eq!(tally.processed, 2);
        assert_eq!(tally.flagged, 1);
        assert_eq!(tally.dropped, 1);
    }
}

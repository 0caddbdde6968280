//! Field mapping: binding cleaned rows to a destination schema.
//!
//! Validation happens at configuration time, before a sync is allowed to
//! run; a missing required mapping is a configuration error, never a silent
//! sync-time surprise. Applying mappings at sync time is a plain copy:
//! cleaned source values land under their destination field names, and
//! columns the user left unmapped are dropped from the output.

use std::collections::BTreeMap;
use std::fmt;

use rowline_model::{ColumnConfig, DestinationSchema, FieldMapping, RawRow, Value};

/// A destination-shaped record: destination field name to cleaned value.
pub type MappedRecord = BTreeMap<String, Value>;

/// One configuration problem found while validating mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingIssue {
    /// A required destination field has no mapping.
    MissingRequired { field: String },
    /// A mapping names a destination field the schema does not declare.
    UnknownTargetField { field: String },
    /// A mapping points at a source column that is not configured.
    UnknownSourceColumn { field: String, column: String },
    /// A mapping points at a column the user excluded from the import.
    ExcludedSourceColumn { field: String, column: String },
    /// Two mappings claim the same destination field.
    DuplicateTarget { field: String },
}

impl fmt::Display for MappingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "required field '{field}' has no mapping")
            }
            Self::UnknownTargetField { field } => {
                write!(f, "mapping targets unknown field '{field}'")
            }
            Self::UnknownSourceColumn { field, column } => {
                write!(f, "mapping for '{field}' uses unknown column '{column}'")
            }
            Self::ExcludedSourceColumn { field, column } => {
                write!(f, "mapping for '{field}' uses excluded column '{column}'")
            }
            Self::DuplicateTarget { field } => {
                write!(f, "field '{field}' is mapped more than once")
            }
        }
    }
}

/// Validate mappings against the destination schema and column configs.
///
/// Returns every problem found, in a stable order: per-mapping issues first
/// (in mapping order), then missing required fields (in schema order). An
/// empty result means the configuration is allowed to sync.
pub fn validate_mappings(
    schema: &DestinationSchema,
    mappings: &[FieldMapping],
    columns: &[ColumnConfig],
) -> Vec<MappingIssue> {
    let mut issues = Vec::new();
    let mut seen_targets: BTreeMap<&str, usize> = BTreeMap::new();

    for mapping in mappings {
        *seen_targets.entry(mapping.target_field.as_str()).or_insert(0) += 1;

        if schema.field(&mapping.target_field).is_none() {
            issues.push(MappingIssue::UnknownTargetField {
                field: mapping.target_field.clone(),
            });
        }

        match columns.iter().find(|c| c.source_name == mapping.source_column) {
            None => issues.push(MappingIssue::UnknownSourceColumn {
                field: mapping.target_field.clone(),
                column: mapping.source_column.clone(),
            }),
            Some(column) if !column.included => issues.push(MappingIssue::ExcludedSourceColumn {
                field: mapping.target_field.clone(),
                column: mapping.source_column.clone(),
            }),
            Some(_) => {}
        }
    }

    for (field, count) in &seen_targets {
        if *count > 1 {
            issues.push(MappingIssue::DuplicateTarget {
                field: (*field).to_string(),
            });
        }
    }

    for field in schema.required_fields() {
        if !mappings.iter().any(|m| m.target_field == field.name) {
            issues.push(MappingIssue::MissingRequired {
                field: field.name.clone(),
            });
        }
    }

    issues
}

/// Copy cleaned source values into a destination-shaped record.
///
/// A mapping whose source column is absent from the cleaned row produces a
/// null destination value. Unmapped columns do not appear in the output.
pub fn apply_mappings(mappings: &[FieldMapping], row: &RawRow) -> MappedRecord {
    let mut record = MappedRecord::new();
    for mapping in mappings {
        let value = row.get(&mapping.source_column).cloned().unwrap_or(Value::Null);
        record.insert(mapping.target_field.clone(), value);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowline_model::{ColumnType, SchemaField};

    fn schema() -> DestinationSchema {
        DestinationSchema {
            name: "member".to_string(),
            fields: vec![
                SchemaField {
                    name: "email".to_string(),
                    required: true,
                },
                SchemaField {
                    name: "first_name".to_string(),
                    required: false,
                },
            ],
        }
    }

    fn column(name: &str, included: bool) -> ColumnConfig {
        ColumnConfig {
            source_name: name.to_string(),
            target_name: name.to_string(),
            column_type: ColumnType::Text,
            included,
            cleaning_rules: Vec::new(),
        }
    }

    fn mapping(target: &str, source: &str) -> FieldMapping {
        FieldMapping {
            target_field: target.to_string(),
            source_column: source.to_string(),
            required: target == "email",
        }
    }

    #[test]
    fn valid_configuration_has_no_issues() {
        let issues = validate_mappings(
            &schema(),
            &[mapping("email", "EMAIL"), mapping("first_name", "FNAME")],
            &[column("EMAIL", true), column("FNAME", true)],
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn missing_required_field_is_reported() {
        let issues = validate_mappings(
            &schema(),
            &[mapping("first_name", "FNAME")],
            &[column("FNAME", true)],
        );
        assert!(issues.contains(&MappingIssue::MissingRequired {
            field: "email".to_string()
        }));
    }

    #[test]
    fn excluded_and_unknown_columns_are_reported() {
        let issues = validate_mappings(
            &schema(),
            &[mapping("email", "EMAIL"), mapping("first_name", "GHOST")],
            &[column("EMAIL", false)],
        );
        assert!(issues.contains(&MappingIssue::ExcludedSourceColumn {
            field: "email".to_string(),
            column: "EMAIL".to_string(),
        }));
        assert!(issues.contains(&MappingIssue::UnknownSourceColumn {
            field: "first_name".to_string(),
            column: "GHOST".to_string(),
        }));
    }

    #[test]
    fn duplicate_target_is_reported() {
        let issues = validate_mappings(
            &schema(),
            &[mapping("email", "A"), mapping("email", "B")],
            &[column("A", true), column("B", true)],
        );
        assert!(issues.contains(&MappingIssue::DuplicateTarget {
            field: "email".to_string()
        }));
    }

    #[test]
    fn unknown_target_field_is_reported() {
        let issues = validate_mappings(
            &schema(),
            &[mapping("email", "A"), mapping("nickname", "A")],
            &[column("A", true)],
        );
        assert!(issues.contains(&MappingIssue::UnknownTargetField {
            field: "nickname".to_string()
        }));
    }

    #[test]
    fn apply_copies_mapped_and_drops_unmapped() {
        let mut row = RawRow::new();
        row.insert("EMAIL".to_string(), Value::Text("a@example.com".to_string()));
        row.insert("NOTES".to_string(), Value::Text("unmapped".to_string()));

        let record = apply_mappings(&[mapping("email", "EMAIL")], &row);
        assert_eq!(
            record.get("email"),
            Some(&Value::Text("a@example.com".to_string()))
        );
        assert!(!record.contains_key("NOTES"));
    }

    #[test]
    fn absent_source_column_maps_to_null() {
        let record = apply_mappings(&[mapping("email", "EMAIL")], &RawRow::new());
        assert_eq!(record.get("email"), Some(&Value::Null));
    }
}

//! Field mappings binding source columns to the destination schema.

use serde::{Deserialize, Serialize};

/// One field of a destination schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub required: bool,
}

/// The fixed set of fields a data source's rows are mapped into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationSchema {
    pub name: String,
    pub fields: Vec<SchemaField>,
}

impl DestinationSchema {
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter().filter(|f| f.required)
    }
}

/// Binding from one destination field to exactly one source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub target_field: String,
    pub source_column: String,
    pub required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member_schema() -> DestinationSchema {
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

    #[test]
    fn required_fields_filters() {
        let schema = member_schema();
        let required: Vec<&str> = schema.required_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(required, vec!["email"]);
    }

    #[test]
    fn mapping_round_trips() {
        let mapping = FieldMapping {
            target_field: "email".to_string(),
            source_column: "EMAIL_ADDR".to_string(),
            required: true,
        };
        let json = serde_json::to_string(&mapping).unwrap();
        let round: FieldMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(round, mapping);
    }
}

//! Column-level configuration and analysis results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::rules::CleaningRule;
use crate::value::Value;

/// Semantic type inferred for a source column.
///
/// Inference is conservative: a column only gets a specific type when every
/// non-null sampled value parses under it, with `Text` as the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Number,
    Boolean,
    Date,
    Email,
    Phone,
    Url,
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Email => "email",
            ColumnType::Phone => "phone",
            ColumnType::Url => "url",
            ColumnType::Text => "text",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "integer" => Ok(ColumnType::Integer),
            "number" => Ok(ColumnType::Number),
            "boolean" => Ok(ColumnType::Boolean),
            "date" => Ok(ColumnType::Date),
            "email" => Ok(ColumnType::Email),
            "phone" => Ok(ColumnType::Phone),
            "url" => Ok(ColumnType::Url),
            "text" => Ok(ColumnType::Text),
            other => Err(ModelError::UnknownColumnType(other.to_string())),
        }
    }
}

/// Immutable snapshot of one column produced by the analyzer.
///
/// Seeded from a bounded sample of rows; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPreview {
    pub name: String,
    pub detected_type: ColumnType,
    /// First K non-null raw values observed in the sample.
    pub sample_values: Vec<Value>,
    /// Count of distinct non-null stringified values.
    pub unique_count: usize,
    /// Count of null or empty-string values.
    pub null_count: usize,
}

/// Analyzer output for a whole sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub columns: Vec<ColumnPreview>,
    pub total_rows: usize,
}

impl AnalysisReport {
    pub fn column(&self, name: &str) -> Option<&ColumnPreview> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Per-column configuration owned by a data source.
///
/// `source_name` is stable and identifies the column across runs. The order
/// of `cleaning_rules` is semantically significant and must be preserved on
/// edit and serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub source_name: String,
    pub target_name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub included: bool,
    #[serde(default)]
    pub cleaning_rules: Vec<CleaningRule>,
}

impl ColumnConfig {
    /// Seed a default configuration from an analyzer preview: included,
    /// target name equal to the source name, no cleaning rules.
    pub fn from_preview(preview: &ColumnPreview) -> Self {
        Self {
            source_name: preview.name.clone(),
            target_name: preview.name.clone(),
            column_type: preview.detected_type,
            included: true,
            cleaning_rules: Vec::new(),
        }
    }
}

pub mod engine;
pub mod parsers;

pub use engine::{CleanTally, RowError, RowResult, RuleOutcome, apply_rule, clean_row};

pub mod analyzer;

pub use analyzer::{SAMPLE_VALUE_CAP, analyze, default_configs};

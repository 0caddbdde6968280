//! CLI library components for Rowline.

pub mod logging;
pub mod pipeline;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown column type: {0}")]
    UnknownColumnType(String),
    #[error("unknown frequency: {0}")]
    UnknownFrequency(String),
    #[error("invalid sync status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;

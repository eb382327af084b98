//! Error types for document model operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocModelError {
    #[error("Document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid node path: {0}")]
    InvalidPath(String),

    #[error("Type registered twice: {0}")]
    DuplicateType(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DocModelError>;

//! Error types for editing operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Structural mismatch at {path}: property '{property}' holds {found}")]
    StructuralMismatch {
        path: String,
        property: String,
        found: &'static str,
    },

    #[error("The document root cannot be deleted")]
    RootNotDeletable,

    #[error("Document model error: {0}")]
    DocModel(#[from] doc_model::DocModelError),
}

pub type Result<T> = std::result::Result<T, EditError>;

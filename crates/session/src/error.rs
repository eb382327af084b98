//! Error types for editor sessions

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Edit error: {0}")]
    Edit(#[from] edit_engine::EditError),

    #[error("Document model error: {0}")]
    DocModel(#[from] doc_model::DocModelError),

    #[error("Command {command} is not available at {path}")]
    CommandUnavailable { command: String, path: String },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("{uri} was not loaded, refusing to save: {reason}")]
    NotLoaded { uri: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SessionError>;

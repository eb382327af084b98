//! Document serialization

use crate::Result;
use doc_model::Document;

/// Serialize a document to pretty-printed JSON
pub fn serialize(document: &Document) -> Result<String> {
    Ok(document.to_pretty_string()?)
}

/// Deserialize a document from JSON text
pub fn deserialize(json: &str) -> Result<Document> {
    Ok(Document::parse(json)?)
}

//! Labels and icons for tree nodes and add commands

use crate::{Document, Node, TypeRegistry};

/// Icon used for nodes whose type has no registered icon
pub const UNKNOWN_ICON: &str = "codicon codicon-question";

/// Human-readable label of a node: its `name` field if present, otherwise
/// the display name of its type
pub fn node_label(registry: &TypeRegistry, document: &Document, node: &Node) -> Option<String> {
    let data = node.data(document)?;
    if let Some(name) = data.get("name").and_then(|name| name.as_str()) {
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    node.type_id
        .as_deref()
        .map(|type_id| registry.display_name_of(type_id).to_string())
}

/// Icon class for a type, falling back to [`UNKNOWN_ICON`]
pub fn type_icon<'a>(registry: &'a TypeRegistry, type_id: Option<&str>) -> &'a str {
    type_id
        .and_then(|type_id| registry.icon_of(type_id))
        .unwrap_or(UNKNOWN_ICON)
}

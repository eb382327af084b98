//! Lazy projection of a JSON document onto tree nodes

use crate::document::child_of;
use crate::{ChildKey, Document, Node, NodePath, TypeRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Snapshot handed to tree views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeData {
    /// Set when the document could not be loaded
    pub error: bool,
    pub data: Value,
}

/// Derives [`Node`]s from document positions on demand.
///
/// Nothing is materialized up front: a node is built when a path is
/// resolved or when a parent's children are requested.
#[derive(Debug, Clone)]
pub struct TreeProjection {
    registry: Arc<TypeRegistry>,
    editor_id: String,
}

impl TreeProjection {
    pub fn new(registry: Arc<TypeRegistry>, editor_id: impl Into<String>) -> Self {
        Self {
            registry,
            editor_id: editor_id.into(),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn editor_id(&self) -> &str {
        &self.editor_id
    }

    /// Type identifier carried by a fragment's discriminator field
    pub fn type_of(&self, data: &Value) -> Option<String> {
        data.get(self.registry.discriminator())
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn make_node(&self, data: &Value, path: NodePath) -> Node {
        Node {
            type_id: self.type_of(data),
            path,
            editor_id: self.editor_id.clone(),
        }
    }

    /// Node for the document root
    pub fn project(&self, document: &Document) -> Node {
        self.make_node(document.root(), NodePath::root())
    }

    /// Node at `path`, if the path resolves in the current document
    pub fn node_at(&self, document: &Document, path: &NodePath) -> Option<Node> {
        let data = document.get(path)?;
        Some(self.make_node(data, path.clone()))
    }

    /// Child of `node` stored at `property[key]`
    pub fn locate(
        &self,
        document: &Document,
        node: &Node,
        property: &str,
        key: &ChildKey,
    ) -> Option<Node> {
        let collection = node.data(document)?.get(property)?;
        let data = child_of(collection, key)?;
        Some(self.make_node(data, node.path.child(property, key.clone())))
    }

    /// Enclosing node, recomputed from the path
    pub fn parent(&self, document: &Document, node: &Node) -> Option<Node> {
        self.node_at(document, &node.path.parent()?)
    }

    /// Direct children of `node` across the collection properties its type
    /// declares. Untyped and unknown nodes have no children.
    pub fn children(&self, document: &Document, node: &Node) -> Vec<Node> {
        let Some(type_id) = node.type_id.as_deref() else {
            return Vec::new();
        };
        let Some(data) = node.data(document) else {
            return Vec::new();
        };
        let properties = self.registry.collection_properties(type_id);
        if properties.is_empty() && !self.registry.contains(type_id) {
            tracing::debug!(type_id, path = %node.path, "unknown type, no children projected");
        }

        let mut children = Vec::new();
        for property in properties {
            for (key, child) in collection_entries(data.get(property), &node.path, property) {
                children.push(self.make_node(child, node.path.child(property, key)));
            }
        }
        children
    }

    /// Depth-first walk over the whole tree, building nodes as it goes
    pub fn walk<'a>(&'a self, document: &'a Document) -> Walk<'a> {
        Walk {
            projection: self,
            document,
            stack: vec![(0, self.project(document))],
        }
    }

    /// Snapshot of the document for tree views
    pub fn snapshot(&self, document: &Document, error: bool) -> TreeData {
        TreeData {
            error,
            data: document.root().clone(),
        }
    }
}

/// Entries of a collection property. Arrays are addressed by index, other
/// objects by key; a missing or null property is an empty collection.
fn collection_entries<'a>(
    collection: Option<&'a Value>,
    parent: &NodePath,
    property: &str,
) -> Vec<(ChildKey, &'a Value)> {
    match collection {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| (ChildKey::Index(index), item))
            .collect(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, item)| (ChildKey::Key(key.clone()), item))
            .collect(),
        Some(other) => {
            tracing::warn!(
                path = %parent,
                property,
                "collection property holds a {} value, ignoring",
                value_kind(other)
            );
            Vec::new()
        }
    }
}

/// Short name of a JSON value's shape, for diagnostics
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Iterator returned by [`TreeProjection::walk`], yielding `(depth, node)`
pub struct Walk<'a> {
    projection: &'a TreeProjection,
    document: &'a Document,
    stack: Vec<(usize, Node)>,
}

impl Iterator for Walk<'_> {
    type Item = (usize, Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        let children = self.projection.children(self.document, &node);
        self.stack
            .extend(children.into_iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}

//! The JSON document edited by a session

use crate::{ChildKey, NodePath, Result};
use serde_json::Value;

/// An arbitrary JSON value plus a version counter for tracking changes.
///
/// The document is the single owner of the data; tree nodes only locate
/// positions inside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    root: Value,
    /// Incremented on every successful mutation
    version: u64,
}

impl Document {
    pub fn new(root: Value) -> Self {
        Self { root, version: 0 }
    }

    /// Parse document text
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    /// Pretty-printed JSON text of the document
    pub fn to_pretty_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Value {
        &mut self.root
    }

    /// Replace the whole document content
    pub fn set_root(&mut self, root: Value) {
        self.root = root;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Record that the content changed
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// The fragment at `path`, if the path still resolves
    pub fn get(&self, path: &NodePath) -> Option<&Value> {
        path.segments().iter().try_fold(&self.root, |current, segment| {
            child_of(current.get(segment.property.as_str())?, &segment.key)
        })
    }

    pub fn get_mut(&mut self, path: &NodePath) -> Option<&mut Value> {
        let mut current = &mut self.root;
        for segment in path.segments() {
            let collection = current.get_mut(segment.property.as_str())?;
            current = child_of_mut(collection, &segment.key)?;
        }
        Some(current)
    }
}

/// Entry of a collection value addressed by `key`
pub(crate) fn child_of<'a>(collection: &'a Value, key: &ChildKey) -> Option<&'a Value> {
    match (collection, key) {
        (Value::Array(items), ChildKey::Index(index)) => items.get(*index),
        (Value::Object(map), ChildKey::Key(key)) => map.get(key),
        _ => None,
    }
}

fn child_of_mut<'a>(collection: &'a mut Value, key: &ChildKey) -> Option<&'a mut Value> {
    match (collection, key) {
        (Value::Array(items), ChildKey::Index(index)) => items.get_mut(*index),
        (Value::Object(map), ChildKey::Key(key)) => map.get_mut(key),
        _ => None,
    }
}

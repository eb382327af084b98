//! Node paths and the node view over a document position

use crate::{DocModelError, Document, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Position of a child within its containing collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildKey {
    /// Index into an array collection
    Index(usize),
    /// Key of a keyed-object collection
    Key(String),
}

impl ChildKey {
    pub fn as_index(&self) -> Option<usize> {
        match self {
            ChildKey::Index(index) => Some(*index),
            ChildKey::Key(_) => None,
        }
    }
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildKey::Index(index) => write!(f, "{}", index),
            ChildKey::Key(key) => f.write_str(key),
        }
    }
}

impl From<usize> for ChildKey {
    fn from(index: usize) -> Self {
        ChildKey::Index(index)
    }
}

impl From<&str> for ChildKey {
    fn from(key: &str) -> Self {
        ChildKey::Key(key.to_string())
    }
}

/// One step from a parent to a child: the collection property and the
/// child's position inside it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    pub property: String,
    pub key: ChildKey,
}

impl PathSegment {
    pub fn new(property: impl Into<String>, key: impl Into<ChildKey>) -> Self {
        Self {
            property: property.into(),
            key: key.into(),
        }
    }
}

/// Location of a node relative to the document root.
///
/// The root is the empty path. Paths are rendered as `/prop/key/prop/key`,
/// escaping `~` and `/` inside names the way JSON Pointer does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Path of a child of this node
    pub fn child(&self, property: impl Into<String>, key: ChildKey) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::new(property, key));
        Self(segments)
    }

    /// Path of an array element below this node
    pub fn with_index(&self, property: impl Into<String>, index: usize) -> Self {
        self.child(property, ChildKey::Index(index))
    }

    /// Path of a keyed-object entry below this node
    pub fn with_key(&self, property: impl Into<String>, key: impl Into<String>) -> Self {
        self.child(property, ChildKey::Key(key.into()))
    }

    /// Path of the enclosing node, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.0.split_last()?;
        Some(Self(init.to_vec()))
    }

    /// True if `self` equals `other` or lies beneath it
    pub fn starts_with(&self, other: &NodePath) -> bool {
        self.0.len() >= other.0.len() && self.0[..other.0.len()] == other.0[..]
    }

    /// Map a path recorded before `deleted` was removed to where the same
    /// data lives afterwards.
    ///
    /// Later siblings in an array shift down by one. The deleted node and
    /// its descendants have no position anymore and map to `None`.
    pub fn rebase_after_delete(&self, deleted: &NodePath) -> Option<NodePath> {
        if self.starts_with(deleted) {
            return None;
        }
        let Some(deleted_last) = deleted.last() else {
            return Some(self.clone());
        };
        let ChildKey::Index(deleted_index) = &deleted_last.key else {
            return Some(self.clone());
        };
        let at = deleted.depth() - 1;
        if self.depth() <= at || self.0[..at] != deleted.0[..at] {
            return Some(self.clone());
        }
        let segment = &self.0[at];
        match &segment.key {
            ChildKey::Index(index)
                if segment.property == deleted_last.property && index > deleted_index =>
            {
                let mut segments = self.0.clone();
                segments[at].key = ChildKey::Index(index - 1);
                Some(Self(segments))
            }
            _ => Some(self.clone()),
        }
    }

    /// Parse a rendered path, using the document to decide whether each
    /// key addresses an array index or an object key
    pub fn parse(pointer: &str, document: &Document) -> Result<Self> {
        let trimmed = pointer.trim();
        if trimmed.is_empty() || trimmed == "/" {
            return Ok(Self::root());
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Err(DocModelError::InvalidPath(pointer.to_string()));
        };
        let tokens: Vec<String> = rest.split('/').map(unescape).collect();
        if tokens.len() % 2 != 0 {
            return Err(DocModelError::InvalidPath(format!(
                "{} (expected property/key pairs)",
                pointer
            )));
        }

        let mut current = document.root();
        let mut segments = Vec::with_capacity(tokens.len() / 2);
        for pair in tokens.chunks(2) {
            let (property, key) = (&pair[0], &pair[1]);
            let collection = current
                .get(property.as_str())
                .ok_or_else(|| DocModelError::InvalidPath(pointer.to_string()))?;
            let (key, next) = match collection {
                Value::Array(items) => {
                    let index: usize = key
                        .parse()
                        .map_err(|_| DocModelError::InvalidPath(pointer.to_string()))?;
                    (ChildKey::Index(index), items.get(index))
                }
                Value::Object(map) => (ChildKey::Key(key.clone()), map.get(key.as_str())),
                _ => (ChildKey::Key(key.clone()), None),
            };
            current = next.ok_or_else(|| DocModelError::InvalidPath(pointer.to_string()))?;
            segments.push(PathSegment {
                property: property.clone(),
                key,
            });
        }
        Ok(Self(segments))
    }
}

fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(
                f,
                "/{}/{}",
                escape(&segment.property),
                escape(&segment.key.to_string())
            )?;
        }
        Ok(())
    }
}

impl FromIterator<PathSegment> for NodePath {
    fn from_iter<T: IntoIterator<Item = PathSegment>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A view over one position in a document.
///
/// A node does not own or copy the data it describes; [`Node::data`] reads
/// through the path against the current document, so a node can never
/// drift from the document it was projected from. Nodes are rebuilt after
/// every structural change rather than patched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Value of the discriminator field, absent for untyped fragments
    pub type_id: Option<String>,
    pub path: NodePath,
    /// Editor instance that produced this node
    pub editor_id: String,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }

    /// The fragment at this node's position
    pub fn data<'a>(&self, document: &'a Document) -> Option<&'a Value> {
        document.get(&self.path)
    }

    /// Property of the parent's data holding this node's collection
    pub fn containing_property(&self) -> Option<&str> {
        self.path.last().map(|segment| segment.property.as_str())
    }

    /// Position within the containing collection
    pub fn index(&self) -> Option<&ChildKey> {
        self.path.last().map(|segment| &segment.key)
    }

    pub fn parent_path(&self) -> Option<NodePath> {
        self.path.parent()
    }
}

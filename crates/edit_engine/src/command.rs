//! Structural mutations of a JSON document
//!
//! Each mutation validates the target shape before writing anything, so a
//! failed mutation leaves the document exactly as it was.

use crate::{EditError, Result};
use doc_model::{value_kind, ChildKey, ContainerKind, Document, NodePath, TypeRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Which operation produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Replace,
    AddChild,
    DeleteChild,
}

/// What a successful mutation changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub kind: MutationKind,
    /// Root of the subtree views must re-read
    pub subtree_root: NodePath,
    /// Path of a newly inserted child
    pub created: Option<NodePath>,
    /// Path the removed child occupied before removal
    pub removed: Option<NodePath>,
}

/// Trait for all document mutations
pub trait Mutation: std::fmt::Debug + Send + Sync {
    /// Apply this mutation to a document
    fn apply(&self, document: &mut Document, registry: &TypeRegistry) -> Result<MutationOutcome>;

    /// Get a display name for this mutation
    fn display_name(&self) -> &str;
}

fn mismatch(path: &NodePath, property: &str, found: &'static str) -> EditError {
    EditError::StructuralMismatch {
        path: path.to_string(),
        property: property.to_string(),
        found,
    }
}

/// Replace the data at a node's position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceData {
    pub path: NodePath,
    pub data: Value,
}

impl ReplaceData {
    pub fn new(path: NodePath, data: Value) -> Self {
        Self { path, data }
    }
}

impl Mutation for ReplaceData {
    fn apply(&self, document: &mut Document, _registry: &TypeRegistry) -> Result<MutationOutcome> {
        if self.path.is_root() {
            document.set_root(self.data.clone());
        } else {
            let target = document
                .get_mut(&self.path)
                .ok_or_else(|| EditError::NodeNotFound(self.path.to_string()))?;
            *target = self.data.clone();
        }
        Ok(MutationOutcome {
            kind: MutationKind::Replace,
            subtree_root: self.path.clone(),
            created: None,
            removed: None,
        })
    }

    fn display_name(&self) -> &str {
        "Replace Data"
    }
}

/// Append a new child holding only its type identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddChild {
    pub parent: NodePath,
    pub property: String,
    pub child_type: String,
}

impl AddChild {
    pub fn new(parent: NodePath, property: impl Into<String>, child_type: impl Into<String>) -> Self {
        Self {
            parent,
            property: property.into(),
            child_type: child_type.into(),
        }
    }

    /// Shape of the collection the child goes into, checked before writing
    fn target_container(&self, document: &Document, registry: &TypeRegistry) -> Result<ContainerKind> {
        let parent = document
            .get(&self.parent)
            .ok_or_else(|| EditError::NodeNotFound(self.parent.to_string()))?;
        let Value::Object(fields) = parent else {
            return Err(mismatch(&self.parent, &self.property, value_kind(parent)));
        };
        let parent_type = fields.get(registry.discriminator()).and_then(Value::as_str);

        if let Some(parent_type) = parent_type {
            if !registry
                .allowed_children(parent_type, &self.property)
                .contains(self.child_type.as_str())
            {
                tracing::warn!(
                    parent_type,
                    property = %self.property,
                    child_type = %self.child_type,
                    "adding a child type the schema does not declare"
                );
            }
        }

        match fields.get(&self.property) {
            None | Some(Value::Null) => Ok(parent_type
                .and_then(|parent_type| registry.container_kind(parent_type, &self.property))
                .unwrap_or_default()),
            Some(Value::Array(_)) => Ok(ContainerKind::Array),
            Some(Value::Object(_)) => Ok(ContainerKind::Map),
            Some(other) => Err(mismatch(&self.parent, &self.property, value_kind(other))),
        }
    }
}

impl Mutation for AddChild {
    fn apply(&self, document: &mut Document, registry: &TypeRegistry) -> Result<MutationOutcome> {
        let container = self.target_container(document, registry)?;

        let mut fragment = Map::new();
        fragment.insert(
            registry.discriminator().to_string(),
            Value::String(self.child_type.clone()),
        );

        let fields = document
            .get_mut(&self.parent)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| EditError::NodeNotFound(self.parent.to_string()))?;
        let slot = fields.entry(self.property.clone()).or_insert(Value::Null);
        if slot.is_null() {
            *slot = match container {
                ContainerKind::Array => Value::Array(Vec::new()),
                ContainerKind::Map => Value::Object(Map::new()),
            };
        }

        let key = match slot {
            Value::Array(items) => {
                items.push(Value::Object(fragment));
                ChildKey::Index(items.len() - 1)
            }
            Value::Object(entries) => {
                // Keys are never reused, even after the entry is deleted.
                let key = Uuid::new_v4().simple().to_string();
                entries.insert(key.clone(), Value::Object(fragment));
                ChildKey::Key(key)
            }
            other => return Err(mismatch(&self.parent, &self.property, value_kind(other))),
        };

        Ok(MutationOutcome {
            kind: MutationKind::AddChild,
            subtree_root: self.parent.clone(),
            created: Some(self.parent.child(self.property.clone(), key)),
            removed: None,
        })
    }

    fn display_name(&self) -> &str {
        "Add Child"
    }
}

/// Remove a child from its parent's collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteChild {
    pub path: NodePath,
}

impl DeleteChild {
    pub fn new(path: NodePath) -> Self {
        Self { path }
    }
}

impl Mutation for DeleteChild {
    fn apply(&self, document: &mut Document, _registry: &TypeRegistry) -> Result<MutationOutcome> {
        let (Some(parent_path), Some(segment)) = (self.path.parent(), self.path.last()) else {
            return Err(EditError::RootNotDeletable);
        };
        let not_found = || EditError::NodeNotFound(self.path.to_string());

        let parent = document.get_mut(&parent_path).ok_or_else(not_found)?;
        match (parent.get_mut(segment.property.as_str()), &segment.key) {
            (Some(Value::Array(items)), ChildKey::Index(index)) => {
                if *index >= items.len() {
                    return Err(not_found());
                }
                items.remove(*index);
            }
            (Some(Value::Object(entries)), ChildKey::Key(key)) => {
                entries.remove(key).ok_or_else(not_found)?;
            }
            (Some(Value::Array(_)), ChildKey::Key(_)) | (Some(Value::Object(_)), ChildKey::Index(_)) => {
                return Err(not_found());
            }
            (Some(other), _) => {
                return Err(mismatch(&parent_path, &segment.property, value_kind(other)));
            }
            (None, _) => return Err(mismatch(&parent_path, &segment.property, "nothing")),
        }

        Ok(MutationOutcome {
            kind: MutationKind::DeleteChild,
            subtree_root: parent_path,
            created: None,
            removed: Some(self.path.clone()),
        })
    }

    fn display_name(&self) -> &str {
        "Delete Child"
    }
}

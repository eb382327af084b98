//! Type schema registry
//!
//! Maps a type identifier to its display name, form schemas, and the
//! children descriptors that declare which child types each collection
//! property may hold. The registry is immutable once built; lookups for
//! unknown types never fail, they answer "no children".

use crate::{DocModelError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Default name of the property holding a fragment's type identifier
pub const DEFAULT_DISCRIMINATOR: &str = "typeId";

/// Shape of the collection a children property holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// A JSON array addressed by index
    #[default]
    Array,
    /// A JSON object addressed by key
    Map,
}

/// Declares that `property` holds children whose type is one of `children`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildrenDescriptor {
    pub property: String,
    /// Allowed child type identifiers. Redundant entries are tolerated.
    pub children: Vec<String>,
    #[serde(default)]
    pub container: ContainerKind,
}

impl ChildrenDescriptor {
    pub fn new<I, S>(property: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            property: property.into(),
            children: children.into_iter().map(Into::into).collect(),
            container: ContainerKind::Array,
        }
    }

    /// Mark this property as a keyed-object container
    pub fn keyed(mut self) -> Self {
        self.container = ContainerKind::Map;
        self
    }
}

/// Identity and human-readable name of a registered type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub type_id: String,
    pub display_name: String,
}

/// Construction-time description of one type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeEntry {
    pub type_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    /// JSON schema of the type's data, consumed by the form renderer
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub ui_schema: Option<Value>,
    #[serde(default)]
    pub children: Vec<ChildrenDescriptor>,
}

impl TypeEntry {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            display_name: None,
            icon: None,
            schema: None,
            ui_schema: None,
            children: Vec::new(),
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn ui_schema(mut self, ui_schema: Value) -> Self {
        self.ui_schema = Some(ui_schema);
        self
    }

    pub fn children(mut self, descriptor: ChildrenDescriptor) -> Self {
        self.children.push(descriptor);
        self
    }
}

/// Serialized registry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    #[serde(default = "default_discriminator")]
    pub discriminator: String,
    /// Shared schema definitions merged into every per-type schema
    #[serde(default)]
    pub definitions: Option<Value>,
    #[serde(default)]
    pub types: Vec<TypeEntry>,
}

fn default_discriminator() -> String {
    DEFAULT_DISCRIMINATOR.to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            discriminator: default_discriminator(),
            definitions: None,
            types: Vec::new(),
        }
    }
}

/// Immutable lookup structure over registered types
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    discriminator: String,
    definitions: Option<Value>,
    types: BTreeMap<String, TypeEntry>,
}

impl TypeRegistry {
    /// Build a registry from its configuration, rejecting duplicate type ids
    pub fn from_config(config: RegistryConfig) -> Result<Self> {
        let mut types = BTreeMap::new();
        for entry in config.types {
            if types.contains_key(&entry.type_id) {
                return Err(DocModelError::DuplicateType(entry.type_id));
            }
            types.insert(entry.type_id.clone(), entry);
        }
        Ok(Self {
            discriminator: config.discriminator,
            definitions: config.definitions,
            types,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RegistryConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    /// Load a registry configuration file
    pub fn load_sync(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// Property holding each fragment's type identifier
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    /// Registered type ids in sorted order
    pub fn type_ids(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn descriptor(&self, type_id: &str) -> Option<TypeDescriptor> {
        self.types.get(type_id).map(|entry| TypeDescriptor {
            type_id: entry.type_id.clone(),
            display_name: self.display_name_of(type_id).to_string(),
        })
    }

    /// Like [`descriptor`](Self::descriptor) but reports unknown types as errors
    pub fn require(&self, type_id: &str) -> Result<TypeDescriptor> {
        self.descriptor(type_id)
            .ok_or_else(|| DocModelError::UnknownType(type_id.to_string()))
    }

    /// Children descriptors of a type; empty for unknown types
    pub fn children_of(&self, type_id: &str) -> &[ChildrenDescriptor] {
        self.types
            .get(type_id)
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    /// Friendly name of a type, or the id itself when none is registered
    pub fn display_name_of<'a>(&'a self, type_id: &'a str) -> &'a str {
        self.types
            .get(type_id)
            .and_then(|entry| entry.display_name.as_deref())
            .unwrap_or(type_id)
    }

    pub fn icon_of(&self, type_id: &str) -> Option<&str> {
        self.types.get(type_id).and_then(|entry| entry.icon.as_deref())
    }

    /// Union of child types declared for `property` across all descriptors
    pub fn allowed_children(&self, type_id: &str, property: &str) -> BTreeSet<&str> {
        self.children_of(type_id)
            .iter()
            .filter(|desc| desc.property == property)
            .flat_map(|desc| desc.children.iter().map(String::as_str))
            .collect()
    }

    /// Container kind declared for `property`, if the type declares it at all
    pub fn container_kind(&self, type_id: &str, property: &str) -> Option<ContainerKind> {
        let mut kinds = self
            .children_of(type_id)
            .iter()
            .filter(|desc| desc.property == property)
            .map(|desc| desc.container);
        let first = kinds.next()?;
        // Any keyed declaration wins over the default array shape.
        Some(if first == ContainerKind::Map || kinds.any(|k| k == ContainerKind::Map) {
            ContainerKind::Map
        } else {
            first
        })
    }

    /// Collection properties of a type in declaration order, without repeats
    pub fn collection_properties(&self, type_id: &str) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.children_of(type_id)
            .iter()
            .map(|desc| desc.property.as_str())
            .filter(|property| seen.insert(*property))
            .collect()
    }

    /// Schema for the form renderer, with shared definitions merged in
    pub fn schema_for_type(&self, type_id: &str) -> Option<Value> {
        let Some(entry) = self.types.get(type_id) else {
            tracing::warn!("Can't find definition schema for type {}", type_id);
            return None;
        };
        let mut schema = entry.schema.clone()?;
        if let (Some(definitions), Value::Object(map)) = (&self.definitions, &mut schema) {
            map.entry("definitions")
                .or_insert_with(|| definitions.clone());
        }
        Some(schema)
    }

    pub fn ui_schema_for_type(&self, type_id: &str) -> Option<Value> {
        let ui_schema = self
            .types
            .get(type_id)
            .and_then(|entry| entry.ui_schema.clone());
        if ui_schema.is_none() {
            tracing::warn!("Can't find registered ui schema for type {}", type_id);
        }
        ui_schema
    }
}

/// Fluent construction of a [`TypeRegistry`]
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    config: RegistryConfig,
}

impl TypeRegistryBuilder {
    pub fn discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.config.discriminator = discriminator.into();
        self
    }

    pub fn definitions(mut self, definitions: Value) -> Self {
        self.config.definitions = Some(definitions);
        self
    }

    pub fn with_type(mut self, entry: TypeEntry) -> Self {
        self.config.types.push(entry);
        self
    }

    pub fn build(self) -> Result<TypeRegistry> {
        TypeRegistry::from_config(self.config)
    }
}

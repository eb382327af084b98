//! Add-command table derived from the type schema registry
//!
//! One command exists per reachable (parent type, property, child type)
//! triple. Command ids are derived from the triple alone so external menu
//! registries can bind to them idempotently across rebuilds.

use doc_model::TypeRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Prefix shared by all add-command ids
pub const ADD_COMMAND_PREFIX: &str = "json-forms-tree.add";

/// Describes a command that appends a `child_type` child under `property`
/// of a `parent_type` node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddCommandDescriptor {
    pub parent_type: String,
    pub property: String,
    pub child_type: String,
    pub command_id: String,
    pub label: String,
}

/// Deterministic command id for a triple.
///
/// `~` and `.` inside each part are written as `~0` and `~1`, so distinct
/// triples never share an id.
pub fn add_command_id(parent_type: &str, property: &str, child_type: &str) -> String {
    format!(
        "{}.{}.{}.{}",
        ADD_COMMAND_PREFIX,
        escape_id_part(parent_type),
        escape_id_part(property),
        escape_id_part(child_type)
    )
}

fn escape_id_part(part: &str) -> String {
    part.replace('~', "~0").replace('.', "~1")
}

/// Whether `command` applies to a node of type `node_type`.
///
/// The node's type must equal the command's parent type and the command's
/// child type must be allowed in the command's property of that type.
pub fn is_visible(
    registry: &TypeRegistry,
    command: &AddCommandDescriptor,
    node_type: Option<&str>,
) -> bool {
    let Some(node_type) = node_type else {
        return false;
    };
    node_type == command.parent_type
        && registry
            .allowed_children(node_type, &command.property)
            .contains(command.child_type.as_str())
}

/// All add commands of a registry, keyed by command id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTable {
    commands: BTreeMap<String, AddCommandDescriptor>,
}

impl CommandTable {
    /// Build the full table from the registry
    pub fn build(registry: &TypeRegistry) -> Self {
        let mut commands = BTreeMap::new();
        for parent_type in registry.type_ids() {
            // property -> child types, flattened over all descriptors
            let mut per_property: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
            for descriptor in registry.children_of(parent_type) {
                per_property
                    .entry(descriptor.property.as_str())
                    .or_default()
                    .extend(descriptor.children.iter().map(String::as_str));
            }

            for (property, child_types) in per_property {
                for child_type in child_types {
                    let command_id = add_command_id(parent_type, property, child_type);
                    commands.insert(
                        command_id.clone(),
                        AddCommandDescriptor {
                            parent_type: parent_type.to_string(),
                            property: property.to_string(),
                            child_type: child_type.to_string(),
                            command_id,
                            label: registry.display_name_of(child_type).to_string(),
                        },
                    );
                }
            }
        }
        tracing::debug!(commands = commands.len(), "built add-command table");
        Self { commands }
    }

    pub fn get(&self, command_id: &str) -> Option<&AddCommandDescriptor> {
        self.commands.get(command_id)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands in command-id order
    pub fn iter(&self) -> impl Iterator<Item = &AddCommandDescriptor> {
        self.commands.values()
    }

    /// Commands visible for a context node of type `node_type`
    pub fn visible_for<'a>(
        &'a self,
        registry: &'a TypeRegistry,
        node_type: Option<&'a str>,
    ) -> impl Iterator<Item = &'a AddCommandDescriptor> + 'a {
        self.commands
            .values()
            .filter(move |command| is_visible(registry, command, node_type))
    }
}

/// Lazily built, shared command table
#[derive(Debug, Default)]
pub struct CommandTableCache {
    table: Option<Arc<CommandTable>>,
}

impl CommandTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached table, building it on first access
    pub fn get(&mut self, registry: &TypeRegistry) -> Arc<CommandTable> {
        Arc::clone(
            self.table
                .get_or_insert_with(|| Arc::new(CommandTable::build(registry))),
        )
    }

    pub fn is_built(&self) -> bool {
        self.table.is_some()
    }

    /// Drop the cached table; the next access rebuilds it from scratch
    pub fn invalidate(&mut self) {
        self.table = None;
    }
}

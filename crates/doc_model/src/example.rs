//! Example tree model: a `Tree` root holding `Node`s and `Leaf`s.
//!
//! Used as the default registry of the command-line editor and as a
//! fixture in tests.

use crate::{ChildrenDescriptor, Result, TypeEntry, TypeRegistry};
use serde_json::{json, Value};

pub const TREE: &str = "Tree";
pub const NODE: &str = "Node";
pub const LEAF: &str = "Leaf";

fn tree_schema() -> Value {
    json!({
        "title": "Tree",
        "properties": {
            "typeId": { "const": TREE },
            "name": { "type": "string", "minLength": 3, "maxLength": 20 }
        },
        "required": ["name"],
        "additionalProperties": false
    })
}

fn node_schema() -> Value {
    json!({
        "title": "Node",
        "properties": {
            "typeId": { "const": NODE },
            "name": { "type": "string" },
            "weight": { "type": "number" }
        },
        "required": ["name", "weight"],
        "additionalProperties": false
    })
}

fn leaf_schema() -> Value {
    json!({
        "title": "Leaf",
        "type": "object",
        "properties": {
            "typeId": { "const": LEAF },
            "name": { "type": "string" },
            "description": { "type": "string" }
        },
        "required": ["name"],
        "additionalProperties": false
    })
}

fn control(label: &str, property: &str) -> Value {
    json!({ "type": "Control", "label": label, "scope": format!("#/properties/{}", property) })
}

/// Registry of the example model
pub fn example_registry() -> Result<TypeRegistry> {
    let components = [NODE, LEAF];
    TypeRegistry::builder()
        .definitions(json!({
            "tree": tree_schema(),
            "node": node_schema(),
            "leaf": leaf_schema()
        }))
        .with_type(
            TypeEntry::new(TREE)
                .icon("codicon codicon-list-tree")
                .schema(tree_schema())
                .ui_schema(json!({ "type": "VerticalLayout", "elements": [control("Name", "name")] }))
                .children(ChildrenDescriptor::new("children", components)),
        )
        .with_type(
            TypeEntry::new(NODE)
                .icon("codicon codicon-type-hierarchy-sub")
                .schema(node_schema())
                .ui_schema(json!({
                    "type": "HorizontalLayout",
                    "elements": [control("Name", "name"), control("Weight", "weight")]
                }))
                .children(ChildrenDescriptor::new("children", components)),
        )
        .with_type(
            TypeEntry::new(LEAF)
                .icon("codicon codicon-chrome-maximize")
                .schema(leaf_schema())
                .ui_schema(json!({
                    "type": "VerticalLayout",
                    "elements": [control("Name", "name"), control("Description", "description")]
                })),
        )
        .build()
}

/// A small document of the example model
pub fn example_document() -> Value {
    json!({
        "typeId": TREE,
        "name": "Example tree",
        "children": [
            {
                "typeId": NODE,
                "name": "Branch",
                "weight": 2,
                "children": [{ "typeId": LEAF, "name": "Twig" }]
            },
            { "typeId": LEAF, "name": "Acorn", "description": "Fell off early" }
        ]
    })
}

//! Collaborator interfaces for the tree widget and the form renderer

use doc_model::{Node, TreeData};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Renders the tree of the edited document
pub trait TreeView: Send {
    /// Replace the whole tree with a fresh snapshot
    fn set_data(&mut self, snapshot: &TreeData);

    /// Re-read the subtree rooted at `node` after a mutation
    fn update_subtree(&mut self, node: &Node, data: &Value);
}

/// What the form renderer needs to display the selected node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormInput {
    pub data: Value,
    /// Schema of the node's type, with shared definitions merged in
    pub schema: Option<Value>,
    pub ui_schema: Option<Value>,
}

/// Renders a schema-generated form for the selected node
pub trait FormView: Send {
    fn set_input(&mut self, input: FormInput);

    /// Nothing is selected
    fn clear(&mut self);
}

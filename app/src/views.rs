//! Views that report to the log instead of rendering

use doc_model::{Node, TreeData};
use serde_json::Value;
use session::{FormInput, FormView, TreeView};

pub struct LoggingTreeView;

impl TreeView for LoggingTreeView {
    fn set_data(&mut self, snapshot: &TreeData) {
        tracing::debug!(error = snapshot.error, "tree snapshot published");
    }

    fn update_subtree(&mut self, node: &Node, data: &Value) {
        tracing::debug!(path = %node.path, data = %data, "subtree updated");
    }
}

pub struct LoggingFormView;

impl FormView for LoggingFormView {
    fn set_input(&mut self, input: FormInput) {
        tracing::debug!(data = %input.data, has_schema = input.schema.is_some(), "form input");
    }

    fn clear(&mut self) {
        tracing::debug!("form cleared");
    }
}

//! Mutation execution engine

use crate::{AddChild, DeleteChild, EditError, Mutation, MutationOutcome, ReplaceData, Result};
use doc_model::{Document, Node, TreeProjection};
use serde_json::Value;

/// A successful mutation together with the re-projected subtree root
#[derive(Debug, Clone)]
pub struct AppliedMutation {
    pub outcome: MutationOutcome,
    /// Node at `outcome.subtree_root`, projected from the mutated document
    pub subtree_root: Node,
}

/// Applies mutations to a document and re-projects what they touched
#[derive(Debug, Clone)]
pub struct MutationEngine {
    projection: TreeProjection,
}

impl MutationEngine {
    pub fn new(projection: TreeProjection) -> Self {
        Self { projection }
    }

    pub fn projection(&self) -> &TreeProjection {
        &self.projection
    }

    /// Execute a mutation, bumping the document version on success
    pub fn execute(&self, document: &mut Document, mutation: &dyn Mutation) -> Result<AppliedMutation> {
        let outcome = match mutation.apply(document, self.projection.registry()) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("{} failed: {}", mutation.display_name(), e);
                return Err(e);
            }
        };
        document.bump_version();
        tracing::debug!(
            mutation = mutation.display_name(),
            subtree = %outcome.subtree_root,
            version = document.version(),
            "document changed"
        );

        let subtree_root = self
            .projection
            .node_at(document, &outcome.subtree_root)
            .ok_or_else(|| EditError::NodeNotFound(outcome.subtree_root.to_string()))?;
        Ok(AppliedMutation {
            outcome,
            subtree_root,
        })
    }

    /// Replace a node's data. Callers filter out no-op edits beforehand.
    pub fn replace(&self, document: &mut Document, node: &Node, data: Value) -> Result<AppliedMutation> {
        self.execute(document, &ReplaceData::new(node.path.clone(), data))
    }

    pub fn add_child(
        &self,
        document: &mut Document,
        parent: &Node,
        property: &str,
        child_type: &str,
    ) -> Result<AppliedMutation> {
        self.execute(document, &AddChild::new(parent.path.clone(), property, child_type))
    }

    pub fn delete_child(&self, document: &mut Document, node: &Node) -> Result<AppliedMutation> {
        self.execute(document, &DeleteChild::new(node.path.clone()))
    }
}

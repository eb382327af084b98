//! Editor session: one document, its views, and its persistence

use crate::{FormInput, FormView, Result, SessionError, SessionOptions, TreeView};
use doc_model::label::{node_label, type_icon};
use doc_model::{Document, Node, NodePath, TreeProjection, TypeRegistry};
use edit_engine::{
    add_command_id, is_visible, AddCommandDescriptor, AppliedMutation, CommandTable,
    CommandTableCache, EditError, MutationEngine,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use store::{
    serializer, AutosaveAction, AutosaveConfig, AutosaveMachine, AutosaveStatus, Resource,
    ScheduledTask,
};
use tokio::sync::{mpsc, watch};

/// Internal events delivered by timers and background saves
#[derive(Debug)]
pub(crate) enum SessionEvent {
    FormDebounceElapsed(u64),
    AutosaveElapsed(u64),
    SaveFinished {
        revision: u64,
        result: store::Result<()>,
    },
}

/// A form edit waiting for the debounce period to pass
#[derive(Debug, Clone)]
struct PendingFormEdit {
    /// Node that was selected when the edit was reported
    target: NodePath,
    data: Value,
}

/// A single editor over one document.
///
/// The session is one logical actor: every method takes `&mut self`, and
/// timer expiries and save completions are queued as events that the owner
/// drains through [`EditorSession::process_next_event`] or
/// [`EditorSession::run`](crate::EditorSession::run).
pub struct EditorSession<R: Resource + 'static> {
    resource: Arc<R>,
    engine: MutationEngine,
    commands: CommandTableCache,
    document: Document,
    load_error: Option<String>,
    selection: Option<NodePath>,
    pending_form_edit: Option<PendingFormEdit>,
    form_generation: u64,
    form_debounce: Duration,
    form_timer: ScheduledTask,
    autosave: AutosaveMachine,
    autosave_timer: ScheduledTask,
    tree_view: Box<dyn TreeView>,
    form_view: Box<dyn FormView>,
    dirty_tx: watch::Sender<bool>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl<R: Resource + 'static> EditorSession<R> {
    /// Create a session and load the document from `resource`.
    ///
    /// A document that cannot be read or parsed still opens: the tree view
    /// receives an error snapshot and [`load_error`](Self::load_error) is set.
    pub async fn open(
        resource: Arc<R>,
        registry: Arc<TypeRegistry>,
        tree_view: Box<dyn TreeView>,
        form_view: Box<dyn FormView>,
        options: SessionOptions,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (dirty_tx, _) = watch::channel(false);
        let mut session = Self {
            resource,
            engine: MutationEngine::new(TreeProjection::new(registry, options.editor_id)),
            commands: CommandTableCache::new(),
            document: Document::default(),
            load_error: None,
            selection: None,
            pending_form_edit: None,
            form_generation: 0,
            form_debounce: options.form_debounce,
            form_timer: ScheduledTask::new("form-debounce"),
            autosave: AutosaveMachine::new(options.autosave),
            autosave_timer: ScheduledTask::new("autosave"),
            tree_view,
            form_view,
            dirty_tx,
            events_tx,
            events_rx,
        };
        session.load().await;
        session
    }

    /// Read the resource again, discarding in-memory edits
    pub async fn revert(&mut self) {
        tracing::info!("Reverting {}", self.resource.uri());
        self.load().await;
    }

    async fn load(&mut self) {
        self.form_timer.cancel();
        self.pending_form_edit = None;

        let loaded = match self.resource.read().await {
            Ok(text) => serializer::deserialize(&text),
            Err(e) => Err(e),
        };
        let root = match loaded {
            Ok(mut document) => {
                self.load_error = None;
                std::mem::take(document.root_mut())
            }
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", self.resource.uri(), e);
                self.load_error = Some(e.to_string());
                Value::Null
            }
        };
        // Keep revisions increasing across reloads so an in-flight save of
        // the old content can never mark the reloaded document clean.
        self.document.set_root(root);
        self.document.bump_version();

        self.selection = None;
        self.form_view.clear();
        let action = self.autosave.reset(self.document.version());
        self.apply_autosave_action(action);

        let snapshot = self
            .engine
            .projection()
            .snapshot(&self.document, self.load_error.is_some());
        self.tree_view.set_data(&snapshot);
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        self.engine.projection().registry()
    }

    pub fn projection(&self) -> &TreeProjection {
        self.engine.projection()
    }

    /// Why the last load failed, if it did
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn uri(&self) -> String {
        self.resource.uri()
    }

    pub fn root(&self) -> Node {
        self.engine.projection().project(&self.document)
    }

    /// Resolve a path string such as `/children/0` against the document
    pub fn resolve(&self, pointer: &str) -> Result<Node> {
        let path = NodePath::parse(pointer, &self.document)?;
        self.node_at(&path)
    }

    fn node_at(&self, path: &NodePath) -> Result<Node> {
        self.engine
            .projection()
            .node_at(&self.document, path)
            .ok_or_else(|| EditError::NodeNotFound(path.to_string()).into())
    }

    pub fn children(&self, node: &Node) -> Vec<Node> {
        self.engine.projection().children(&self.document, node)
    }

    pub fn label_for(&self, node: &Node) -> Option<String> {
        node_label(self.registry(), &self.document, node)
    }

    pub fn icon_for(&self, node: &Node) -> &str {
        type_icon(self.registry(), node.type_id.as_deref())
    }

    /// Currently selected node
    pub fn selection(&self) -> Option<Node> {
        let path = self.selection.as_ref()?;
        self.engine.projection().node_at(&self.document, path)
    }

    /// Receiver notified whenever the dirty flag flips
    pub fn dirty_watch(&self) -> watch::Receiver<bool> {
        self.dirty_tx.subscribe()
    }

    pub fn is_dirty(&self) -> bool {
        self.autosave.is_dirty()
    }

    pub fn autosave_status(&self) -> AutosaveStatus {
        self.autosave.status()
    }

    /// All add commands of the registry, built on first use
    pub fn command_table(&mut self) -> Arc<CommandTable> {
        self.commands.get(self.engine.projection().registry())
    }

    /// Add commands applicable to `node`
    pub fn visible_commands(&mut self, node: &Node) -> Vec<AddCommandDescriptor> {
        let table = self.command_table();
        let registry = self.engine.projection().registry();
        let visible = table
            .visible_for(registry, node.type_id.as_deref())
            .cloned()
            .collect();
        visible
    }

    /// Make `path` the current node and show it in the form.
    ///
    /// A pending form edit is applied to the previous selection first.
    pub fn select(&mut self, path: &NodePath) -> Result<Node> {
        self.flush_form_edit();
        let node = self.node_at(path)?;
        self.selection = Some(node.path.clone());
        self.publish_form();
        Ok(node)
    }

    pub fn deselect(&mut self) {
        self.flush_form_edit();
        self.selection = None;
        self.form_view.clear();
    }

    fn publish_form(&mut self) {
        let Some(node) = self.selection() else {
            self.form_view.clear();
            return;
        };
        let Some(data) = node.data(&self.document) else {
            self.form_view.clear();
            return;
        };
        let registry = self.engine.projection().registry();
        let input = FormInput {
            data: data.clone(),
            schema: node
                .type_id
                .as_deref()
                .and_then(|type_id| registry.schema_for_type(type_id)),
            ui_schema: node
                .type_id
                .as_deref()
                .and_then(|type_id| registry.ui_schema_for_type(type_id)),
        };
        self.form_view.set_input(input);
    }

    /// The form reported new data for the selected node
    pub fn form_changed(&mut self, data: Value) {
        let Some(target) = self.selection.clone() else {
            tracing::debug!("form edit without selection ignored");
            return;
        };
        self.pending_form_edit = Some(PendingFormEdit { target, data });
        self.form_generation += 1;
        self.form_timer.schedule(
            self.form_debounce,
            self.events_tx.clone(),
            SessionEvent::FormDebounceElapsed(self.form_generation),
        );
    }

    /// Apply the pending form edit now. Returns whether the document changed.
    pub fn flush_form_edit(&mut self) -> bool {
        self.form_timer.cancel();
        let Some(edit) = self.pending_form_edit.take() else {
            return false;
        };
        let node = match self.node_at(&edit.target) {
            Ok(node) => node,
            Err(e) => {
                tracing::warn!("Dropping form edit: {}", e);
                return false;
            }
        };
        if node.data(&self.document) == Some(&edit.data) {
            tracing::trace!(path = %edit.target, "form edit unchanged, skipping replace");
            return false;
        }
        match self.engine.replace(&mut self.document, &node, edit.data) {
            Ok(applied) => {
                self.after_mutation(&applied, false);
                true
            }
            Err(_) => false,
        }
    }

    /// Append a `child_type` child under `property` of the node at `parent`.
    ///
    /// Only children offered by a visible add command are accepted.
    pub fn request_add(
        &mut self,
        parent: &NodePath,
        property: &str,
        child_type: &str,
    ) -> Result<Node> {
        self.flush_form_edit();
        let node = self.node_at(parent)?;
        let command_id = add_command_id(
            node.type_id.as_deref().unwrap_or_default(),
            property,
            child_type,
        );
        let table = self.command_table();
        let visible = table
            .get(&command_id)
            .is_some_and(|command| is_visible(self.registry(), command, node.type_id.as_deref()));
        if !visible {
            return Err(SessionError::CommandUnavailable {
                command: command_id,
                path: parent.to_string(),
            });
        }

        let applied = self
            .engine
            .add_child(&mut self.document, &node, property, child_type)?;
        self.after_mutation(&applied, true);

        let created = applied
            .outcome
            .created
            .as_ref()
            .ok_or_else(|| EditError::NodeNotFound(parent.to_string()))?;
        self.node_at(created)
    }

    /// Run an add command against the node at `target`
    pub fn execute_command(&mut self, command_id: &str, target: &NodePath) -> Result<Node> {
        let table = self.command_table();
        let command = table
            .get(command_id)
            .ok_or_else(|| SessionError::UnknownCommand(command_id.to_string()))?;
        self.request_add(target, &command.property, &command.child_type)
    }

    /// Delete the node at `path`. The selection follows its node when
    /// later siblings shift, and is cleared if it was inside the deleted
    /// subtree.
    pub fn request_delete(&mut self, path: &NodePath) -> Result<()> {
        self.flush_form_edit();
        let node = self.node_at(path)?;
        let applied = self.engine.delete_child(&mut self.document, &node)?;

        if let Some(selection) = self.selection.take() {
            self.selection = selection.rebase_after_delete(path);
            if self.selection.is_none() {
                tracing::debug!(path = %selection, "selected node deleted");
                self.form_view.clear();
            }
        }
        self.after_mutation(&applied, true);
        Ok(())
    }

    fn after_mutation(&mut self, applied: &AppliedMutation, refresh_form: bool) {
        if let Some(data) = applied.subtree_root.data(&self.document) {
            self.tree_view.update_subtree(&applied.subtree_root, data);
        }
        let affects_selection = self
            .selection
            .as_ref()
            .is_some_and(|selection| selection.starts_with(&applied.outcome.subtree_root));
        if refresh_form && affects_selection {
            self.publish_form();
        }
        let action = self.autosave.record_mutation(self.document.version());
        self.apply_autosave_action(action);
    }

    pub fn set_autosave_config(&mut self, config: AutosaveConfig) {
        let action = self.autosave.set_config(config);
        self.apply_autosave_action(action);
    }

    /// The editor lost focus
    pub fn focus_lost(&mut self) {
        self.flush_form_edit();
        let action = self.autosave.focus_lost();
        self.apply_autosave_action(action);
    }

    fn apply_autosave_action(&mut self, action: AutosaveAction) {
        match action {
            AutosaveAction::None => {}
            AutosaveAction::ArmTimer { generation, delay } => {
                self.autosave_timer.schedule(
                    delay,
                    self.events_tx.clone(),
                    SessionEvent::AutosaveElapsed(generation),
                );
            }
            AutosaveAction::CancelTimer => self.autosave_timer.cancel(),
            AutosaveAction::StartSave => {
                self.autosave_timer.cancel();
                match &self.load_error {
                    // Never overwrite content that failed to load.
                    Some(reason) => {
                        let reason = format!("document not loaded: {}", reason);
                        self.autosave.save_failed(reason);
                    }
                    None => self.start_background_save(),
                }
            }
        }
        self.publish_dirty();
    }

    fn publish_dirty(&self) {
        let dirty = self.autosave.is_dirty();
        self.dirty_tx.send_if_modified(|current| {
            if *current == dirty {
                false
            } else {
                *current = dirty;
                true
            }
        });
    }

    /// Serialize the document and write it from a spawned task
    fn start_background_save(&mut self) {
        let text = match serializer::serialize(&self.document) {
            Ok(text) => text,
            Err(e) => {
                self.autosave.save_failed(e.to_string());
                return;
            }
        };
        let revision = self.autosave.begin_save();
        tracing::debug!(revision, uri = %self.resource.uri(), "autosaving");

        let resource = Arc::clone(&self.resource);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = resource.write(text).await;
            // The session may have been closed meanwhile.
            let _ = events.send(SessionEvent::SaveFinished { revision, result });
        });
    }

    /// Save now, bypassing the autosave timer.
    ///
    /// While another save is in flight the request is deferred and runs as
    /// soon as that save completes. A session whose document failed to
    /// load refuses to save until a [`revert`](Self::revert) succeeds.
    pub async fn save(&mut self) -> Result<()> {
        self.flush_form_edit();
        if let Some(reason) = &self.load_error {
            return Err(SessionError::NotLoaded {
                uri: self.resource.uri(),
                reason: reason.clone(),
            });
        }
        if self.autosave.request_save() != AutosaveAction::StartSave {
            tracing::debug!("save in flight, explicit save deferred");
            return Ok(());
        }
        self.autosave_timer.cancel();

        let text = serializer::serialize(&self.document)?;
        let revision = self.autosave.begin_save();
        self.publish_dirty();

        let result = self.resource.write(text).await;
        let outcome = self.finish_save(revision, result);
        outcome.map_err(SessionError::from)
    }

    fn finish_save(&mut self, revision: u64, result: store::Result<()>) -> store::Result<()> {
        let (action, result) = match result {
            Ok(()) => {
                tracing::info!(revision, "Saved {}", self.resource.uri());
                (self.autosave.save_succeeded(revision), Ok(()))
            }
            Err(e) => (self.autosave.save_failed(e.to_string()), Err(e)),
        };
        self.apply_autosave_action(action);
        result
    }

    /// Wait for the next timer or save event and handle it
    pub async fn process_next_event(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    pub(crate) async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    pub(crate) fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::FormDebounceElapsed(generation) => {
                if generation == self.form_generation {
                    self.flush_form_edit();
                }
            }
            SessionEvent::AutosaveElapsed(generation) => {
                let action = self.autosave.timer_elapsed(generation);
                self.apply_autosave_action(action);
            }
            SessionEvent::SaveFinished { revision, result } => {
                // Errors are recorded in the autosave status.
                let _ = self.finish_save(revision, result);
            }
        }
    }

    /// Tear the session down. Pending timers are aborted and a save still in
    /// flight completes without touching the session.
    pub fn close(mut self) {
        tracing::debug!(uri = %self.resource.uri(), dirty = self.is_dirty(), "closing session");
        self.form_timer.cancel();
        self.autosave_timer.cancel();
    }
}

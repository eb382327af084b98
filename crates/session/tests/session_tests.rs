//! Integration tests for editor sessions
//! Tests form-edit debouncing, autosave timing, save failures, selection
//! tracking across structural edits, and the command-driven event loop.
//!
//! Timing tests run on a paused tokio clock so delays are exact and the
//! tests do not sleep in real time.

use doc_model::example::example_registry;
use doc_model::{NodePath, TreeData};
use serde_json::{json, Value};
use session::{
    EditorSession, FormInput, FormView, SessionCommand, SessionError, SessionOptions, TreeView,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use store::{AutosaveConfig, AutosaveMode, FileResource, Resource, SaveState, StoreError};
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Resource recording every successful write with the time it happened
#[derive(Clone, Default)]
struct RecordingResource {
    contents: Arc<Mutex<String>>,
    writes: Arc<Mutex<Vec<(Instant, String)>>>,
    failing: Arc<AtomicBool>,
    write_delay: Duration,
}

impl RecordingResource {
    fn new(contents: &str) -> Self {
        Self {
            contents: Arc::new(Mutex::new(contents.to_string())),
            ..Default::default()
        }
    }

    fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    fn set_contents(&self, contents: &str) {
        *self.contents.lock().unwrap() = contents.to_string();
    }

    fn raw(&self) -> String {
        self.contents.lock().unwrap().clone()
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    fn writes(&self) -> Vec<(Instant, String)> {
        self.writes.lock().unwrap().clone()
    }

    fn stored(&self) -> Value {
        let text = self.contents.lock().unwrap().clone();
        serde_json::from_str(&text).unwrap()
    }
}

impl Resource for RecordingResource {
    fn uri(&self) -> String {
        "memory://recording".to_string()
    }

    async fn read(&self) -> store::Result<String> {
        let contents = self.contents.lock().unwrap().clone();
        Ok(contents)
    }

    async fn write(&self, contents: String) -> store::Result<()> {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only resource",
            )));
        }
        self.writes
            .lock()
            .unwrap()
            .push((Instant::now(), contents.clone()));
        *self.contents.lock().unwrap() = contents;
        Ok(())
    }
}

/// Everything the views were told, in order
#[derive(Debug, Clone, PartialEq)]
enum ViewEvent {
    Tree(TreeData),
    Subtree(String, Value),
    Form(FormInput),
    FormCleared,
}

#[derive(Clone, Default)]
struct ViewLog(Arc<Mutex<Vec<ViewEvent>>>);

impl ViewLog {
    fn push(&self, event: ViewEvent) {
        self.0.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<ViewEvent> {
        self.0.lock().unwrap().clone()
    }

    fn last(&self) -> Option<ViewEvent> {
        self.0.lock().unwrap().last().cloned()
    }

    fn last_form_input(&self) -> Option<FormInput> {
        self.events().into_iter().rev().find_map(|event| match event {
            ViewEvent::Form(input) => Some(input),
            _ => None,
        })
    }

    fn subtree_updates(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ViewEvent::Subtree(..)))
            .count()
    }
}

struct LogTreeView(ViewLog);

impl TreeView for LogTreeView {
    fn set_data(&mut self, snapshot: &TreeData) {
        self.0.push(ViewEvent::Tree(snapshot.clone()));
    }

    fn update_subtree(&mut self, node: &doc_model::Node, data: &Value) {
        self.0.push(ViewEvent::Subtree(node.path.to_string(), data.clone()));
    }
}

struct LogFormView(ViewLog);

impl FormView for LogFormView {
    fn set_input(&mut self, input: FormInput) {
        self.0.push(ViewEvent::Form(input));
    }

    fn clear(&mut self) {
        self.0.push(ViewEvent::FormCleared);
    }
}

async fn open_with(
    resource: RecordingResource,
    options: SessionOptions,
) -> (EditorSession<RecordingResource>, ViewLog) {
    let log = ViewLog::default();
    let session = EditorSession::open(
        Arc::new(resource),
        Arc::new(example_registry().unwrap()),
        Box::new(LogTreeView(log.clone())),
        Box::new(LogFormView(log.clone())),
        options,
    )
    .await;
    (session, log)
}

async fn open(
    document: Value,
    options: SessionOptions,
) -> (EditorSession<RecordingResource>, RecordingResource, ViewLog) {
    let resource = RecordingResource::new(&document.to_string());
    let (session, log) = open_with(resource.clone(), options).await;
    (session, resource, log)
}

fn empty_tree() -> Value {
    json!({ "typeId": "Tree", "children": [] })
}

fn three_leaves() -> Value {
    json!({
        "typeId": "Tree",
        "children": [
            { "typeId": "Leaf", "name": "a" },
            { "typeId": "Leaf", "name": "b" },
            { "typeId": "Leaf", "name": "c" }
        ]
    })
}

fn child(index: usize) -> NodePath {
    NodePath::root().with_index("children", index)
}

fn autosave_after(delay_ms: u64) -> SessionOptions {
    SessionOptions::default().with_autosave(AutosaveConfig::after_delay(delay_ms))
}

/// Assert that no timer or save event arrives within `window`
async fn assert_quiet(session: &mut EditorSession<RecordingResource>, window: Duration) {
    let next = tokio::time::timeout(window, session.process_next_event()).await;
    assert!(next.is_err(), "unexpected session event");
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test]
async fn test_open_publishes_snapshot() {
    let (session, _resource, log) = open(empty_tree(), SessionOptions::default()).await;

    assert_eq!(
        log.events(),
        vec![
            ViewEvent::FormCleared,
            ViewEvent::Tree(TreeData {
                error: false,
                data: empty_tree()
            }),
        ]
    );
    assert!(!session.is_dirty());
    assert!(session.load_error().is_none());
    assert_eq!(session.root().type_id.as_deref(), Some("Tree"));
}

#[tokio::test]
async fn test_open_invalid_json_shows_error_state() {
    let resource = RecordingResource::new("{ \"typeId\": ");
    let (session, log) = open_with(resource, SessionOptions::default()).await;

    assert_eq!(
        log.last(),
        Some(ViewEvent::Tree(TreeData {
            error: true,
            data: Value::Null
        }))
    );
    assert!(session.load_error().is_some());
    assert!(session.root().type_id.is_none());
    assert!(session.children(&session.root()).is_empty());
}

#[tokio::test]
async fn test_save_refused_until_load_succeeds() {
    let broken = "{ \"typeId\": \"Tree\", ";
    let resource = RecordingResource::new(broken);
    let (mut session, _log) = open_with(resource.clone(), SessionOptions::default()).await;

    let err = session.save().await.unwrap_err();
    assert!(matches!(err, SessionError::NotLoaded { .. }));
    assert_eq!(resource.raw(), broken);
    assert_eq!(resource.write_count(), 0);

    resource.set_contents(&empty_tree().to_string());
    session.revert().await;
    assert!(session.load_error().is_none());
    session.save().await.unwrap();
    assert_eq!(resource.stored(), empty_tree());
}

#[tokio::test(start_paused = true)]
async fn test_autosave_skips_document_that_failed_to_load() {
    let broken = "{ \"typeId\": ";
    let resource = RecordingResource::new(broken);
    let (mut session, _log) = open_with(resource.clone(), autosave_after(200)).await;

    session.select(&NodePath::root()).unwrap();
    session.form_changed(empty_tree());
    assert!(session.flush_form_edit());
    assert_eq!(session.autosave_status().state, SaveState::SavePending);

    // Timer expiry is refused instead of writing the error root
    assert!(session.process_next_event().await);
    let status = session.autosave_status();
    assert_eq!(status.state, SaveState::Dirty);
    assert!(status.last_error.unwrap().contains("not loaded"));

    assert_quiet(&mut session, Duration::from_secs(5)).await;
    assert_eq!(resource.write_count(), 0);
    assert_eq!(resource.raw(), broken);
}

#[tokio::test]
async fn test_file_backed_session() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tree.json");
    std::fs::write(&path, empty_tree().to_string()).unwrap();

    let log = ViewLog::default();
    let mut session = EditorSession::open(
        Arc::new(FileResource::new(&path)),
        Arc::new(example_registry().unwrap()),
        Box::new(LogTreeView(log.clone())),
        Box::new(LogFormView(log.clone())),
        SessionOptions::default(),
    )
    .await;

    session.request_add(&NodePath::root(), "children", "Node").unwrap();
    session.save().await.unwrap();

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        saved,
        json!({ "typeId": "Tree", "children": [{ "typeId": "Node" }] })
    );
    assert!(!session.is_dirty());
}

#[tokio::test]
async fn test_missing_file_opens_in_error_state() {
    let temp_dir = TempDir::new().unwrap();
    let log = ViewLog::default();
    let session = EditorSession::open(
        Arc::new(FileResource::new(temp_dir.path().join("absent.json"))),
        Arc::new(example_registry().unwrap()),
        Box::new(LogTreeView(log.clone())),
        Box::new(LogFormView(log.clone())),
        SessionOptions::default(),
    )
    .await;

    assert!(session.load_error().unwrap().contains("File not found"));
    assert!(matches!(log.last(), Some(ViewEvent::Tree(TreeData { error: true, .. }))));
}

// =============================================================================
// Structural edits and commands
// =============================================================================

#[tokio::test]
async fn test_add_then_delete_scenario() {
    let (mut session, _resource, log) = open(empty_tree(), SessionOptions::default()).await;

    let created = session
        .request_add(&NodePath::root(), "children", "Node")
        .unwrap();
    assert_eq!(created.path, child(0));
    assert_eq!(created.type_id.as_deref(), Some("Node"));
    assert_eq!(
        session.document().root(),
        &json!({ "typeId": "Tree", "children": [{ "typeId": "Node" }] })
    );
    assert!(session.is_dirty());
    assert_eq!(
        log.last(),
        Some(ViewEvent::Subtree(
            "/".to_string(),
            json!({ "typeId": "Tree", "children": [{ "typeId": "Node" }] })
        ))
    );

    session.request_delete(&created.path).unwrap();
    assert_eq!(session.document().root(), &empty_tree());
}

#[tokio::test]
async fn test_add_requires_visible_command() {
    let (mut session, _resource, _log) = open(three_leaves(), SessionOptions::default()).await;
    let version = session.document().version();

    let err = session
        .request_add(&NodePath::root(), "children", "Tree")
        .unwrap_err();
    assert!(matches!(err, SessionError::CommandUnavailable { .. }));

    let err = session.request_add(&child(0), "children", "Leaf").unwrap_err();
    assert!(matches!(err, SessionError::CommandUnavailable { .. }));

    let err = session
        .execute_command("json-forms-tree.add.Tree.items.Leaf", &NodePath::root())
        .unwrap_err();
    assert!(matches!(err, SessionError::UnknownCommand(_)));

    assert_eq!(session.document().version(), version);
    assert!(!session.is_dirty());
}

#[tokio::test]
async fn test_execute_command_appends_child() {
    let (mut session, _resource, _log) = open(three_leaves(), SessionOptions::default()).await;

    let created = session
        .execute_command("json-forms-tree.add.Tree.children.Node", &NodePath::root())
        .unwrap();
    assert_eq!(created.path, child(3));
    assert_eq!(
        session.document().root()["children"][3],
        json!({ "typeId": "Node" })
    );
}

#[tokio::test]
async fn test_visible_commands_and_labels() {
    let (mut session, _resource, _log) = open(three_leaves(), SessionOptions::default()).await;
    let root = session.root();

    let ids: Vec<String> = session
        .visible_commands(&root)
        .into_iter()
        .map(|command| command.command_id)
        .collect();
    assert_eq!(
        ids,
        vec![
            "json-forms-tree.add.Tree.children.Leaf".to_string(),
            "json-forms-tree.add.Tree.children.Node".to_string(),
        ]
    );
    assert_eq!(session.command_table().len(), 4);

    let leaf = session.resolve("/children/1").unwrap();
    assert!(session.visible_commands(&leaf).is_empty());
    assert_eq!(session.label_for(&leaf).as_deref(), Some("b"));
    assert_eq!(session.icon_for(&leaf), "codicon codicon-chrome-maximize");
}

#[tokio::test]
async fn test_delete_root_is_rejected() {
    let (mut session, _resource, _log) = open(empty_tree(), SessionOptions::default()).await;
    let err = session.request_delete(&NodePath::root()).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Edit(edit_engine::EditError::RootNotDeletable)
    ));
    assert!(!session.is_dirty());
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn test_select_feeds_form() {
    let (mut session, _resource, log) = open(three_leaves(), SessionOptions::default()).await;

    session.select(&child(1)).unwrap();
    let input = log.last_form_input().unwrap();
    assert_eq!(input.data, json!({ "typeId": "Leaf", "name": "b" }));
    assert!(input.schema.unwrap().get("definitions").is_some());
    assert!(input.ui_schema.is_some());

    assert!(session.select(&child(9)).is_err());
    assert_eq!(session.selection().unwrap().path, child(1));
}

#[tokio::test]
async fn test_delete_rebases_selection() {
    let (mut session, _resource, log) = open(three_leaves(), SessionOptions::default()).await;

    session.select(&child(2)).unwrap();
    session.request_delete(&child(0)).unwrap();
    let selected = session.selection().unwrap();
    assert_eq!(selected.path, child(1));
    assert_eq!(session.label_for(&selected).as_deref(), Some("c"));

    session.request_delete(&child(1)).unwrap();
    assert!(session.selection().is_none());
    assert!(log.events().contains(&ViewEvent::FormCleared));
}

#[tokio::test]
async fn test_add_refreshes_form_of_selected_parent() {
    let (mut session, _resource, log) = open(empty_tree(), SessionOptions::default()).await;

    session.select(&NodePath::root()).unwrap();
    session.request_add(&NodePath::root(), "children", "Leaf").unwrap();
    assert_eq!(
        log.last_form_input().unwrap().data,
        json!({ "typeId": "Tree", "children": [{ "typeId": "Leaf" }] })
    );
}

// =============================================================================
// Form-edit debouncing
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_form_edits_collapse_into_one_replace() {
    let (mut session, _resource, log) = open(three_leaves(), SessionOptions::default()).await;
    session.select(&child(0)).unwrap();
    let version = session.document().version();
    let start = Instant::now();

    for name in ["ab", "abc", "abcd"] {
        session.form_changed(json!({ "typeId": "Leaf", "name": name }));
        tokio::time::advance(Duration::from_millis(100)).await;
    }
    assert_eq!(session.document().version(), version);

    assert!(session.process_next_event().await);
    assert!(start.elapsed() >= Duration::from_millis(450));
    assert_eq!(session.document().version(), version + 1);
    assert_eq!(session.document().root()["children"][0]["name"], "abcd");
    assert_eq!(log.subtree_updates(), 1);

    assert_quiet(&mut session, Duration::from_secs(2)).await;
    assert_eq!(session.document().version(), version + 1);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_form_edit_is_suppressed() {
    let (mut session, _resource, log) = open(three_leaves(), SessionOptions::default()).await;
    session.select(&child(1)).unwrap();
    let version = session.document().version();

    session.form_changed(json!({ "typeId": "Leaf", "name": "b" }));
    assert!(session.process_next_event().await);

    assert_eq!(session.document().version(), version);
    assert_eq!(log.subtree_updates(), 0);
    assert!(!session.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn test_selection_change_flushes_edit_to_previous_node() {
    let (mut session, _resource, log) = open(three_leaves(), SessionOptions::default()).await;
    session.select(&child(0)).unwrap();
    session.form_changed(json!({ "typeId": "Leaf", "name": "renamed" }));

    session.select(&child(1)).unwrap();
    assert_eq!(session.document().root()["children"][0]["name"], "renamed");
    assert_eq!(session.document().root()["children"][1]["name"], "b");
    assert_eq!(
        log.last_form_input().unwrap().data,
        json!({ "typeId": "Leaf", "name": "b" })
    );

    // The debounce timer was cancelled by the flush
    assert_quiet(&mut session, Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_delete_flushes_pending_edit_first() {
    let (mut session, _resource, _log) = open(three_leaves(), SessionOptions::default()).await;
    session.select(&child(2)).unwrap();
    session.form_changed(json!({ "typeId": "Leaf", "name": "c2" }));

    session.request_delete(&child(0)).unwrap();
    assert_eq!(
        session.document().root()["children"],
        json!([{ "typeId": "Leaf", "name": "b" }, { "typeId": "Leaf", "name": "c2" }])
    );
    assert_eq!(session.selection().unwrap().path, child(1));
}

// =============================================================================
// Autosave
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_autosave_saves_once_after_last_edit() {
    let (mut session, resource, _log) = open(empty_tree(), autosave_after(200)).await;

    for _ in 0..3 {
        session.request_add(&NodePath::root(), "children", "Leaf").unwrap();
        tokio::time::advance(Duration::from_millis(50)).await;
    }
    session.request_add(&NodePath::root(), "children", "Node").unwrap();
    let last_edit = Instant::now();
    assert_eq!(session.autosave_status().state, SaveState::SavePending);

    // Timer expiry, then the save completion
    assert!(session.process_next_event().await);
    assert!(session.autosave_status().is_saving);
    assert!(session.process_next_event().await);

    let writes = resource.writes();
    assert_eq!(writes.len(), 1);
    assert!(writes[0].0 >= last_edit + Duration::from_millis(200));
    assert_eq!(resource.stored(), *session.document().root());
    assert_eq!(resource.stored()["children"].as_array().unwrap().len(), 4);
    assert!(!session.is_dirty());

    assert_quiet(&mut session, Duration::from_secs(5)).await;
    assert_eq!(resource.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_autosave_failure_leaves_dirty_without_retry() {
    let (mut session, resource, _log) = open(empty_tree(), autosave_after(200)).await;
    resource.set_failing(true);

    session.request_add(&NodePath::root(), "children", "Leaf").unwrap();
    assert!(session.process_next_event().await);
    assert!(session.process_next_event().await);

    let status = session.autosave_status();
    assert_eq!(status.state, SaveState::Dirty);
    assert!(status.dirty);
    assert!(status.last_error.unwrap().contains("read-only"));
    assert_quiet(&mut session, Duration::from_secs(5)).await;
    assert_eq!(resource.write_count(), 0);

    // The next edit re-arms the flow
    resource.set_failing(false);
    session.request_add(&NodePath::root(), "children", "Leaf").unwrap();
    assert!(session.process_next_event().await);
    assert!(session.process_next_event().await);
    assert_eq!(resource.write_count(), 1);
    assert!(!session.is_dirty());
    assert!(session.autosave_status().last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_edit_during_save_is_saved_afterwards() {
    let resource = RecordingResource::new(&empty_tree().to_string())
        .with_write_delay(Duration::from_millis(100));
    let (mut session, _log) = open_with(resource.clone(), autosave_after(200)).await;

    session.request_add(&NodePath::root(), "children", "Leaf").unwrap();
    assert!(session.process_next_event().await);
    assert!(session.autosave_status().is_saving);

    session.request_add(&NodePath::root(), "children", "Node").unwrap();
    assert!(session.process_next_event().await);
    // The first save only covered one child
    assert_eq!(resource.stored()["children"].as_array().unwrap().len(), 1);
    assert_eq!(session.autosave_status().state, SaveState::SavePending);
    assert!(session.is_dirty());

    assert!(session.process_next_event().await);
    assert!(session.process_next_event().await);
    assert_eq!(resource.write_count(), 2);
    assert_eq!(resource.stored()["children"].as_array().unwrap().len(), 2);
    assert!(!session.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn test_close_during_save_is_noop() {
    let resource = RecordingResource::new(&empty_tree().to_string())
        .with_write_delay(Duration::from_secs(1));
    let (mut session, _log) = open_with(resource.clone(), autosave_after(200)).await;

    session.request_add(&NodePath::root(), "children", "Leaf").unwrap();
    assert!(session.process_next_event().await);
    assert!(session.autosave_status().is_saving);

    session.close();
    tokio::time::sleep(Duration::from_secs(2)).await;
    // The write itself completes; its completion has nowhere to go
    assert_eq!(resource.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_pending_timers() {
    let (mut session, resource, _log) = open(three_leaves(), autosave_after(200)).await;
    session.select(&child(0)).unwrap();
    session.form_changed(json!({ "typeId": "Leaf", "name": "late" }));
    session.request_add(&NodePath::root(), "children", "Leaf").unwrap();

    session.close();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(resource.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_disabling_autosave_cancels_pending_save() {
    let (mut session, resource, _log) = open(empty_tree(), autosave_after(200)).await;
    session.request_add(&NodePath::root(), "children", "Leaf").unwrap();

    session.set_autosave_config(AutosaveConfig::disabled());
    assert_quiet(&mut session, Duration::from_secs(2)).await;
    assert_eq!(resource.write_count(), 0);
    assert_eq!(session.autosave_status().state, SaveState::Dirty);
}

#[tokio::test(start_paused = true)]
async fn test_focus_lost_saves_in_focus_mode() {
    let options = SessionOptions::default().with_autosave(AutosaveConfig {
        mode: AutosaveMode::OnFocusChange,
        delay_ms: 1000,
    });
    let (mut session, resource, _log) = open(empty_tree(), options).await;

    session.request_add(&NodePath::root(), "children", "Leaf").unwrap();
    assert_eq!(session.autosave_status().state, SaveState::SavePending);

    session.focus_lost();
    assert!(session.autosave_status().is_saving);
    assert!(session.process_next_event().await);
    assert_eq!(resource.write_count(), 1);
    assert!(!session.is_dirty());
}

// =============================================================================
// Explicit save, revert, dirty notifications
// =============================================================================

#[tokio::test]
async fn test_save_failure_keeps_document_dirty() {
    let (mut session, resource, _log) = open(empty_tree(), SessionOptions::default()).await;
    let dirty = session.dirty_watch();

    session.request_add(&NodePath::root(), "children", "Node").unwrap();
    resource.set_failing(true);
    let err = session.save().await.unwrap_err();
    assert!(matches!(err, SessionError::Store(StoreError::Io(_))));
    assert!(session.is_dirty());
    assert!(*dirty.borrow());
    assert_eq!(resource.stored(), empty_tree());

    resource.set_failing(false);
    session.save().await.unwrap();
    assert!(!session.is_dirty());
    assert!(!*dirty.borrow());
    assert_eq!(resource.stored(), *session.document().root());
}

#[tokio::test]
async fn test_save_of_clean_document_is_allowed() {
    let (mut session, resource, _log) = open(empty_tree(), SessionOptions::default()).await;
    session.save().await.unwrap();
    assert_eq!(resource.write_count(), 1);
    assert!(!session.is_dirty());
}

#[tokio::test]
async fn test_dirty_watch_notifies_changes() {
    let (mut session, _resource, _log) = open(empty_tree(), SessionOptions::default()).await;
    let mut dirty = session.dirty_watch();
    assert!(!*dirty.borrow_and_update());

    session.request_add(&NodePath::root(), "children", "Leaf").unwrap();
    assert!(dirty.has_changed().unwrap());
    assert!(*dirty.borrow_and_update());

    session.save().await.unwrap();
    assert!(dirty.has_changed().unwrap());
    assert!(!*dirty.borrow_and_update());
}

#[tokio::test]
async fn test_revert_discards_edits() {
    let (mut session, _resource, log) = open(three_leaves(), SessionOptions::default()).await;
    session.select(&child(0)).unwrap();
    session.request_delete(&child(1)).unwrap();
    assert!(session.is_dirty());

    session.revert().await;
    assert_eq!(session.document().root(), &three_leaves());
    assert!(!session.is_dirty());
    assert!(session.selection().is_none());
    assert_eq!(
        log.last(),
        Some(ViewEvent::Tree(TreeData {
            error: false,
            data: three_leaves()
        }))
    );
}

// =============================================================================
// Event loop
// =============================================================================

#[tokio::test]
async fn test_run_loop_processes_commands() {
    let (session, resource, _log) = open(empty_tree(), SessionOptions::default()).await;
    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(session.run(rx));

    let (reply, added) = oneshot::channel();
    tx.send(SessionCommand::RequestAdd {
        parent: NodePath::root(),
        property: "children".to_string(),
        child_type: "Node".to_string(),
        reply: Some(reply),
    })
    .await
    .unwrap();
    assert_eq!(added.await.unwrap().unwrap().path, child(0));

    let (reply, rejected) = oneshot::channel();
    tx.send(SessionCommand::ExecuteCommand {
        command_id: "json-forms-tree.add.Leaf.children.Leaf".to_string(),
        target: child(0),
        reply: Some(reply),
    })
    .await
    .unwrap();
    assert!(matches!(
        rejected.await.unwrap(),
        Err(SessionError::UnknownCommand(_))
    ));

    let (reply, saved) = oneshot::channel();
    tx.send(SessionCommand::Save { reply: Some(reply) })
        .await
        .unwrap();
    saved.await.unwrap().unwrap();
    assert_eq!(
        resource.stored(),
        json!({ "typeId": "Tree", "children": [{ "typeId": "Node" }] })
    );

    drop(tx);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_applies_debounced_form_edits() {
    let (session, resource, _log) = open(three_leaves(), autosave_after(200)).await;
    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(session.run(rx));

    tx.send(SessionCommand::Select(child(0))).await.unwrap();
    tx.send(SessionCommand::FormChanged(json!({ "typeId": "Leaf", "name": "x" })))
        .await
        .unwrap();
    tx.send(SessionCommand::FormChanged(json!({ "typeId": "Leaf", "name": "xy" })))
        .await
        .unwrap();

    // Debounce (250 ms) plus autosave delay (200 ms)
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(resource.write_count(), 1);
    assert_eq!(resource.stored()["children"][0]["name"], "xy");

    tx.send(SessionCommand::Close).await.unwrap();
    handle.await.unwrap();
}

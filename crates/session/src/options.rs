//! Session construction options

use std::time::Duration;
use store::{AutosaveConfig, EditorSettings};

/// Options for an [`EditorSession`](crate::EditorSession)
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Identifier stamped on every projected node
    pub editor_id: String,
    pub autosave: AutosaveConfig,
    /// Quiet period before a form edit is applied
    pub form_debounce: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_settings("tree-editor", &EditorSettings::default())
    }
}

impl SessionOptions {
    pub fn from_settings(editor_id: impl Into<String>, settings: &EditorSettings) -> Self {
        Self {
            editor_id: editor_id.into(),
            autosave: settings.autosave(),
            form_debounce: settings.form_debounce(),
        }
    }

    pub fn with_autosave(mut self, autosave: AutosaveConfig) -> Self {
        self.autosave = autosave;
        self
    }

    pub fn with_form_debounce(mut self, form_debounce: Duration) -> Self {
        self.form_debounce = form_debounce;
        self
    }
}

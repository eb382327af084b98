//! Dirty tracking and autosave state machine
//!
//! The machine is a plain state object: each input returns the
//! [`AutosaveAction`] the owner must perform (arm or cancel the autosave
//! timer, start a save). Timers and I/O stay with the owner, which keeps
//! every transition testable without a runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When modified documents are saved without an explicit request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutosaveMode {
    #[default]
    Off,
    AfterDelay,
    OnFocusChange,
    OnWindowChange,
}

impl AutosaveMode {
    pub fn is_enabled(self) -> bool {
        self != AutosaveMode::Off
    }
}

/// Autosave configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    pub mode: AutosaveMode,
    /// Quiet period after the last edit before saving
    pub delay_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            mode: AutosaveMode::Off,
            delay_ms: 1000,
        }
    }
}

impl AutosaveConfig {
    /// Autosave after `delay_ms` of inactivity
    pub fn after_delay(delay_ms: u64) -> Self {
        Self {
            mode: AutosaveMode::AfterDelay,
            delay_ms,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Persistence state of the edited document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveState {
    /// Matches the last persisted snapshot
    Clean,
    /// Modified, no save scheduled
    Dirty,
    /// Modified, autosave timer armed
    SavePending,
    /// A save is in flight
    Saving,
}

/// Work the owner of the machine has to carry out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveAction {
    None,
    /// (Re)arm the autosave timer; its expiry must report `generation`
    ArmTimer { generation: u64, delay: Duration },
    CancelTimer,
    /// Serialize the document and hand it to the persistence collaborator
    StartSave,
}

/// Current autosave status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutosaveStatus {
    pub mode: AutosaveMode,
    pub state: SaveState,
    /// Whether there are unsaved changes
    pub dirty: bool,
    pub is_saving: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Error message from the last failed save
    pub last_error: Option<String>,
}

/// Dirty/autosave state machine
#[derive(Debug, Clone)]
pub struct AutosaveMachine {
    config: AutosaveConfig,
    state: SaveState,
    /// Latest document revision reported by a mutation
    revision: u64,
    /// Revision the save in flight is writing
    saving_revision: Option<u64>,
    /// Incremented whenever a timer arm is superseded
    timer_generation: u64,
    /// Explicit save requested while another save was in flight
    save_requested: bool,
    last_saved_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl AutosaveMachine {
    pub fn new(config: AutosaveConfig) -> Self {
        Self {
            config,
            state: SaveState::Clean,
            revision: 0,
            saving_revision: None,
            timer_generation: 0,
            save_requested: false,
            last_saved_at: None,
            last_error: None,
        }
    }

    pub fn config(&self) -> &AutosaveConfig {
        &self.config
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    /// True whenever the document differs from the last persisted snapshot
    pub fn is_dirty(&self) -> bool {
        self.state != SaveState::Clean
    }

    pub fn is_saving(&self) -> bool {
        self.state == SaveState::Saving
    }

    /// Start tracking a freshly loaded document at `revision`
    pub fn reset(&mut self, revision: u64) -> AutosaveAction {
        let was_pending = self.state == SaveState::SavePending;
        self.revision = revision;
        self.timer_generation += 1;
        self.save_requested = false;
        self.last_error = None;
        if self.state != SaveState::Saving {
            self.state = SaveState::Clean;
        }
        if was_pending {
            AutosaveAction::CancelTimer
        } else {
            AutosaveAction::None
        }
    }

    fn transition(&mut self, next: SaveState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "save state changed");
            self.state = next;
        }
    }

    fn arm_timer(&mut self) -> AutosaveAction {
        self.timer_generation += 1;
        self.transition(SaveState::SavePending);
        AutosaveAction::ArmTimer {
            generation: self.timer_generation,
            delay: self.config.delay(),
        }
    }

    /// A mutation produced document `revision`
    pub fn record_mutation(&mut self, revision: u64) -> AutosaveAction {
        self.revision = revision;
        match self.state {
            // Picked up when the save in flight completes.
            SaveState::Saving => AutosaveAction::None,
            _ if self.config.mode.is_enabled() => self.arm_timer(),
            SaveState::SavePending => {
                self.timer_generation += 1;
                self.transition(SaveState::Dirty);
                AutosaveAction::CancelTimer
            }
            SaveState::Clean | SaveState::Dirty => {
                self.transition(SaveState::Dirty);
                AutosaveAction::None
            }
        }
    }

    /// The autosave timer armed with `generation` expired
    pub fn timer_elapsed(&mut self, generation: u64) -> AutosaveAction {
        if self.state == SaveState::SavePending && generation == self.timer_generation {
            AutosaveAction::StartSave
        } else {
            tracing::trace!(generation, current = self.timer_generation, "stale autosave timer ignored");
            AutosaveAction::None
        }
    }

    /// Explicit save request, bypassing the timer
    pub fn request_save(&mut self) -> AutosaveAction {
        if self.state == SaveState::Saving {
            self.save_requested = true;
            return AutosaveAction::None;
        }
        AutosaveAction::StartSave
    }

    /// Window or editor focus was lost
    pub fn focus_lost(&mut self) -> AutosaveAction {
        match self.config.mode {
            AutosaveMode::OnFocusChange | AutosaveMode::OnWindowChange
                if matches!(self.state, SaveState::Dirty | SaveState::SavePending) =>
            {
                AutosaveAction::StartSave
            }
            _ => AutosaveAction::None,
        }
    }

    /// The owner is about to write the current document; returns the
    /// revision being saved
    pub fn begin_save(&mut self) -> u64 {
        self.timer_generation += 1;
        self.save_requested = false;
        self.saving_revision = Some(self.revision);
        self.transition(SaveState::Saving);
        self.revision
    }

    /// The save of `revision` completed
    pub fn save_succeeded(&mut self, revision: u64) -> AutosaveAction {
        self.saving_revision = None;
        self.last_error = None;
        self.last_saved_at = Some(Utc::now());

        if revision >= self.revision {
            self.save_requested = false;
            self.transition(SaveState::Clean);
            return AutosaveAction::None;
        }

        // Edits arrived while the save was in flight.
        if std::mem::take(&mut self.save_requested) {
            self.transition(SaveState::Dirty);
            AutosaveAction::StartSave
        } else if self.config.mode.is_enabled() {
            self.arm_timer()
        } else {
            self.transition(SaveState::Dirty);
            AutosaveAction::None
        }
    }

    /// The save in flight failed. The document stays dirty and nothing is
    /// retried until the next edit or explicit save.
    pub fn save_failed(&mut self, error: impl Into<String>) -> AutosaveAction {
        let error = error.into();
        tracing::warn!("Save failed: {}", error);
        self.saving_revision = None;
        self.save_requested = false;
        self.last_error = Some(error);
        self.transition(SaveState::Dirty);
        AutosaveAction::None
    }

    /// Apply new preferences
    pub fn set_config(&mut self, config: AutosaveConfig) -> AutosaveAction {
        let enabled = config.mode.is_enabled();
        self.config = config;
        match self.state {
            SaveState::SavePending if !enabled => {
                self.timer_generation += 1;
                self.transition(SaveState::Dirty);
                AutosaveAction::CancelTimer
            }
            SaveState::Dirty if enabled => self.arm_timer(),
            _ => AutosaveAction::None,
        }
    }

    pub fn status(&self) -> AutosaveStatus {
        AutosaveStatus {
            mode: self.config.mode,
            state: self.state,
            dirty: self.is_dirty(),
            is_saving: self.is_saving(),
            last_saved_at: self.last_saved_at,
            last_error: self.last_error.clone(),
        }
    }
}

impl Default for AutosaveMachine {
    fn default() -> Self {
        Self::new(AutosaveConfig::default())
    }
}

//! Editor settings management
//!
//! Settings persistence, loading, and updating for the tree editor.

use crate::{AutosaveConfig, AutosaveMode, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main editor settings container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorSettings {
    /// File persistence settings
    pub files: FilesSettings,
    /// Quiet period before a form edit is applied to the document
    pub form_debounce_ms: u64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            files: FilesSettings::default(),
            form_debounce_ms: 250,
        }
    }
}

impl EditorSettings {
    /// Autosave configuration derived from the file settings
    pub fn autosave(&self) -> AutosaveConfig {
        AutosaveConfig {
            mode: self.files.auto_save,
            delay_ms: self.files.auto_save_delay_ms,
        }
    }

    pub fn form_debounce(&self) -> Duration {
        Duration::from_millis(self.form_debounce_ms)
    }
}

/// File persistence settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FilesSettings {
    /// Autosave mode
    pub auto_save: AutosaveMode,
    /// Autosave delay in milliseconds
    pub auto_save_delay_ms: u64,
}

impl Default for FilesSettings {
    fn default() -> Self {
        Self {
            auto_save: AutosaveMode::Off,
            auto_save_delay_ms: 1000,
        }
    }
}

/// Settings manager for loading, saving, and updating editor settings
pub struct SettingsManager {
    /// Path to the settings file
    settings_path: PathBuf,
    /// Current settings (cached)
    current: EditorSettings,
}

impl SettingsManager {
    /// Create a settings manager storing `settings.json` in `config_dir`
    pub fn new(config_dir: PathBuf) -> Self {
        Self::with_path(config_dir.join("settings.json"))
    }

    /// Create a settings manager for an explicit settings file
    pub fn with_path(settings_path: PathBuf) -> Self {
        Self {
            settings_path,
            current: EditorSettings::default(),
        }
    }

    /// Get the path to the settings file
    pub fn settings_path(&self) -> &PathBuf {
        &self.settings_path
    }

    fn parse_or_default(content: &str) -> EditorSettings {
        match serde_json::from_str::<EditorSettings>(content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to parse settings file, using defaults: {}", e);
                EditorSettings::default()
            }
        }
    }

    /// Load settings from disk, or return defaults if the file doesn't exist
    pub async fn load(&mut self) -> Result<&EditorSettings> {
        self.current = if self.settings_path.exists() {
            let content = tokio::fs::read_to_string(&self.settings_path).await?;
            Self::parse_or_default(&content)
        } else {
            EditorSettings::default()
        };
        Ok(&self.current)
    }

    /// Load settings synchronously (for use during startup)
    pub fn load_sync(&mut self) -> Result<&EditorSettings> {
        self.current = if self.settings_path.exists() {
            let content = std::fs::read_to_string(&self.settings_path)?;
            Self::parse_or_default(&content)
        } else {
            EditorSettings::default()
        };
        Ok(&self.current)
    }

    /// Save current settings to disk
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&self.current)?;
        tokio::fs::write(&self.settings_path, content).await?;
        Ok(())
    }

    /// Save settings synchronously
    pub fn save_sync(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.current)?;
        std::fs::write(&self.settings_path, content)?;
        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> &EditorSettings {
        &self.current
    }

    /// Update settings and save to disk
    pub async fn update(&mut self, settings: EditorSettings) -> Result<()> {
        self.current = settings;
        self.save().await
    }

    /// Update settings synchronously
    pub fn update_sync(&mut self, settings: EditorSettings) -> Result<()> {
        self.current = settings;
        self.save_sync()
    }

    /// Update only the file settings
    pub async fn update_files(&mut self, files: FilesSettings) -> Result<()> {
        self.current.files = files;
        self.save().await
    }

    /// Reset settings to defaults and save
    pub fn reset_sync(&mut self) -> Result<&EditorSettings> {
        self.current = EditorSettings::default();
        self.save_sync()?;
        Ok(&self.current)
    }
}

//! App settings persisted as a JSON blob

use crate::RecordStore;
use haven_core::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Record store key for settings
pub const SETTINGS_KEY: &str = "haven.settings";

/// User-facing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Show the calculator disguise on launch
    pub disguise_mode: bool,
    /// Name shown for the disguised app
    pub app_name: String,
    /// Message sent to trusted contacts in an emergency
    pub emergency_message: String,
    /// No PIN has been set up yet
    pub first_launch: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            disguise_mode: true,
            app_name: "Calculator".to_string(),
            emergency_message: "I need help. This is my location:".to_string(),
            first_launch: true,
        }
    }
}

/// Loads and saves [`AppSettings`]
pub struct SettingsStore {
    records: Arc<dyn RecordStore>,
}

impl SettingsStore {
    /// Create a settings store over `records`
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Current settings; defaults when nothing (or nothing readable) is stored
    pub fn load(&self) -> Result<AppSettings> {
        let Some(raw) = self.records.get_blob(SETTINGS_KEY)? else {
            return Ok(AppSettings::default());
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!("Unreadable settings, using defaults: {}", e);
                Ok(AppSettings::default())
            }
        }
    }

    /// Persist `settings`
    pub fn save(&self, settings: &AppSettings) -> Result<()> {
        let raw = serde_json::to_string(settings)?;
        self.records.put_blob(SETTINGS_KEY, &raw)?;
        Ok(())
    }

    /// Record that initial PIN setup finished
    pub fn mark_setup_complete(&self) -> Result<()> {
        let mut settings = self.load()?;
        if settings.first_launch {
            settings.first_launch = false;
            self.save(&settings)?;
        }
        Ok(())
    }

    /// Drop stored settings so defaults apply again
    pub fn reset(&self) -> Result<()> {
        self.records.remove_blob(SETTINGS_KEY)?;
        Ok(())
    }
}

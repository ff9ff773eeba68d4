//! Engine settings management
//!
//! Loads and saves [`EngineConfig`] as `settings.json` in the application
//! data directory.

use crate::Result;
use annotation_engine::EngineConfig;
use std::path::{Path, PathBuf};

/// Settings manager for loading, saving, and updating engine settings
pub struct SettingsManager {
    /// Path to the settings file
    settings_path: PathBuf,
    /// Current settings (cached)
    current: EngineConfig,
}

impl SettingsManager {
    /// Create a new settings manager with the given app data directory
    pub fn new(app_data_dir: impl AsRef<Path>) -> Self {
        Self {
            settings_path: app_data_dir.as_ref().join("settings.json"),
            current: EngineConfig::default(),
        }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk, or use defaults if the file doesn't exist
    /// or can't be parsed
    pub fn load(&mut self) -> Result<&EngineConfig> {
        self.current = if self.settings_path.exists() {
            let content = std::fs::read_to_string(&self.settings_path)?;
            match serde_json::from_str::<EngineConfig>(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Failed to parse settings file, using defaults: {}", e);
                    EngineConfig::default()
                }
            }
        } else {
            EngineConfig::default()
        };
        Ok(&self.current)
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.current)?;
        std::fs::write(&self.settings_path, content)?;
        Ok(())
    }

    pub fn get(&self) -> &EngineConfig {
        &self.current
    }

    /// Replace the settings and save
    pub fn update(&mut self, settings: EngineConfig) -> Result<()> {
        self.current = settings;
        self.save()
    }

    /// Reset settings to defaults and save
    pub fn reset(&mut self) -> Result<&EngineConfig> {
        self.current = EngineConfig::default();
        self.save()?;
        Ok(&self.current)
    }
}

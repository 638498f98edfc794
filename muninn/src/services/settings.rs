//! Settings service
//!
//! Manages application settings persistence using JSON file storage.

use crate::config::{
    DEFAULT_COLLECTOR_URL, DEFAULT_SEND_SCHEDULE, DEFAULT_UPLOAD_TIMEOUT_SECS,
    MAX_UPLOAD_TIMEOUT_SECS, MIN_UPLOAD_TIMEOUT_SECS, SETTINGS_FILE_NAME,
};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Where and how archives are uploaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorSettings {
    #[serde(default = "default_collector_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_collector_url() -> String {
    DEFAULT_COLLECTOR_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_UPLOAD_TIMEOUT_SECS
}

impl CollectorSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            url: default_collector_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Daily send schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression evaluated in local time
    #[serde(default = "default_cron")]
    pub cron: String,
}

fn default_true() -> bool {
    true
}

fn default_cron() -> String {
    DEFAULT_SEND_SCHEDULE.to_string()
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: default_cron(),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub collector: CollectorSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
}

impl AppSettings {
    pub fn validate(&self) -> Result<()> {
        let url = self.collector.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::Settings(format!(
                "Collector URL must be http(s): {}",
                self.collector.url
            )));
        }

        if !(MIN_UPLOAD_TIMEOUT_SECS..=MAX_UPLOAD_TIMEOUT_SECS).contains(&self.collector.timeout_secs) {
            return Err(AppError::Settings(format!(
                "Upload timeout must be between {} and {} seconds",
                MIN_UPLOAD_TIMEOUT_SECS, MAX_UPLOAD_TIMEOUT_SECS
            )));
        }

        if self.schedule.cron.trim().is_empty() {
            return Err(AppError::Settings("Send schedule must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            settings_path: base_dir.join(SETTINGS_FILE_NAME),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Settings(format!("Failed to parse settings: {}", e)))?;

        settings.validate()?;

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        settings.validate()?;

        let content = serde_json::to_string_pretty(settings)?;

        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    /// Update collector settings
    pub async fn update_collector(&self, collector: CollectorSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.collector = collector;
        self.save(&settings).await
    }

    /// Update schedule settings
    pub async fn update_schedule(&self, schedule: ScheduleSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.schedule = schedule;
        self.save(&settings).await
    }
}

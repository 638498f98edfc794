//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState,
//! which is also the API the host UI calls into.

use crate::error::Result;
use crate::models::{Attachment, Note, SearchResult};
use crate::services::settings::{CollectorSettings, ScheduleSettings};
use crate::services::{
    AppSettings, ArchiveBuilder, NotesService, SchedulerService, SendService, SendStatus,
    SettingsService, Uploader,
};
use crate::storage::{AttachmentStore, JournalStore, StoragePaths};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub paths: StoragePaths,
    pub settings: Arc<RwLock<AppSettings>>,
    pub settings_service: SettingsService,
    pub notes_service: NotesService,
    pub send_service: SendService,
    pub scheduler: Arc<RwLock<Option<SchedulerService>>>,
}

impl AppState {
    /// Wire all services over an existing storage root
    pub async fn new(paths: StoragePaths) -> Result<Self> {
        paths.ensure_base()?;

        let settings_service = SettingsService::new(paths.base_dir());
        let settings = settings_service.load().await?;

        let notes_service = NotesService::new(
            AttachmentStore::new(paths.clone()),
            JournalStore::new(paths.clone()),
        );

        let uploader = Uploader::new(settings.collector.url.clone(), settings.collector.timeout())?;
        let send_service = SendService::new(ArchiveBuilder::new(paths.clone()), uploader);

        Ok(Self {
            paths,
            settings: Arc::new(RwLock::new(settings)),
            settings_service,
            notes_service,
            send_service,
            scheduler: Arc::new(RwLock::new(None)),
        })
    }

    /// Capture a note, materializing its attachments first.
    /// An error means the note was not saved.
    pub async fn capture_note(&self, text: String, attachments: Vec<Attachment>) -> Result<Note> {
        self.notes_service.capture_note(text, attachments).await
    }

    /// Search today's notes
    pub async fn search_today(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.notes_service.search_today(query).await
    }

    /// Send today's archive now, reporting any failure to the caller
    pub async fn trigger_send(&self) -> Result<()> {
        self.send_service.send_today().await?;
        Ok(())
    }

    /// State of the current or last send
    pub async fn send_status(&self) -> SendStatus {
        self.send_service.status().await
    }

    pub fn base_dir(&self) -> &Path {
        self.paths.base_dir()
    }

    /// Settings currently in effect
    pub async fn settings(&self) -> AppSettings {
        self.settings.read().await.clone()
    }

    /// Persist new collector settings and point later sends at them
    pub async fn update_collector(&self, collector: CollectorSettings) -> Result<()> {
        let uploader = Uploader::new(collector.url.clone(), collector.timeout())?;
        self.settings_service.update_collector(collector.clone()).await?;
        self.send_service.set_uploader(uploader).await;

        self.settings.write().await.collector = collector;
        Ok(())
    }

    /// Persist a new send schedule and apply it to the running scheduler
    pub async fn update_schedule(&self, schedule: ScheduleSettings) -> Result<()> {
        // Reschedule first so a cron the scheduler rejects is never saved
        if let Some(scheduler) = self.scheduler.read().await.as_ref() {
            scheduler.schedule_send(&schedule.cron, schedule.enabled).await?;
        }
        self.settings_service.update_schedule(schedule.clone()).await?;

        self.settings.write().await.schedule = schedule;
        Ok(())
    }

    /// Create and start the daily send scheduler from the current settings
    pub async fn start_scheduler(&self) -> Result<SchedulerService> {
        let schedule = self.settings.read().await.schedule.clone();

        let scheduler = SchedulerService::new(self.send_service.clone()).await?;
        scheduler.start().await?;
        scheduler.schedule_send(&schedule.cron, schedule.enabled).await?;

        *self.scheduler.write().await = Some(scheduler.clone());
        Ok(scheduler)
    }
}

/// Application setup - called once on startup
pub async fn setup() -> Result<AppState> {
    tracing::info!("Initializing application");

    let paths = StoragePaths::resolve()?;
    tracing::info!("Base directory: {:?}", paths.base_dir());

    let state = AppState::new(paths).await?;

    tracing::info!("Application initialized successfully");

    Ok(state)
}

//! Send service
//!
//! Runs the archive -> upload pipeline for one day and tracks the state of
//! the current or most recent run:
//!
//! `Idle -> Building -> Uploading -> Done | Failed`
//!
//! Only one run may be active at a time; a second caller gets
//! `SendInProgress`. Sending never modifies the journal or attachments.

use crate::error::{AppError, Result};
use crate::services::archive::{ArchiveBuilder, ArchiveSummary};
use crate::services::upload::Uploader;
use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SendState {
    Idle,
    Building,
    Uploading,
    Done,
    Failed,
}

/// Snapshot of the current or last send
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendStatus {
    pub state: SendState,
    pub date: Option<NaiveDate>,
    pub finished_at: Option<DateTime<Local>>,
    pub entries: Option<usize>,
    pub error: Option<String>,
}

impl Default for SendStatus {
    fn default() -> Self {
        Self {
            state: SendState::Idle,
            date: None,
            finished_at: None,
            entries: None,
            error: None,
        }
    }
}

/// Archive-and-upload pipeline
#[derive(Clone)]
pub struct SendService {
    archive: ArchiveBuilder,
    uploader: Arc<RwLock<Uploader>>,
    status: Arc<RwLock<SendStatus>>,
    run_lock: Arc<Mutex<()>>,
}

impl SendService {
    pub fn new(archive: ArchiveBuilder, uploader: Uploader) -> Self {
        Self {
            archive,
            uploader: Arc::new(RwLock::new(uploader)),
            status: Arc::new(RwLock::new(SendStatus::default())),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Send today's journal and attachments
    pub async fn send_today(&self) -> Result<ArchiveSummary> {
        self.send_day(Local::now().date_naive()).await
    }

    /// Send the day before today; used by the midnight trigger so the day
    /// that just ended is the one uploaded
    pub async fn send_previous_day(&self) -> Result<ArchiveSummary> {
        self.send_day(previous_day(Local::now())).await
    }

    /// Replace the collector client; later sends use the new one
    pub async fn set_uploader(&self, uploader: Uploader) {
        tracing::info!("Collector set to {}", uploader.url());
        *self.uploader.write().await = uploader;
    }

    /// Build and upload the archive for `date`
    pub async fn send_day(&self, date: NaiveDate) -> Result<ArchiveSummary> {
        let _running = self.run_lock.try_lock().map_err(|_| AppError::SendInProgress)?;

        tracing::info!("Sending archive for {}", date);
        self.begin(date).await;

        let result = self.run(date).await;

        let mut status = self.status.write().await;
        status.finished_at = Some(Local::now());
        match &result {
            Ok(summary) => {
                status.state = SendState::Done;
                status.entries = Some(summary.entries);
                tracing::info!(
                    "Sent archive for {} ({} entries, {} bytes uncompressed)",
                    date,
                    summary.entries,
                    summary.bytes
                );
            }
            Err(e) => {
                status.state = SendState::Failed;
                status.error = Some(e.to_string());
            }
        }

        result
    }

    /// Current or last run
    pub async fn status(&self) -> SendStatus {
        self.status.read().await.clone()
    }

    async fn run(&self, date: NaiveDate) -> Result<ArchiveSummary> {
        let archive = self.archive.build(date).await?;

        self.status.write().await.state = SendState::Uploading;

        let uploader = self.uploader.read().await.clone();
        let uploaded = uploader.upload(archive.stream).await;
        let produced = archive.producer.finish().await;

        match (produced, uploaded) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Err(e), Ok(())) => Err(e),
            // A build failure is the root cause of the aborted upload
            (Err(e), Err(_)) if !e.is_consumer_gone() => Err(e),
            (_, Err(e)) => Err(e),
        }
    }

    async fn begin(&self, date: NaiveDate) {
        let mut status = self.status.write().await;
        *status = SendStatus {
            state: SendState::Building,
            date: Some(date),
            ..SendStatus::default()
        };
    }
}

/// Calendar day before the local date of `now`
pub fn previous_day(now: DateTime<Local>) -> NaiveDate {
    let today = now.date_naive();
    today.pred_opt().unwrap_or(today)
}

//! Scheduler service
//!
//! Fires the daily archive upload on a cron schedule in local time. Each
//! run uploads the previous day, so a midnight trigger sends the day that
//! just ended. Failures are logged and left for the next trigger; there is no retry.

use crate::error::{AppError, Result};
use crate::services::SendService;
use chrono::Local;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

/// Scheduler service for automatic sends
#[derive(Clone)]
pub struct SchedulerService {
    scheduler: Arc<RwLock<JobScheduler>>,
    send_service: SendService,
    current_job_id: Arc<RwLock<Option<Uuid>>>,
}

impl SchedulerService {
    /// Create new scheduler service
    pub async fn new(send_service: SendService) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            send_service,
            current_job_id: Arc::new(RwLock::new(None)),
        })
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<()> {
        let scheduler = self.scheduler.read().await;
        scheduler
            .start()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to start scheduler: {}", e)))?;
        tracing::info!("Send scheduler started");
        Ok(())
    }

    /// Schedule the daily send, replacing any existing schedule
    pub async fn schedule_send(&self, cron_expr: &str, enabled: bool) -> Result<()> {
        if !enabled {
            self.cancel_send().await?;
            tracing::info!("Scheduled sends disabled");
            return Ok(());
        }

        let send_service = self.send_service.clone();

        let job = Job::new_async_tz(cron_expr, Local, move |_uuid, _l| {
            let send_service = send_service.clone();
            Box::pin(async move {
                tracing::info!("Running scheduled send");

                match send_service.send_previous_day().await {
                    Ok(summary) => {
                        tracing::info!("Scheduled send complete ({} entries)", summary.entries);
                    }
                    Err(e) => {
                        tracing::error!("Scheduled send failed at {}: {}", Local::now().to_rfc3339(), e);
                    }
                }
            })
        })
        .map_err(|e| AppError::Scheduler(format!("Failed to create send job '{}': {}", cron_expr, e)))?;

        let job_id = job.guid();

        // The previous job stays registered if the new expression is rejected
        self.cancel_send().await?;

        let scheduler = self.scheduler.write().await;
        scheduler
            .add(job)
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to schedule job: {}", e)))?;

        let mut current_job = self.current_job_id.write().await;
        *current_job = Some(job_id);

        tracing::info!("Daily send scheduled ({})", cron_expr);
        Ok(())
    }

    /// Cancel the scheduled send
    pub async fn cancel_send(&self) -> Result<()> {
        let mut current_job = self.current_job_id.write().await;

        if let Some(job_id) = *current_job {
            let scheduler = self.scheduler.write().await;
            scheduler
                .remove(&job_id)
                .await
                .map_err(|e| AppError::Scheduler(format!("Failed to remove job: {}", e)))?;

            *current_job = None;
            tracing::info!("Scheduled send cancelled");
        }

        Ok(())
    }

    /// Whether a send job is currently registered
    pub async fn is_scheduled(&self) -> bool {
        self.current_job_id.read().await.is_some()
    }

    /// Shutdown scheduler gracefully
    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.write().await;
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to shutdown scheduler: {}", e)))?;
        tracing::info!("Send scheduler shutdown");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ArchiveBuilder, Uploader};
    use crate::storage::StoragePaths;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_test_scheduler(url: String) -> (SchedulerService, StoragePaths, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp_dir.path().to_path_buf());
        paths.ensure_base().unwrap();

        let uploader = Uploader::new(url, Duration::from_secs(5)).unwrap();
        let sender = SendService::new(ArchiveBuilder::new(paths.clone()), uploader);
        let scheduler = SchedulerService::new(sender).await.unwrap();
        (scheduler, paths, temp_dir)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_schedule_and_cancel() {
        let (scheduler, _paths, _temp) =
            create_test_scheduler("http://127.0.0.1:9/upload".to_string()).await;

        scheduler.schedule_send("0 0 0 * * *", true).await.unwrap();
        assert!(scheduler.is_scheduled().await);

        scheduler.cancel_send().await.unwrap();
        assert!(!scheduler.is_scheduled().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_disabled_schedule_registers_nothing() {
        let (scheduler, _paths, _temp) =
            create_test_scheduler("http://127.0.0.1:9/upload".to_string()).await;

        scheduler.schedule_send("0 0 0 * * *", false).await.unwrap();
        assert!(!scheduler.is_scheduled().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_cron_rejected() {
        let (scheduler, _paths, _temp) =
            create_test_scheduler("http://127.0.0.1:9/upload".to_string()).await;

        let result = scheduler.schedule_send("not a schedule", true).await;
        assert!(matches!(result, Err(AppError::Scheduler(_))));
        assert!(!scheduler.is_scheduled().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_cron_keeps_existing_job() {
        let (scheduler, _paths, _temp) =
            create_test_scheduler("http://127.0.0.1:9/upload".to_string()).await;

        scheduler.schedule_send("0 0 0 * * *", true).await.unwrap();
        assert!(scheduler.schedule_send("not a schedule", true).await.is_err());
        assert!(scheduler.is_scheduled().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_scheduled_job_uploads_previous_day() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let (scheduler, paths, _temp) =
            create_test_scheduler(format!("{}/upload", server.uri())).await;

        let yesterday = crate::services::sender::previous_day(Local::now());
        let dir = paths.attachment_dir(yesterday, "note-a");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.txt"), b"tick").unwrap();
        std::fs::write(paths.journal_path(yesterday), b"[]").unwrap();

        scheduler.start().await.unwrap();
        scheduler.schedule_send("* * * * * *", true).await.unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        scheduler.shutdown().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(!requests.is_empty());
    }
}

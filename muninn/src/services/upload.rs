//! Upload service
//!
//! POSTs an archive body to the collector. Exactly `200 OK` counts as
//! success; any other status, connection failure or timeout is a
//! `Transport` error. Retrying is left to the caller.

use crate::config::ARCHIVE_CONTENT_TYPE;
use crate::error::{AppError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// HTTP client for the collector endpoint
#[derive(Clone)]
pub struct Uploader {
    client: Client,
    url: String,
}

impl Uploader {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send `body` in a single POST
    pub async fn upload(&self, body: impl Into<reqwest::Body>) -> Result<()> {
        tracing::info!("Uploading archive to {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::Transport(describe(&e)))?;

        let status = response.status();

        // Drain the body so the connection can be reused
        if let Err(e) = response.bytes().await {
            tracing::debug!("Failed to drain collector response: {}", e);
        }

        if status != StatusCode::OK {
            return Err(AppError::Transport(status.to_string()));
        }

        tracing::info!("Archive accepted by collector");
        Ok(())
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    }
}

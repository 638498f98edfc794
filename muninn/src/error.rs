//! Error types for Muninn
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to the host UI as plain messages.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No attachments found for {0}")]
    NoAttachments(NaiveDate),

    #[error("Upload failed: {0}")]
    Transport(String),

    #[error("Invalid note id: {0:?}")]
    InvalidNoteId(String),

    #[error("A send is already in progress")]
    SendInProgress,

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// True when the archive consumer hung up before the producer finished.
    pub(crate) fn is_consumer_gone(&self) -> bool {
        matches!(self, AppError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}

impl From<walkdir::Error> for AppError {
    fn from(err: walkdir::Error) -> Self {
        AppError::Io(err.into())
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

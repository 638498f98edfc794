//! Journal models
//!
//! Rust structs representing journal entries.
//! Field names follow the camelCase layout of the on-disk journal documents.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A captured thought with zero or more attachments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub timestamp: DateTime<Local>,
}

impl Note {
    /// Create a note stamped with the current local time
    pub fn new(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self::with_timestamp(text, attachments, Local::now())
    }

    /// Create a note with an explicit creation instant
    pub fn with_timestamp(
        text: impl Into<String>,
        attachments: Vec<Attachment>,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            attachments,
            timestamp,
        }
    }

    /// Calendar day that owns this note's journal and attachment directory
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// File attached to a note
///
/// Before materialization the bytes come either from `data` or from an
/// absolute source path in `file_path`. Afterwards `file_path` is relative
/// to the base directory and `data` is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub file_name: String,
    /// Declared MIME type, advisory only
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_path: String,
    /// Raw payload, accepted from callers but never written to the journal
    #[serde(default, skip_serializing, deserialize_with = "bytes_or_null")]
    pub data: Vec<u8>,
}

fn bytes_or_null<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<u8>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Attachment {
    /// Attachment carried as in-memory bytes
    pub fn from_bytes(file_name: impl Into<String>, file_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            file_type: file_type.into(),
            file_path: String::new(),
            data,
        }
    }

    /// Attachment copied from an existing file on disk
    pub fn from_path(
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_type: file_type.into(),
            file_path: source.into(),
            data: Vec::new(),
        }
    }
}

/// Search hit returned to the capture UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub excerpt: String,
    pub full_text: String,
}

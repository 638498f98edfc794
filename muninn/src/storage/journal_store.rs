//! Per-day journal persistence
//!
//! Each calendar day is one JSON document holding the ordered list of notes
//! captured that day. Appends are read-modify-write of the whole document,
//! so writers for the same day are serialized through a per-day lock.

use crate::error::{AppError, Result};
use crate::models::Note;
use crate::storage::StoragePaths;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only store of daily journals
#[derive(Clone)]
pub struct JournalStore {
    paths: StoragePaths,
    day_locks: Arc<Mutex<HashMap<NaiveDate, Arc<Mutex<()>>>>>,
}

impl JournalStore {
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            day_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Append a materialized note to the journal of its creation day
    pub async fn append(&self, note: &Note) -> Result<()> {
        if let Some(attachment) = note
            .attachments
            .iter()
            .find(|a| !a.data.is_empty() || a.file_path.is_empty())
        {
            return Err(AppError::Generic(format!(
                "Attachment {} of note {} has not been materialized",
                attachment.file_name, note.id
            )));
        }

        let day = note.day();
        let lock = self.day_lock(day).await;
        let _guard = lock.lock().await;

        let path = self.paths.journal_path(day);
        let mut notes = read_journal(&path).await?;

        if notes.iter().any(|existing| existing.id == note.id) {
            return Err(AppError::Generic(format!(
                "Note {} already exists in journal for {}",
                note.id, day
            )));
        }

        notes.push(note.clone());
        write_journal(&path, &notes).await?;

        tracing::debug!("Appended note {} to {:?} ({} total)", note.id, path, notes.len());

        Ok(())
    }

    /// Notes captured on `date`, in capture order. Empty if no journal exists.
    pub async fn read_day(&self, date: NaiveDate) -> Result<Vec<Note>> {
        read_journal(&self.paths.journal_path(date)).await
    }

    async fn day_lock(&self, day: NaiveDate) -> Arc<Mutex<()>> {
        let mut locks = self.day_locks.lock().await;
        Arc::clone(locks.entry(day).or_default())
    }
}

async fn read_journal(path: &Path) -> Result<Vec<Note>> {
    let data = match fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let notes: Option<Vec<Note>> = serde_json::from_slice(&data)?;
    Ok(notes.unwrap_or_default())
}

/// Replace the journal via a synced temp file and rename
async fn write_journal(path: &Path, notes: &[Note]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let content = serde_json::to_vec_pretty(notes)?;

    let temp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(&content).await?;
    file.sync_all().await?;

    fs::rename(&temp_path, path).await?;

    Ok(())
}

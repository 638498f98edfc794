//! Attachment materialization
//!
//! Writes each attachment of a note to
//! `attachments/<date>/<note-id>/<file-name>` and swaps the in-memory
//! payload for a path relative to the base directory.

use crate::config::{MAX_FILE_NAME_CHARS, PLACEHOLDER_FILE_PREFIX};
use crate::error::Result;
use crate::models::{Attachment, Note};
use crate::storage::paths::validate_note_id;
use crate::storage::StoragePaths;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Writes note attachments beneath the per-day attachment tree
#[derive(Clone)]
pub struct AttachmentStore {
    paths: StoragePaths,
}

impl AttachmentStore {
    pub fn new(paths: StoragePaths) -> Self {
        Self { paths }
    }

    /// Materialize every attachment of `note`.
    ///
    /// The note is only rewritten once all attachments are on disk; on error
    /// it is left untouched and must not be journaled. A note directory
    /// created by a failed call is removed again.
    pub async fn materialize(&self, note: &mut Note) -> Result<()> {
        validate_note_id(&note.id)?;

        if note.attachments.is_empty() {
            return Ok(());
        }

        let day = note.day();
        let dir = self.paths.attachment_dir(day, &note.id);
        let created = !fs::try_exists(&dir).await?;
        fs::create_dir_all(&dir).await?;

        let written = self.write_attachments(note, day, &dir).await;
        match written {
            Ok(stored) => {
                note.attachments = stored;
                tracing::info!(
                    "Materialized {} attachment(s) for note {}",
                    note.attachments.len(),
                    note.id
                );
                Ok(())
            }
            Err(e) => {
                if created {
                    if let Err(cleanup) = fs::remove_dir_all(&dir).await {
                        tracing::warn!("Failed to remove partial attachments {:?}: {}", dir, cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    async fn write_attachments(&self, note: &Note, day: NaiveDate, dir: &Path) -> Result<Vec<Attachment>> {
        let mut stored = Vec::with_capacity(note.attachments.len());
        let mut used = HashSet::new();

        for (index, attachment) in note.attachments.iter().enumerate() {
            let file_name = unique_file_name(storage_file_name(&attachment.file_name, index), &used);
            let dest = dir.join(&file_name);

            if !attachment.data.is_empty() {
                write_durably(&dest, &attachment.data).await?;
            } else if !attachment.file_path.is_empty() {
                copy_durably(Path::new(&attachment.file_path), &dest).await?;
            } else {
                write_durably(&dest, &[]).await?;
            }

            tracing::debug!("Materialized attachment {} for note {}", file_name, note.id);

            let relative = self.paths.relative_attachment_path(day, &note.id, &file_name);
            used.insert(file_name.clone());
            stored.push(Attachment {
                file_name,
                file_type: attachment.file_type.clone(),
                file_path: relative.to_string_lossy().into_owned(),
                data: Vec::new(),
            });
        }

        Ok(stored)
    }
}

/// Stored name for the attachment at `index`: the sanitized name, or
/// `attachment_<index>` when nothing usable remains.
pub fn storage_file_name(file_name: &str, index: usize) -> String {
    let safe = sanitize_filename(file_name);
    if safe.is_empty() || safe == "." || safe == ".." {
        format!("{}{}", PLACEHOLDER_FILE_PREFIX, index)
    } else {
        safe
    }
}

/// `name`, or `<stem>_<n><ext>` with the first free `n` when another
/// attachment of the same note already took it
fn unique_file_name(name: String, used: &HashSet<String>) -> String {
    if !used.contains(&name) {
        return name;
    }

    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name.as_str(), ""),
    };

    let mut n = 1;
    loop {
        let candidate = format!("{}_{}{}", stem, n, ext);
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Strip path separators and NUL so a name cannot leave its note directory
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| *c != '/' && *c != '\\' && *c != '\0')
        .take(MAX_FILE_NAME_CHARS)
        .collect()
}

async fn write_durably(dest: &Path, data: &[u8]) -> Result<()> {
    let mut file = fs::File::create(dest).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

async fn copy_durably(source: &Path, dest: &Path) -> Result<()> {
    let mut src = fs::File::open(source).await?;
    let mut file = fs::File::create(dest).await?;
    let copied = tokio::io::copy(&mut src, &mut file).await?;
    file.sync_all().await?;

    tracing::debug!("Copied {} bytes from {:?}", copied, source);
    Ok(())
}

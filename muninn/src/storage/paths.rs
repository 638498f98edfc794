//! Storage path resolution
//!
//! Layout under the base directory:
//!
//! ```text
//! <base>/<YYYY-MM-DD>.json
//! <base>/attachments/<YYYY-MM-DD>/<note-id>/<file-name>
//! ```

use crate::config::{APP_DIR_NAME, APP_DIR_NAME_WINDOWS, ATTACHMENTS_DIR, DAY_FORMAT};
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use std::path::{Component, Path, PathBuf};

/// Resolves the base directory and the per-day paths beneath it
#[derive(Debug, Clone)]
pub struct StoragePaths {
    base: PathBuf,
}

impl StoragePaths {
    /// Resolve the platform base directory under the user's home and create it
    pub fn resolve() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Generic("Failed to get user home directory".to_string()))?;

        let paths = Self::new(home.join(platform_dir_name()));
        paths.ensure_base()?;
        Ok(paths)
    }

    /// Use an explicit base directory (not created until `ensure_base`)
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Create the base directory if missing. Idempotent.
    pub fn ensure_base(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base)?;
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// `<base>/<date>.json`
    pub fn journal_path(&self, date: NaiveDate) -> PathBuf {
        self.base.join(journal_file_name(date))
    }

    /// `<base>/attachments/<date>`
    pub fn attachments_root(&self, date: NaiveDate) -> PathBuf {
        self.base.join(ATTACHMENTS_DIR).join(day_key(date))
    }

    /// `<base>/attachments/<date>/<note-id>`
    pub fn attachment_dir(&self, date: NaiveDate, note_id: &str) -> PathBuf {
        self.attachments_root(date).join(note_id)
    }

    /// `attachments/<date>/<note-id>/<file-name>`, relative to the base directory
    pub fn relative_attachment_path(&self, date: NaiveDate, note_id: &str, file_name: &str) -> PathBuf {
        Path::new(ATTACHMENTS_DIR)
            .join(day_key(date))
            .join(note_id)
            .join(file_name)
    }
}

/// Note ids name a directory, so they must be a single plain path component
pub fn validate_note_id(id: &str) -> Result<()> {
    let mut components = Path::new(id).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if !single || id.contains(['/', '\\', '\0']) {
        return Err(AppError::InvalidNoteId(id.to_string()));
    }

    Ok(())
}

/// ISO date used as the per-day key
pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

fn journal_file_name(date: NaiveDate) -> String {
    format!("{}.json", day_key(date))
}

fn platform_dir_name() -> &'static str {
    if cfg!(windows) {
        APP_DIR_NAME_WINDOWS
    } else {
        APP_DIR_NAME
    }
}

//! Application configuration constants
//!
//! Central location for directory names, collector defaults and the
//! resource limits used by the archive pipeline.

// ===== Storage Layout =====

/// Application directory under the user's home on Unix-like systems
pub const APP_DIR_NAME: &str = ".muninn";

/// Application directory under the user's home on Windows
pub const APP_DIR_NAME_WINDOWS: &str = "Muninn";

/// Sub-directory of the base directory holding materialized attachments
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Settings file name inside the base directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Date format used for journal file names and attachment directories
pub const DAY_FORMAT: &str = "%Y-%m-%d";

// ===== Collector =====

/// Collector endpoint receiving the daily archive
pub const DEFAULT_COLLECTOR_URL: &str = "http://127.0.0.1:8000/upload";

/// Upper bound on a single upload, in seconds
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 300;

/// Accepted range for the configurable upload timeout, in seconds
pub const MIN_UPLOAD_TIMEOUT_SECS: u64 = 1;
pub const MAX_UPLOAD_TIMEOUT_SECS: u64 = 3_600;

/// Content type of the archive body
pub const ARCHIVE_CONTENT_TYPE: &str = "application/octet-stream";

// ===== Scheduling =====

/// Six-field cron expression (sec min hour dom month dow), local time.
/// Fires at midnight.
pub const DEFAULT_SEND_SCHEDULE: &str = "0 0 0 * * *";

// ===== Search =====

/// Maximum characters of note text shown in a search excerpt
pub const SEARCH_EXCERPT_CHARS: usize = 200;

/// Appended to excerpts that were cut short
pub const EXCERPT_ELLIPSIS: &str = "...";

// ===== Attachments =====

/// Maximum length of a stored attachment file name
pub const MAX_FILE_NAME_CHARS: usize = 255;

/// Prefix of synthesized attachment names (`attachment_<index>`)
pub const PLACEHOLDER_FILE_PREFIX: &str = "attachment_";

// ===== Archive Streaming =====

/// Size of each compressed chunk handed to the upload body
pub const ARCHIVE_CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the archive producer and the HTTP body.
/// Memory held by the pipe is bounded by capacity * chunk size.
pub const ARCHIVE_CHANNEL_CAPACITY: usize = 8;

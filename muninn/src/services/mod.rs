//! Services module
//!
//! Business logic coordinating storage, archiving and upload.

pub mod archive;
pub mod notes;
pub mod scheduler;
pub mod sender;
pub mod settings;
pub mod upload;

pub use archive::{ArchiveBuilder, ArchiveSummary};
pub use notes::NotesService;
pub use scheduler::SchedulerService;
pub use sender::{SendService, SendState, SendStatus};
pub use settings::{AppSettings, SettingsService};
pub use upload::Uploader;

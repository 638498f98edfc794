//! Storage module
//!
//! On-disk layout, attachment materialization and the daily journal.

pub mod attachment_store;
pub mod journal_store;
pub mod paths;

pub use attachment_store::AttachmentStore;
pub use journal_store::JournalStore;
pub use paths::StoragePaths;

//! Muninn library
//!
//! Daily thought journal: captured notes and their attachments are stored
//! per day under the user's home directory, and each day is bundled into a
//! gzip-compressed tar archive that is uploaded to a collector.

pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

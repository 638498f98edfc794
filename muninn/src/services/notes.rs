//! Notes service
//!
//! Capture pipeline (materialize attachments, then journal the note) and
//! search over a day's journal.

use crate::config::{EXCERPT_ELLIPSIS, SEARCH_EXCERPT_CHARS};
use crate::error::Result;
use crate::models::{Attachment, Note, SearchResult};
use crate::storage::{AttachmentStore, JournalStore};
use chrono::{Local, NaiveDate};

/// Service for capturing and searching notes
#[derive(Clone)]
pub struct NotesService {
    attachments: AttachmentStore,
    journal: JournalStore,
}

impl NotesService {
    pub fn new(attachments: AttachmentStore, journal: JournalStore) -> Self {
        Self {
            attachments,
            journal,
        }
    }

    /// Capture a new note stamped with the current time
    pub async fn capture_note(&self, text: String, attachments: Vec<Attachment>) -> Result<Note> {
        self.capture(Note::new(text, attachments)).await
    }

    /// Materialize the note's attachments, then append it to its day's journal.
    /// Nothing is journaled if any attachment fails.
    pub async fn capture(&self, mut note: Note) -> Result<Note> {
        tracing::info!(
            "Capturing note {} with {} attachment(s)",
            note.id,
            note.attachments.len()
        );

        self.attachments.materialize(&mut note).await?;
        self.journal.append(&note).await?;

        tracing::info!("Note captured successfully: {}", note.id);

        Ok(note)
    }

    /// All notes captured on `date`
    pub async fn read_day(&self, date: NaiveDate) -> Result<Vec<Note>> {
        self.journal.read_day(date).await
    }

    /// Search today's journal
    pub async fn search_today(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search_day(Local::now().date_naive(), query).await
    }

    /// Case-insensitive substring search over the text of one day's notes
    pub async fn search_day(&self, date: NaiveDate, query: &str) -> Result<Vec<SearchResult>> {
        let notes = self.journal.read_day(date).await?;
        let query_lower = query.to_lowercase();

        let results: Vec<SearchResult> = notes
            .into_iter()
            .filter(|note| note.text.to_lowercase().contains(&query_lower))
            .map(|note| SearchResult {
                id: note.id,
                excerpt: excerpt(&note.text),
                full_text: note.text,
            })
            .collect();

        tracing::debug!("Search {:?} on {} matched {} note(s)", query, date, results.len());

        Ok(results)
    }
}

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(SEARCH_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], EXCERPT_ELLIPSIS),
        None => text.to_string(),
    }
}

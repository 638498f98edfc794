//! Integration tests for Muninn
//!
//! These tests verify end-to-end functionality including:
//! - Capture into the daily journal
//! - Attachment materialization
//! - Archive contents and streaming upload to a collector

use chrono::{Local, NaiveDate, TimeZone};
use flate2::read::GzDecoder;
use futures::StreamExt;
use muninn::error::AppError;
use muninn::models::{Attachment, Note};
use muninn::services::{ArchiveBuilder, NotesService, SendService, SendState, Uploader};
use muninn::storage::{AttachmentStore, JournalStore, StoragePaths};
use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn new_year() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn at_new_year(hour: u32, minute: u32) -> chrono::DateTime<Local> {
    Local.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).single().unwrap()
}

/// Helper to create a notes service over a fresh storage root
fn create_test_notes() -> (NotesService, StoragePaths, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let paths = StoragePaths::new(temp_dir.path().join("base"));
    paths.ensure_base().unwrap();

    let notes = NotesService::new(
        AttachmentStore::new(paths.clone()),
        JournalStore::new(paths.clone()),
    );
    (notes, paths, temp_dir)
}

fn send_service_for(paths: &StoragePaths, server: &MockServer) -> SendService {
    let uploader =
        Uploader::new(format!("{}/upload", server.uri()), Duration::from_secs(10)).unwrap();
    SendService::new(ArchiveBuilder::new(paths.clone()), uploader)
}

fn untar(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let mut entries = BTreeMap::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        entries.insert(name, data);
    }
    entries
}

#[tokio::test]
async fn test_capture_text_only_note() {
    let (notes, _paths, _temp) = create_test_notes();

    notes
        .capture(Note::with_timestamp("buy milk", vec![], at_new_year(9, 0)))
        .await
        .unwrap();

    let day = notes.read_day(new_year()).await.unwrap();
    assert_eq!(day.len(), 1);
    assert_eq!(day[0].text, "buy milk");
    assert!(day[0].attachments.is_empty());
}

#[tokio::test]
async fn test_capture_bytes_attachment_gets_placeholder() {
    let (notes, paths, _temp) = create_test_notes();

    let note = notes
        .capture(Note::with_timestamp(
            "",
            vec![Attachment::from_bytes("", "", vec![0x01, 0x02])],
            at_new_year(9, 0),
        ))
        .await
        .unwrap();

    let stored = &note.attachments[0];
    assert!(stored.file_path.ends_with("attachment_0"));

    let on_disk = std::fs::read(paths.base_dir().join(&stored.file_path)).unwrap();
    assert_eq!(on_disk, vec![0x01, 0x02]);
}

#[tokio::test]
async fn test_appends_are_durable_and_ordered() {
    let (notes, paths, temp) = create_test_notes();
    let source = temp.path().join("scan.pdf");
    std::fs::write(&source, b"%PDF-1.7").unwrap();

    let mut captured = Vec::new();
    for i in 0..5u32 {
        let attachments = match i % 3 {
            0 => vec![],
            1 => vec![Attachment::from_bytes("", "text/plain", format!("body {}", i).into_bytes())],
            _ => vec![Attachment::from_path("scan.pdf", "application/pdf", source.to_string_lossy())],
        };
        let note = notes
            .capture(Note::with_timestamp(format!("note {}", i), attachments, at_new_year(10, i)))
            .await
            .unwrap();
        captured.push(note.id);
    }

    let day = notes.read_day(new_year()).await.unwrap();
    let ids: Vec<String> = day.iter().map(|n| n.id.clone()).collect();
    assert_eq!(ids, captured);

    for note in &day {
        for attachment in &note.attachments {
            assert!(attachment.data.is_empty());
            assert!(!attachment.file_path.is_empty());
            assert!(paths.base_dir().join(&attachment.file_path).is_file());
        }
    }
}

#[tokio::test]
async fn test_journal_never_contains_raw_bytes() {
    let (notes, paths, _temp) = create_test_notes();

    notes
        .capture(Note::with_timestamp(
            "secret bytes",
            vec![Attachment::from_bytes("blob.bin", "", vec![0xAB; 64])],
            at_new_year(11, 0),
        ))
        .await
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(paths.journal_path(new_year())).unwrap()).unwrap();
    let attachment = &raw[0]["attachments"][0];
    assert!(attachment.get("data").is_none());
    assert!(attachment["filePath"].as_str().unwrap().contains("blob.bin"));
}

#[tokio::test]
async fn test_concurrent_captures_keep_both_notes() {
    let (notes, _paths, _temp) = create_test_notes();

    let a = {
        let notes = notes.clone();
        tokio::spawn(async move {
            notes
                .capture(Note::with_timestamp("first", vec![], at_new_year(12, 0)))
                .await
        })
    };
    let b = {
        let notes = notes.clone();
        tokio::spawn(async move {
            notes
                .capture(Note::with_timestamp("second", vec![], at_new_year(12, 0)))
                .await
        })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let day = notes.read_day(new_year()).await.unwrap();
    let mut texts: Vec<&str> = day.iter().map(|n| n.text.as_str()).collect();
    texts.sort();
    assert_eq!(texts, vec!["first", "second"]);
}

#[tokio::test]
async fn test_archive_matches_storage_tree() {
    let (notes, paths, _temp) = create_test_notes();

    let first = notes
        .capture(Note::with_timestamp(
            "two files",
            vec![
                Attachment::from_bytes("a.txt", "text/plain", b"alpha".to_vec()),
                Attachment::from_bytes("b.txt", "text/plain", b"beta".to_vec()),
            ],
            at_new_year(13, 0),
        ))
        .await
        .unwrap();
    let second = notes
        .capture(Note::with_timestamp(
            "one file",
            vec![Attachment::from_bytes("", "", vec![9, 9, 9])],
            at_new_year(13, 5),
        ))
        .await
        .unwrap();

    let archive = ArchiveBuilder::new(paths.clone()).build(new_year()).await.unwrap();
    let mut stream = archive.stream;
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        bytes.extend(chunk.unwrap());
    }
    archive.producer.finish().await.unwrap();

    let entries = untar(&bytes);
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[&format!("{}/a.txt", first.id)], b"alpha");
    assert_eq!(entries[&format!("{}/b.txt", first.id)], b"beta");
    assert_eq!(entries[&format!("{}/attachment_0", second.id)], vec![9, 9, 9]);
    assert_eq!(
        entries["2024-01-01.json"],
        std::fs::read(paths.journal_path(new_year())).unwrap()
    );
}

#[tokio::test]
async fn test_same_named_attachments_are_all_archived() {
    let (notes, paths, _temp) = create_test_notes();

    let note = notes
        .capture(Note::with_timestamp(
            "two pastes",
            vec![
                Attachment::from_bytes("image.png", "image/png", b"FIRST".to_vec()),
                Attachment::from_bytes("image.png", "image/png", b"SECOND".to_vec()),
            ],
            at_new_year(13, 30),
        ))
        .await
        .unwrap();

    let archive = ArchiveBuilder::new(paths.clone()).build(new_year()).await.unwrap();
    let mut stream = archive.stream;
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        bytes.extend(chunk.unwrap());
    }
    archive.producer.finish().await.unwrap();

    let entries = untar(&bytes);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[&format!("{}/image.png", note.id)], b"FIRST");
    assert_eq!(entries[&format!("{}/image_1.png", note.id)], b"SECOND");
}

#[tokio::test]
async fn test_send_without_attachments_makes_no_request() {
    let (notes, paths, _temp) = create_test_notes();
    notes
        .capture(Note::with_timestamp("text only", vec![], at_new_year(14, 0)))
        .await
        .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sender = send_service_for(&paths, &server);
    let result = sender.send_day(new_year()).await;

    assert!(matches!(result, Err(AppError::NoAttachments(d)) if d == new_year()));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_send_delivers_archive_to_collector() {
    let (notes, paths, _temp) = create_test_notes();
    let note = notes
        .capture(Note::with_timestamp(
            "for the collector",
            vec![Attachment::from_bytes("photo.png", "image/png", vec![0x89, 0x50, 0x4E, 0x47])],
            at_new_year(15, 0),
        ))
        .await
        .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("Content-Type", "application/octet-stream"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sender = send_service_for(&paths, &server);
    sender.send_day(new_year()).await.unwrap();
    assert_eq!(sender.status().await.state, SendState::Done);

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    let entries = untar(&requests[0].body);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[&format!("{}/photo.png", note.id)], vec![0x89, 0x50, 0x4E, 0x47]);
    assert!(entries.contains_key("2024-01-01.json"));
}

#[tokio::test]
async fn test_status_mapping_leaves_storage_untouched() {
    let (notes, paths, _temp) = create_test_notes();
    notes
        .capture(Note::with_timestamp(
            "keep me",
            vec![Attachment::from_bytes("k.txt", "", b"kept".to_vec())],
            at_new_year(16, 0),
        ))
        .await
        .unwrap();
    let journal_before = std::fs::read(paths.journal_path(new_year())).unwrap();

    for status in [201u16, 204, 302, 400, 404, 500] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let result = send_service_for(&paths, &server).send_day(new_year()).await;
        assert!(
            matches!(result, Err(AppError::Transport(_))),
            "status {} should fail",
            status
        );
    }

    assert_eq!(std::fs::read(paths.journal_path(new_year())).unwrap(), journal_before);
    assert_eq!(notes.read_day(new_year()).await.unwrap().len(), 1);
}

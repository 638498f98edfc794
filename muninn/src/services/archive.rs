//! Archive service
//!
//! Streams one day's attachment tree and journal as a gzip-compressed tar.
//! The archive is produced on a blocking task that writes fixed-size chunks
//! into a bounded channel; the upload body drains the other end, so memory
//! use does not depend on the size of the day's data.
//!
//! Entry names:
//! - attachments are relative to `attachments/<date>` (`<note-id>/<file>`)
//! - the journal is relative to the base directory (`<date>.json`)

use crate::config::{ARCHIVE_CHANNEL_CAPACITY, ARCHIVE_CHUNK_SIZE};
use crate::error::{AppError, Result};
use crate::storage::StoragePaths;
use chrono::NaiveDate;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures::Stream;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

type Chunk = io::Result<Vec<u8>>;

/// What the producer wrote into a finished archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub entries: usize,
    /// Uncompressed size of all archived files
    pub bytes: u64,
}

/// Compressed archive bytes, in order. A failed build ends with an `Err` item.
pub struct ArchiveStream {
    rx: mpsc::Receiver<Chunk>,
}

impl Stream for ArchiveStream {
    type Item = Chunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl From<ArchiveStream> for reqwest::Body {
    fn from(stream: ArchiveStream) -> Self {
        reqwest::Body::wrap_stream(stream)
    }
}

/// Handle on the task writing the archive
pub struct ArchiveProducer {
    handle: JoinHandle<Result<ArchiveSummary>>,
}

impl ArchiveProducer {
    /// Wait for the producer and return its outcome
    pub async fn finish(self) -> Result<ArchiveSummary> {
        self.handle
            .await
            .map_err(|e| AppError::Generic(format!("Archive task failed: {}", e)))?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// An archive being built for one day
pub struct Archive {
    pub date: NaiveDate,
    pub stream: ArchiveStream,
    pub producer: ArchiveProducer,
}

/// Builds daily archives from the storage tree
#[derive(Clone)]
pub struct ArchiveBuilder {
    paths: StoragePaths,
}

impl ArchiveBuilder {
    pub fn new(paths: StoragePaths) -> Self {
        Self { paths }
    }

    /// Start streaming the archive for `date`.
    ///
    /// Fails with `NoAttachments` if nothing was captured with attachments
    /// that day; in that case no producer is started.
    pub async fn build(&self, date: NaiveDate) -> Result<Archive> {
        let attachments_root = self.paths.attachments_root(date);

        match tokio::fs::metadata(&attachments_root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(AppError::NoAttachments(date)),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(AppError::NoAttachments(date)),
            Err(e) => return Err(e.into()),
        }

        let sources = ArchiveSources {
            attachments_root,
            base_dir: self.paths.base_dir().to_path_buf(),
            journal: self.paths.journal_path(date),
        };

        let (tx, rx) = mpsc::channel(ARCHIVE_CHANNEL_CAPACITY);
        let handle = tokio::task::spawn_blocking(move || produce(sources, tx));

        tracing::info!("Started archive for {}", date);

        Ok(Archive {
            date,
            stream: ArchiveStream { rx },
            producer: ArchiveProducer { handle },
        })
    }
}

struct ArchiveSources {
    attachments_root: PathBuf,
    base_dir: PathBuf,
    journal: PathBuf,
}

fn produce(sources: ArchiveSources, tx: mpsc::Sender<Chunk>) -> Result<ArchiveSummary> {
    let result = write_archive(&sources, ChannelWriter::new(tx.clone()));

    match &result {
        Ok(summary) => {
            tracing::debug!(
                "Archive complete: {} entries, {} bytes uncompressed",
                summary.entries,
                summary.bytes
            );
        }
        Err(e) if e.is_consumer_gone() => {
            tracing::warn!("Archive consumer closed before the archive was complete");
        }
        Err(e) => {
            tracing::error!("Archive build failed: {}", e);
            let kind = match e {
                AppError::Io(io_err) => io_err.kind(),
                _ => ErrorKind::Other,
            };
            // Surface the failure to the reader so the upload aborts
            let _ = tx.blocking_send(Err(io::Error::new(kind, e.to_string())));
        }
    }

    result
}

fn write_archive(sources: &ArchiveSources, writer: ChannelWriter) -> Result<ArchiveSummary> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut tar = tar::Builder::new(encoder);
    let mut summary = ArchiveSummary::default();

    for entry in WalkDir::new(&sources.attachments_root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = relative_name(entry.path(), &sources.attachments_root)?;
        append_file(&mut tar, entry.path(), name, &mut summary)?;
    }

    let journal_name = relative_name(&sources.journal, &sources.base_dir)?;
    append_file(&mut tar, &sources.journal, journal_name, &mut summary)?;

    let encoder = tar.into_inner()?;
    let mut writer = encoder.finish()?;
    writer.flush()?;

    Ok(summary)
}

fn append_file<W: Write>(
    tar: &mut tar::Builder<W>,
    path: &Path,
    name: &Path,
    summary: &mut ArchiveSummary,
) -> Result<()> {
    let mut file = std::fs::File::open(path)?;
    let size = file.metadata()?.len();

    tar.append_file(name, &mut file)?;

    summary.entries += 1;
    summary.bytes += size;
    tracing::debug!("Archived {:?} ({} bytes)", name, size);

    Ok(())
}

fn relative_name<'a>(path: &'a Path, root: &Path) -> Result<&'a Path> {
    path.strip_prefix(root).map_err(|_| {
        AppError::Generic(format!("{:?} is not under {:?}", path, root))
    })
}

/// `Write` adapter that hands fixed-size chunks to the async side.
/// Blocks while the channel is full.
struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
    buf: Vec<u8>,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<Chunk>) -> Self {
        Self {
            tx,
            buf: Vec::with_capacity(ARCHIVE_CHUNK_SIZE),
        }
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(ARCHIVE_CHUNK_SIZE));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(ErrorKind::BrokenPipe, "archive consumer closed"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = ARCHIVE_CHUNK_SIZE - self.buf.len();
        let n = room.min(data.len());
        self.buf.extend_from_slice(&data[..n]);

        if self.buf.len() == ARCHIVE_CHUNK_SIZE {
            self.send_buffered()?;
        }

        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.send_buffered()
    }
}

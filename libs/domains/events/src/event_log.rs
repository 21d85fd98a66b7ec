//! Event log backends: no-op, in-memory and JSON-lines file

use crate::error::IngestError;
use crate::models::EventRecord;
use crate::repository::EventLog;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Keeps nothing. Used when no durable log is configured: appends always
/// succeed and there is nothing to replay.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventLog;

#[async_trait]
impl EventLog for NoopEventLog {
    async fn append(&self, _records: &[EventRecord]) -> Result<(), IngestError> {
        Ok(())
    }

    async fn replay(&self) -> Result<Vec<EventRecord>, IngestError> {
        Ok(Vec::new())
    }

    async fn compact_before(&self, _cutoff: NaiveDate) -> Result<usize, IngestError> {
        Ok(0)
    }

    fn backend(&self) -> &'static str {
        "none"
    }
}

/// Tracks which `(day, user_id)` pairs before a cutoff were already kept.
///
/// Records older than the cutoff only matter for presence, so one per pair
/// is enough to rebuild the counts.
struct Compactor {
    cutoff: NaiveDate,
    kept: HashSet<(NaiveDate, String)>,
}

impl Compactor {
    fn new(cutoff: NaiveDate) -> Self {
        Self {
            cutoff,
            kept: HashSet::new(),
        }
    }

    fn keep(&mut self, record: &EventRecord) -> bool {
        let day = record.day();
        day >= self.cutoff || self.kept.insert((day, record.user_id.clone()))
    }
}

/// Process-local log, bounded by [`EventLog::compact_before`].
///
/// State does not survive a restart; tests use it to observe appends.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    records: parking_lot::Mutex<Vec<EventRecord>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn append(&self, records: &[EventRecord]) -> Result<(), IngestError> {
        self.records.lock().extend_from_slice(records);
        Ok(())
    }

    async fn replay(&self) -> Result<Vec<EventRecord>, IngestError> {
        Ok(self.records.lock().clone())
    }

    async fn compact_before(&self, cutoff: NaiveDate) -> Result<usize, IngestError> {
        let mut compactor = Compactor::new(cutoff);
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| compactor.keep(r));
        records.shrink_to_fit();
        Ok(before - records.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// One JSON object per line, appended and fsynced per batch.
pub struct JsonlEventLog {
    path: PathBuf,
    compact_path: PathBuf,
    file: Mutex<File>,
}

impl JsonlEventLog {
    /// Open (or create) the log file, creating parent directories as needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let file = open_append(&path).await?;

        let mut compact_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("events"));
        compact_name.push(".compact");
        let compact_path = path.with_file_name(compact_name);

        info!(path = %path.display(), "Opened event log");

        Ok(Self {
            path,
            compact_path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Line reader over the log, or `None` if the file is gone.
    async fn lines(&self) -> Result<Option<tokio::io::Lines<BufReader<File>>>, IngestError> {
        match File::open(&self.path).await {
            Ok(file) => Ok(Some(BufReader::new(file).lines())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn parse_line(&self, line: &str, number: usize) -> Option<EventRecord> {
        if line.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<EventRecord>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    line = number,
                    error = %e,
                    "Skipping malformed event log line"
                );
                None
            }
        }
    }
}

async fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path).await
}

#[async_trait]
impl EventLog for JsonlEventLog {
    async fn append(&self, records: &[EventRecord]) -> Result<(), IngestError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::with_capacity(records.len() * 256);
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        let mut file = self.file.lock().await;
        file.write_all(&buf).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }

    async fn replay(&self) -> Result<Vec<EventRecord>, IngestError> {
        // Hold the writer lock so replay never observes a half-written batch.
        let _guard = self.file.lock().await;
        let Some(mut lines) = self.lines().await? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        let mut number = 0;
        while let Some(line) = lines.next_line().await? {
            number += 1;
            records.extend(self.parse_line(&line, number));
        }
        Ok(records)
    }

    /// Rewrites the file through a sibling `.compact` file, then swaps it in
    /// and reopens the append handle. Malformed lines are dropped.
    async fn compact_before(&self, cutoff: NaiveDate) -> Result<usize, IngestError> {
        let mut file = self.file.lock().await;
        let Some(mut lines) = self.lines().await? else {
            return Ok(0);
        };

        let mut compactor = Compactor::new(cutoff);
        let mut out = BufWriter::new(File::create(&self.compact_path).await?);
        let mut removed = 0;
        let mut number = 0;

        while let Some(line) = lines.next_line().await? {
            number += 1;
            match self.parse_line(&line, number) {
                Some(record) if compactor.keep(&record) => {
                    out.write_all(line.as_bytes()).await?;
                    out.write_all(b"\n").await?;
                }
                Some(_) => removed += 1,
                None if line.trim().is_empty() => {}
                None => removed += 1,
            }
        }

        if removed == 0 {
            drop(out);
            fs::remove_file(&self.compact_path).await?;
            return Ok(0);
        }

        out.flush().await?;
        out.into_inner().sync_all().await?;
        fs::rename(&self.compact_path, &self.path).await?;
        *file = open_append(&self.path).await?;

        info!(path = %self.path.display(), removed, %cutoff, "Compacted event log");
        Ok(removed)
    }

    fn backend(&self) -> &'static str {
        "jsonl"
    }
}

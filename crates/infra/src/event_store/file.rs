//! File-backed event store: one JSON line per committed batch.
//!
//! A line is either complete (the batch committed) or torn (the process died
//! mid-write, the batch did not commit). Torn tails are cut off on open.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use dispensary_core::AggregateId;

use super::in_memory::StreamLog;
use super::r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend};

#[derive(Debug, Serialize, Deserialize)]
struct JournalLine {
    events: Vec<StoredEvent>,
}

#[derive(Debug)]
struct FileState {
    file: File,
    len: u64,
    log: StreamLog,
}

/// Durable append-only event store backed by a JSON-lines journal.
#[derive(Debug)]
pub struct FileEventStore {
    path: PathBuf,
    state: RwLock<FileState>,
}

impl FileEventStore {
    /// Open (or create) the journal at `path` and replay it into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EventStoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let mut log = StreamLog::default();
        let mut valid_len = 0usize;
        let mut batches = 0usize;

        let mut rest = bytes.as_slice();
        while !rest.is_empty() {
            let Some(newline) = rest.iter().position(|&b| b == b'\n') else {
                // Unterminated final line: a write that never finished.
                break;
            };
            let line = &rest[..newline];

            if !line.iter().all(u8::is_ascii_whitespace) {
                let parsed: JournalLine = serde_json::from_slice(line).map_err(|e| {
                    EventStoreError::Corrupt(format!("line at byte {valid_len}: {e}"))
                })?;
                for event in parsed.events {
                    log.restore(event)?;
                }
                batches += 1;
            }

            valid_len += newline + 1;
            rest = &rest[newline + 1..];
        }

        if valid_len < bytes.len() {
            tracing::warn!(
                journal = %path.display(),
                dropped_bytes = bytes.len() - valid_len,
                "truncating torn journal tail"
            );
            file.set_len(valid_len as u64)?;
            file.sync_data()?;
        }

        tracing::debug!(
            journal = %path.display(),
            batches,
            events = log.last_position(),
            "journal replayed"
        );

        Ok(Self {
            path,
            state: RwLock::new(FileState {
                file,
                len: valid_len as u64,
                log,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileState {
    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.file.write_all(line)?;
        self.file.flush()?;
        self.file.sync_data()
    }
}

impl EventStore for FileEventStore {
    fn append_batch(&self, batch: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError> {
        let mut state = self.state.write().map_err(|_| EventStoreError::Poisoned)?;

        let staged = state.log.stage(batch)?;
        if staged.is_empty() {
            return Ok(staged);
        }

        let record = JournalLine { events: staged };
        let mut line = serde_json::to_vec(&record).map_err(|e| {
            EventStoreError::InvalidAppend(format!("journal line serialization failed: {e}"))
        })?;
        line.push(b'\n');

        if let Err(err) = state.write_line(&line) {
            // Cut off whatever part of the line made it to disk.
            let len = state.len;
            if let Err(rollback) = state.file.set_len(len) {
                tracing::warn!(journal = %self.path.display(), error = %rollback, "journal rollback failed");
            }
            return Err(err.into());
        }

        state.len += line.len() as u64;
        state.log.commit(record.events.clone());

        Ok(record.events)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let state = self.state.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(state.log.load_stream(aggregate_id))
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let state = self.state.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(state.log.load_all())
    }
}

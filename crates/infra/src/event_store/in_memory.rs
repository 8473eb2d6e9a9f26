use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use dispensary_core::AggregateId;

use super::r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend};

/// Stream bookkeeping shared by the in-memory and file-backed stores.
///
/// `stage()` validates a batch and assigns sequence numbers and positions
/// without touching anything; `commit()` makes staged events visible. The
/// file store writes to disk between the two.
#[derive(Debug, Default)]
pub(crate) struct StreamLog {
    all: Vec<StoredEvent>,
    streams: HashMap<AggregateId, Vec<usize>>,
}

impl StreamLog {
    pub(crate) fn current_version(&self, aggregate_id: AggregateId) -> u64 {
        self.streams
            .get(&aggregate_id)
            .and_then(|idx| idx.last())
            .map(|&i| self.all[i].sequence_number)
            .unwrap_or(0)
    }

    pub(crate) fn last_position(&self) -> u64 {
        self.all.last().map(|e| e.position).unwrap_or(0)
    }

    fn stream_type(&self, aggregate_id: AggregateId) -> Option<&str> {
        self.streams
            .get(&aggregate_id)
            .and_then(|idx| idx.first())
            .map(|&i| self.all[i].aggregate_type.as_str())
    }

    pub(crate) fn stage(&self, batch: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError> {
        let mut seen = HashSet::new();

        // Check every stream before assigning anything.
        for append in &batch {
            if !seen.insert(append.aggregate_id) {
                return Err(EventStoreError::InvalidAppend(format!(
                    "stream {} appears twice in one batch",
                    append.aggregate_id
                )));
            }

            let current = self.current_version(append.aggregate_id);
            if !append.expected_version.matches(current) {
                return Err(EventStoreError::Concurrency(format!(
                    "stream {}: expected {:?}, found {current}",
                    append.aggregate_id, append.expected_version
                )));
            }

            let Some(first) = append.events.first() else {
                continue;
            };
            let aggregate_type = first.aggregate_type.as_str();

            for (idx, e) in append.events.iter().enumerate() {
                if e.aggregate_id != append.aggregate_id {
                    return Err(EventStoreError::InvalidAppend(format!(
                        "event at index {idx} targets {} inside the batch for {}",
                        e.aggregate_id, append.aggregate_id
                    )));
                }
                if e.aggregate_type != aggregate_type {
                    return Err(EventStoreError::AggregateTypeMismatch(format!(
                        "batch for {} contains multiple aggregate_types (index {idx})",
                        append.aggregate_id
                    )));
                }
            }

            // Enforce aggregate type stability across the stream.
            if let Some(existing) = self.stream_type(append.aggregate_id) {
                if existing != aggregate_type {
                    return Err(EventStoreError::AggregateTypeMismatch(format!(
                        "stream aggregate_type is '{existing}', attempted append with '{aggregate_type}'"
                    )));
                }
            }
        }

        let mut position = self.last_position();
        let mut staged = Vec::new();
        for append in batch {
            let mut next = self.current_version(append.aggregate_id) + 1;
            for e in append.events {
                position += 1;
                staged.push(StoredEvent {
                    event_id: e.event_id,
                    aggregate_id: e.aggregate_id,
                    aggregate_type: e.aggregate_type,
                    sequence_number: next,
                    position,
                    event_type: e.event_type,
                    event_version: e.event_version,
                    occurred_at: e.occurred_at,
                    payload: e.payload,
                });
                next += 1;
            }
        }

        Ok(staged)
    }

    pub(crate) fn commit(&mut self, staged: Vec<StoredEvent>) {
        for e in staged {
            self.streams
                .entry(e.aggregate_id)
                .or_default()
                .push(self.all.len());
            self.all.push(e);
        }
    }

    /// Re-admit an event read back from disk, checking it continues both its
    /// stream and the journal.
    pub(crate) fn restore(&mut self, event: StoredEvent) -> Result<(), EventStoreError> {
        let expected_seq = self.current_version(event.aggregate_id) + 1;
        if event.sequence_number != expected_seq {
            return Err(EventStoreError::Corrupt(format!(
                "stream {} jumps to sequence {} (expected {expected_seq})",
                event.aggregate_id, event.sequence_number
            )));
        }
        let expected_pos = self.last_position() + 1;
        if event.position != expected_pos {
            return Err(EventStoreError::Corrupt(format!(
                "journal jumps to position {} (expected {expected_pos})",
                event.position
            )));
        }

        self.commit(vec![event]);
        Ok(())
    }

    pub(crate) fn load_stream(&self, aggregate_id: AggregateId) -> Vec<StoredEvent> {
        self.streams
            .get(&aggregate_id)
            .map(|idx| idx.iter().map(|&i| self.all[i].clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn load_all(&self) -> Vec<StoredEvent> {
        self.all.clone()
    }
}

/// In-memory append-only event store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    log: RwLock<StreamLog>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append_batch(&self, batch: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError> {
        let mut log = self.log.write().map_err(|_| EventStoreError::Poisoned)?;

        let staged = log.stage(batch)?;
        log.commit(staged.clone());

        Ok(staged)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let log = self.log.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(log.load_stream(aggregate_id))
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let log = self.log.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(log.load_all())
    }
}

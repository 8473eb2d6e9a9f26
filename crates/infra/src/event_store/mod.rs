//! Append-only event store boundary.
//!
//! Streams are keyed by aggregate id. `append_batch` commits several streams as
//! one unit, which is what keeps a dispense (stock, prescription, requisition)
//! all-or-nothing.

pub mod file;
pub mod in_memory;
pub mod r#trait;

pub use file::FileEventStore;
pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};

//! Dispensing engine: event store, stock ledger, prescriptions and fulfillment.
//!
//! [`Dispensary`] is the entry point. Everything below it is public so the
//! pieces can be driven and tested on their own.

pub mod config;
pub mod dispensary;
pub mod error;
pub mod event_store;
pub mod fulfillment;
pub mod journal;
pub mod locks;
pub mod prescriptions;
pub mod projections;
pub mod restocking;
pub mod stock_ledger;

#[cfg(test)]
mod integration_tests;

pub use config::{ConfigError, DispensaryConfig};
pub use dispensary::Dispensary;
pub use error::{DispensaryError, DispensaryResult};
pub use event_store::{EventStore, EventStoreError, FileEventStore, InMemoryEventStore};
pub use journal::Journal;
pub use prescriptions::PrescriptionBook;
pub use projections::RequisitionRegistry;
pub use stock_ledger::{StockLedger, StockSession};

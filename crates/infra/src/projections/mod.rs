//! Read models rebuilt from the journal.

pub mod requisitions;

pub use requisitions::RequisitionRegistry;

//! Requisitions: write-once records of stock entering and leaving inventory.
//!
//! Records are created once, committed together with the stock events they
//! explain, and never updated or deleted.

pub mod requisition;

pub use requisition::{
    DispensedLine, IncomingRequisition, OutgoingRequisition, REQUISITION_AGGREGATE, Requisition,
    RequisitionEvent, RequisitionKind,
};

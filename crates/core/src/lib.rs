//! `dispensary-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the aggregate/entity traits, the domain error model and the
//! positive `Quantity` value object shared by stock and prescription logic.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, EntityKind};
pub use id::{
    AggregateId, EmployeeId, MedicationId, PatientId, PrescribedLineId, PrescriptionId,
    RequisitionId, SupplierId,
};
pub use value_object::{Quantity, ValueObject};

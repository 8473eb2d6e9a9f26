//! Domain error model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{MedicationId, PrescribedLineId, PrescriptionId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Kind of entity a lookup failed for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Medication,
    Prescription,
    Requisition,
    Patient,
    Employee,
    Supplier,
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            EntityKind::Medication => "medication",
            EntityKind::Prescription => "prescription",
            EntityKind::Requisition => "requisition",
            EntityKind::Patient => "patient",
            EntityKind::Employee => "employee",
            EntityKind::Supplier => "supplier",
        };
        f.write_str(name)
    }
}

/// Domain-level error.
///
/// Apart from `Storage`, every variant is a deterministic business-rule or
/// input failure; none of them is worth retrying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced entity does not resolve.
    #[error("{kind} {id} not found")]
    EntityNotFound { kind: EntityKind, id: String },

    /// A conflict occurred (e.g. stale version / duplicate id).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A quantity-taking operation received zero or a negative amount.
    #[error("quantity must be a positive integer (got {0})")]
    InvalidQuantity(i64),

    /// Stock would go negative.
    #[error(
        "insufficient stock for medication {medication_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        medication_id: MedicationId,
        requested: i64,
        available: i64,
    },

    #[error("prescription {0} has no lines to dispense")]
    EmptyPrescription(PrescriptionId),

    #[error("prescription {prescription_id} expired on {expired_on}")]
    ExpiredPrescription {
        prescription_id: PrescriptionId,
        expired_on: NaiveDate,
    },

    #[error("line {line_id} not found on prescription {prescription_id}")]
    LineNotFound {
        prescription_id: PrescriptionId,
        line_id: PrescribedLineId,
    },

    /// The prescription was already dispensed; its lines are frozen.
    #[error("prescription {0} has already been dispensed")]
    PrescriptionDispensed(PrescriptionId),

    /// A record collection could not be read or written.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn not_found(kind: EntityKind, id: impl core::fmt::Display) -> Self {
        Self::EntityNotFound {
            kind,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_reports_both_quantities() {
        let medication_id = MedicationId::new();
        let err = DomainError::InsufficientStock {
            medication_id,
            requested: 80,
            available: 70,
        };
        let msg = err.to_string();
        assert!(msg.contains("requested 80"));
        assert!(msg.contains("available 70"));
        assert!(msg.contains(&medication_id.to_string()));
    }

    #[test]
    fn not_found_names_the_entity_kind() {
        let err = DomainError::not_found(EntityKind::Employee, "abc");
        assert_eq!(err.to_string(), "employee abc not found");
    }
}

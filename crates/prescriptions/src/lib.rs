//! Prescriptions domain module (event-sourced).
//!
//! A `Prescription` owns an ordered list of `PrescribedLine`s. Lines are
//! editable until the prescription is dispensed; after that they are frozen
//! and a second dispense is refused. Stock is never touched here.

pub mod prescription;

pub use prescription::{
    AddLine, EditPrescription, IssuePrescription, LineAdded, LineRemoved, MarkDispensed,
    MarkedDispensed, PRESCRIPTION_AGGREGATE, PrescribedLine, Prescription, PrescriptionCommand,
    PrescriptionEdited, PrescriptionEvent, PrescriptionIssued, RemoveLine,
};

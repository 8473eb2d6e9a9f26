//! Inventory domain module (event-sourced).
//!
//! Holds the `Medication` aggregate, whose on-hand quantity can only move
//! through `ReceiveStock` / `ReleaseStock` and never drops below zero. Pure
//! domain logic: no IO, no locking, no storage.

pub mod medication;

pub use medication::{
    MEDICATION_AGGREGATE, Medication, MedicationCommand, MedicationEvent, MedicationRegistered,
    MedicationUpdated, ReceiveStock, RegisterMedication, ReleaseStock, StockReceived,
    StockReleased, UpdateMedication,
};

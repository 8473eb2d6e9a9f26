//! Parties module: patients, employees and suppliers.
//!
//! These are plain records kept by CRUD collaborators. The dispensing core
//! only ever refers to them by id, so they are not event-sourced; durable
//! deployments keep each collection in a JSON file ([`FileRepository`]).

pub mod directory;
pub mod employee;
pub mod file;
pub mod patient;
pub mod record;
pub mod repository;
pub mod supplier;

pub use directory::{Directory, EMPLOYEES_FILE, PATIENTS_FILE, SUPPLIERS_FILE};
pub use employee::Employee;
pub use file::FileRepository;
pub use patient::{Patient, patient_by_national_id};
pub use record::PartyRecord;
pub use repository::{InMemoryRepository, Repository};
pub use supplier::Supplier;

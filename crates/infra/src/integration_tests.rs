//! End-to-end tests through [`Dispensary`]:
//! restock → prescribe → dispense → requisition history → restart.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use dispensary_core::{DomainError, DomainResult, EmployeeId, EntityKind, MedicationId, PatientId};
use dispensary_parties::{Directory, Employee, Patient, Repository, Supplier};
use dispensary_requisitions::{Requisition, RequisitionKind};

use crate::dispensary::Dispensary;
use crate::error::DispensaryError;
use crate::event_store::{EventStore, InMemoryEventStore};

struct Fixture {
    directory: Directory,
    pharmacist: EmployeeId,
    patient: PatientId,
}

fn fixture() -> Fixture {
    let directory = Directory::in_memory();
    let pharmacist = directory
        .employees
        .create(Employee::new("Dana Whitfield", "555-0101", "EMP-0042"))
        .unwrap()
        .id;
    let patient = directory
        .patients
        .create(Patient::new("Jorge Almeida", "555-0199", "HC-778812", "NID-3301"))
        .unwrap()
        .id;

    Fixture {
        directory,
        pharmacist,
        patient,
    }
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

fn domain(err: &DispensaryError) -> &DomainError {
    err.domain().expect("domain error")
}

fn stocked(
    dispensary: &Dispensary<impl EventStore>,
    employee: EmployeeId,
    name: &str,
    quantity: i64,
) -> MedicationId {
    let medication = dispensary
        .register_medication_at(name, "capsule", None, at(1))
        .unwrap();
    if quantity > 0 {
        dispensary
            .record_incoming_at(employee, medication.id_typed(), quantity, at(1))
            .unwrap();
    }
    medication.id_typed()
}

#[test]
fn restock_then_dispense_until_stock_runs_short() {
    let fx = fixture();
    let dispensary = Dispensary::in_memory(fx.directory.clone()).unwrap();

    let amoxicillin = stocked(&dispensary, fx.pharmacist, "Amoxicillin 500mg", 0);
    assert_eq!(dispensary.quantity_on_hand(amoxicillin).unwrap(), 0);

    dispensary
        .record_incoming_at(fx.pharmacist, amoxicillin, 100, at(2))
        .unwrap();
    assert_eq!(dispensary.quantity_on_hand(amoxicillin).unwrap(), 100);

    let first = dispensary
        .issue_prescription_at(fx.patient, "Sinus infection", "LIC-9001", date(20), at(3))
        .unwrap();
    dispensary
        .add_prescribed_line_at(first.id_typed(), amoxicillin, "1 capsule", "3x daily for 10 days", 30, at(3))
        .unwrap();

    let outgoing = dispensary
        .dispense_at(first.id_typed(), fx.pharmacist, at(4))
        .unwrap();
    assert_eq!(outgoing.quantity_of(amoxicillin), 30);
    assert_eq!(dispensary.quantity_on_hand(amoxicillin).unwrap(), 70);

    let second = dispensary
        .issue_prescription_at(fx.patient, "Follow-up course", "LIC-9001", date(20), at(5))
        .unwrap();
    dispensary
        .add_prescribed_line_at(second.id_typed(), amoxicillin, "2 capsules", "2x daily for 20 days", 80, at(5))
        .unwrap();

    let err = dispensary
        .dispense_at(second.id_typed(), fx.pharmacist, at(6))
        .unwrap_err();
    assert_eq!(
        domain(&err),
        &DomainError::InsufficientStock {
            medication_id: amoxicillin,
            requested: 80,
            available: 70,
        }
    );
    assert_eq!(dispensary.quantity_on_hand(amoxicillin).unwrap(), 70);
    assert!(!dispensary.prescription(second.id_typed()).unwrap().is_dispensed());
}

#[test]
fn failed_dispense_releases_nothing() {
    let fx = fixture();
    let dispensary = Dispensary::in_memory(fx.directory.clone()).unwrap();
    let plenty = stocked(&dispensary, fx.pharmacist, "Ibuprofen 200mg", 50);
    let scarce = stocked(&dispensary, fx.pharmacist, "Insulin glargine", 2);

    let rx = dispensary
        .issue_prescription_at(fx.patient, "Diabetes and pain", "LIC-12", date(30), at(2))
        .unwrap();
    dispensary
        .add_prescribed_line_at(rx.id_typed(), plenty, "1 tablet", "as needed", 10, at(2))
        .unwrap();
    dispensary
        .add_prescribed_line_at(rx.id_typed(), scarce, "10 units", "nightly", 5, at(2))
        .unwrap();

    let events = store_len(&dispensary);
    let err = dispensary.dispense_at(rx.id_typed(), fx.pharmacist, at(3)).unwrap_err();
    assert!(matches!(domain(&err), DomainError::InsufficientStock { requested: 5, available: 2, .. }));

    assert_eq!(dispensary.quantity_on_hand(plenty).unwrap(), 50);
    assert_eq!(dispensary.quantity_on_hand(scarce).unwrap(), 2);
    assert_eq!(store_len(&dispensary), events);
    assert!(dispensary.outgoing_requisitions().unwrap().is_empty());
}

#[test]
fn dispense_records_one_outgoing_requisition_and_freezes_lines() {
    let fx = fixture();
    let dispensary = Dispensary::in_memory(fx.directory.clone()).unwrap();
    let a = stocked(&dispensary, fx.pharmacist, "Metformin 850mg", 60);
    let b = stocked(&dispensary, fx.pharmacist, "Lisinopril 10mg", 30);

    let rx = dispensary
        .issue_prescription_at(fx.patient, "Monthly refill", "LIC-77", date(31), at(2))
        .unwrap();
    dispensary
        .add_prescribed_line_at(rx.id_typed(), a, "1 tablet", "2x daily", 60, at(2))
        .unwrap();
    let rx = dispensary
        .add_prescribed_line_at(rx.id_typed(), b, "1 tablet", "daily", 30, at(2))
        .unwrap();

    let outgoing = dispensary.dispense_at(rx.id_typed(), fx.pharmacist, at(3)).unwrap();
    assert_eq!(outgoing.lines().len(), 2);
    assert_eq!(outgoing.patient_id(), fx.patient);
    assert_eq!(outgoing.prescription_id(), rx.id_typed());

    let history = dispensary.outgoing_for_prescription(rx.id_typed()).unwrap();
    assert_eq!(history, vec![outgoing.clone()]);
    assert_eq!(dispensary.outgoing_for_patient(fx.patient).unwrap().len(), 1);
    assert_eq!(
        dispensary.requisition(outgoing.id()).unwrap(),
        Some(Requisition::Outgoing(outgoing.clone()))
    );

    let err = dispensary.dispense_at(rx.id_typed(), fx.pharmacist, at(4)).unwrap_err();
    assert_eq!(domain(&err), &DomainError::PrescriptionDispensed(rx.id_typed()));

    let line = rx.lines()[0].line_id;
    let err = dispensary
        .remove_prescribed_line_at(rx.id_typed(), line, at(4))
        .unwrap_err();
    assert_eq!(domain(&err), &DomainError::PrescriptionDispensed(rx.id_typed()));

    // header edits stay open
    let edited = dispensary
        .edit_prescription_at(rx.id_typed(), fx.patient, "Monthly refill (March)", "LIC-77", date(31), at(4))
        .unwrap();
    assert_eq!(edited.description(), "Monthly refill (March)");
    assert_eq!(edited.dispensed_by(), Some(outgoing.id()));
    assert_eq!(dispensary.outgoing_requisitions().unwrap().len(), 1);
}

#[test]
fn duplicate_medication_lines_are_checked_cumulatively() {
    let fx = fixture();
    let dispensary = Dispensary::in_memory(fx.directory.clone()).unwrap();
    let med = stocked(&dispensary, fx.pharmacist, "Prednisone 5mg", 25);

    let rx = dispensary
        .issue_prescription_at(fx.patient, "Taper", "LIC-5", date(28), at(2))
        .unwrap();
    dispensary
        .add_prescribed_line_at(rx.id_typed(), med, "4 tablets", "week one", 20, at(2))
        .unwrap();
    dispensary
        .add_prescribed_line_at(rx.id_typed(), med, "2 tablets", "week two", 10, at(2))
        .unwrap();

    let err = dispensary.dispense_at(rx.id_typed(), fx.pharmacist, at(3)).unwrap_err();
    assert_eq!(
        domain(&err),
        &DomainError::InsufficientStock {
            medication_id: med,
            requested: 10,
            available: 5,
        }
    );
    assert_eq!(dispensary.quantity_on_hand(med).unwrap(), 25);

    dispensary.record_incoming_at(fx.pharmacist, med, 5, at(3)).unwrap();
    let outgoing = dispensary.dispense_at(rx.id_typed(), fx.pharmacist, at(3)).unwrap();
    assert_eq!(outgoing.quantity_of(med), 30);
    assert_eq!(dispensary.quantity_on_hand(med).unwrap(), 0);
}

#[test]
fn expired_and_empty_prescriptions_are_refused() {
    let fx = fixture();
    let dispensary = Dispensary::in_memory(fx.directory.clone()).unwrap();
    let med = stocked(&dispensary, fx.pharmacist, "Cetirizine 10mg", 40);

    let empty = dispensary
        .issue_prescription_at(fx.patient, "Allergies", "LIC-3", date(20), at(2))
        .unwrap();
    let err = dispensary.dispense_at(empty.id_typed(), fx.pharmacist, at(3)).unwrap_err();
    assert_eq!(domain(&err), &DomainError::EmptyPrescription(empty.id_typed()));

    let rx = dispensary
        .issue_prescription_at(fx.patient, "Allergies", "LIC-3", date(10), at(2))
        .unwrap();
    dispensary
        .add_prescribed_line_at(rx.id_typed(), med, "1 tablet", "daily", 10, at(2))
        .unwrap();

    let err = dispensary.dispense_at(rx.id_typed(), fx.pharmacist, at(11)).unwrap_err();
    assert_eq!(
        domain(&err),
        &DomainError::ExpiredPrescription {
            prescription_id: rx.id_typed(),
            expired_on: date(10),
        }
    );
    assert_eq!(dispensary.quantity_on_hand(med).unwrap(), 40);

    // still valid on the expiry date itself
    dispensary.dispense_at(rx.id_typed(), fx.pharmacist, at(10)).unwrap();
    assert_eq!(dispensary.quantity_on_hand(med).unwrap(), 30);
}

#[test]
fn unknown_parties_are_rejected_before_anything_is_written() {
    let fx = fixture();
    let dispensary = Dispensary::in_memory(fx.directory.clone()).unwrap();
    let med = stocked(&dispensary, fx.pharmacist, "Omeprazole 20mg", 10);
    let before = store_len(&dispensary);

    let stranger = EmployeeId::new();
    let err = dispensary.record_incoming_at(stranger, med, 5, at(2)).unwrap_err();
    assert_eq!(
        domain(&err),
        &DomainError::not_found(EntityKind::Employee, stranger)
    );

    let nobody = PatientId::new();
    let err = dispensary
        .issue_prescription_at(nobody, "Reflux", "LIC-1", date(20), at(2))
        .unwrap_err();
    assert!(matches!(domain(&err), DomainError::EntityNotFound { kind: EntityKind::Patient, .. }));

    let err = dispensary
        .register_medication_at("Ranitidine", "tablet", Some(dispensary_core::SupplierId::new()), at(2))
        .unwrap_err();
    assert!(matches!(domain(&err), DomainError::EntityNotFound { kind: EntityKind::Supplier, .. }));

    let rx = dispensary
        .issue_prescription_at(fx.patient, "Reflux", "LIC-1", date(20), at(2))
        .unwrap();
    let ghost = MedicationId::new();
    let err = dispensary
        .add_prescribed_line_at(rx.id_typed(), ghost, "1", "daily", 1, at(2))
        .unwrap_err();
    assert!(matches!(domain(&err), DomainError::EntityNotFound { kind: EntityKind::Medication, .. }));

    dispensary
        .add_prescribed_line_at(rx.id_typed(), med, "1 capsule", "daily", 5, at(2))
        .unwrap();
    let err = dispensary.dispense_at(rx.id_typed(), stranger, at(3)).unwrap_err();
    assert!(matches!(domain(&err), DomainError::EntityNotFound { kind: EntityKind::Employee, .. }));

    assert_eq!(dispensary.quantity_on_hand(med).unwrap(), 10);
    // only the prescription header and its line were written
    assert_eq!(store_len(&dispensary), before + 2);
}

#[test]
fn registered_supplier_is_accepted() {
    let fx = fixture();
    let supplier = fx
        .directory
        .suppliers
        .create(Supplier::new("Northwind Pharma", "555-0300", "TAX-88-12"))
        .unwrap();
    let dispensary = Dispensary::in_memory(fx.directory.clone()).unwrap();

    let med = dispensary
        .register_medication_at("Atorvastatin 20mg", "tablet", Some(supplier.id), at(1))
        .unwrap();
    assert_eq!(med.supplier_id(), Some(supplier.id));
}

#[test]
fn concurrent_dispenses_of_scarce_stock_let_exactly_one_through() {
    let fx = fixture();
    let dispensary = Arc::new(Dispensary::in_memory(fx.directory.clone()).unwrap());
    let med = stocked(&*dispensary, fx.pharmacist, "Oseltamivir 75mg", 10);

    let prescriptions: Vec<_> = (0..4)
        .map(|_| {
            let rx = dispensary
                .issue_prescription_at(fx.patient, "Influenza", "LIC-40", date(20), at(2))
                .unwrap();
            dispensary
                .add_prescribed_line_at(rx.id_typed(), med, "1 capsule", "2x daily for 5 days", 10, at(2))
                .unwrap();
            rx.id_typed()
        })
        .collect();

    let barrier = Arc::new(Barrier::new(prescriptions.len()));
    let handles: Vec<_> = prescriptions
        .into_iter()
        .map(|rx| {
            let dispensary = dispensary.clone();
            let barrier = barrier.clone();
            let employee = fx.pharmacist;
            thread::spawn(move || {
                barrier.wait();
                dispensary.dispense_at(rx, employee, at(3))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(domain(err), DomainError::InsufficientStock { .. }));
    }

    assert_eq!(dispensary.quantity_on_hand(med).unwrap(), 0);
    assert_eq!(dispensary.outgoing_requisitions().unwrap().len(), 1);
}

#[test]
fn concurrent_restocks_all_land() {
    let fx = fixture();
    let dispensary = Arc::new(Dispensary::in_memory(fx.directory.clone()).unwrap());
    let med = stocked(&*dispensary, fx.pharmacist, "Paracetamol 500mg", 0);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dispensary = dispensary.clone();
            let employee = fx.pharmacist;
            thread::spawn(move || {
                for _ in 0..10 {
                    dispensary.record_incoming_at(employee, med, 3, at(2)).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(dispensary.quantity_on_hand(med).unwrap(), 240);
    assert_eq!(dispensary.incoming_for_medication(med).unwrap().len(), 80);
}

#[test]
fn subscribers_see_every_committed_event_in_order() {
    let fx = fixture();
    let dispensary = Dispensary::in_memory(fx.directory.clone()).unwrap();
    let subscription = dispensary.subscribe();

    let med = stocked(&dispensary, fx.pharmacist, "Loratadine 10mg", 12);
    let rx = dispensary
        .issue_prescription_at(fx.patient, "Hay fever", "LIC-8", date(20), at(2))
        .unwrap();
    dispensary
        .add_prescribed_line_at(rx.id_typed(), med, "1 tablet", "daily", 12, at(2))
        .unwrap();
    dispensary.dispense_at(rx.id_typed(), fx.pharmacist, at(3)).unwrap();

    let mut seen = Vec::new();
    while let Ok(envelope) = subscription.recv_timeout(Duration::from_millis(200)) {
        seen.push(envelope);
    }

    let types: Vec<&str> = seen.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        vec![
            "inventory.medication.registered",
            "inventory.medication.stock_received",
            "requisitions.requisition.incoming_recorded",
            "prescriptions.prescription.issued",
            "prescriptions.prescription.line_added",
            "inventory.medication.stock_released",
            "prescriptions.prescription.dispensed",
            "requisitions.requisition.outgoing_recorded",
        ]
    );
    assert!(seen.windows(2).all(|w| w[0].position() < w[1].position()));
}

#[test]
fn data_dir_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (pharmacist, patient, med, rx, outgoing) = {
        let dispensary = Dispensary::open_data_dir(dir.path()).unwrap();
        let pharmacist = dispensary
            .directory()
            .employees
            .create(Employee::new("Dana Whitfield", "555-0101", "EMP-0042"))
            .unwrap()
            .id;
        let patient = dispensary
            .directory()
            .patients
            .create(Patient::new("Jorge Almeida", "555-0199", "HC-778812", "NID-3301"))
            .unwrap()
            .id;

        let med = stocked(&dispensary, pharmacist, "Azithromycin 250mg", 12);
        let rx = dispensary
            .issue_prescription_at(patient, "Bronchitis", "LIC-61", date(15), at(2))
            .unwrap();
        dispensary
            .add_prescribed_line_at(rx.id_typed(), med, "2 tablets", "day one, then 1", 6, at(2))
            .unwrap();
        let outgoing = dispensary.dispense_at(rx.id_typed(), pharmacist, at(3)).unwrap();
        (pharmacist, patient, med, rx.id_typed(), outgoing)
    };

    // nothing shared with the first process but the directory on disk
    let reopened = Dispensary::open_data_dir(dir.path()).unwrap();
    assert_eq!(reopened.directory().employees.list().unwrap().len(), 1);
    assert_eq!(reopened.quantity_on_hand(med).unwrap(), 6);
    assert_eq!(reopened.medication(med).unwrap().name(), "Azithromycin 250mg");

    let prescription = reopened.prescription(rx).unwrap();
    assert!(prescription.is_dispensed());
    assert_eq!(prescription.dispensed_by(), Some(outgoing.id()));

    assert_eq!(reopened.requisitions(Some(RequisitionKind::Incoming)).unwrap().len(), 1);
    assert_eq!(reopened.outgoing_requisitions().unwrap(), vec![outgoing]);

    let err = reopened.dispense_at(rx, pharmacist, at(4)).unwrap_err();
    assert_eq!(domain(&err), &DomainError::PrescriptionDispensed(rx));

    let edited = reopened
        .edit_prescription_at(rx, patient, "Bronchitis (reviewed)", "LIC-61", date(15), at(4))
        .unwrap();
    assert_eq!(edited.description(), "Bronchitis (reviewed)");

    // new work continues the same streams
    reopened.record_incoming_at(pharmacist, med, 4, at(5)).unwrap();
    let second = reopened
        .issue_prescription_at(patient, "Follow-up", "LIC-61", date(20), at(5))
        .unwrap();
    reopened
        .add_prescribed_line_at(second.id_typed(), med, "1 tablet", "daily", 3, at(5))
        .unwrap();
    reopened.dispense_at(second.id_typed(), pharmacist, at(6)).unwrap();
    drop(reopened);

    let again = Dispensary::open_data_dir(dir.path()).unwrap();
    assert_eq!(again.quantity_on_hand(med).unwrap(), 7);
    assert_eq!(again.prescriptions_for_patient(patient).unwrap().len(), 2);
}

#[test]
fn restock_with_non_positive_quantity_changes_nothing() {
    let fx = fixture();
    let dispensary = Dispensary::in_memory(fx.directory.clone()).unwrap();
    let med = stocked(&dispensary, fx.pharmacist, "Doxycycline 100mg", 10);
    let events = store_len(&dispensary);

    for quantity in [0, -5] {
        let err = dispensary
            .record_incoming_at(fx.pharmacist, med, quantity, at(2))
            .unwrap_err();
        assert_eq!(domain(&err), &DomainError::InvalidQuantity(quantity));

        assert_eq!(dispensary.quantity_on_hand(med).unwrap(), 10);
        assert_eq!(dispensary.incoming_for_medication(med).unwrap().len(), 1);
        assert_eq!(store_len(&dispensary), events);
    }
}

#[test]
fn prescriptions_are_listed_per_patient() {
    let fx = fixture();
    let other = fx
        .directory
        .patients
        .create(Patient::new("Lena Okafor", "555-0150", "HC-990011", "NID-7710"))
        .unwrap()
        .id;
    let dispensary = Dispensary::in_memory(fx.directory.clone()).unwrap();

    let first = dispensary
        .issue_prescription_at(fx.patient, "Asthma", "LIC-2", date(20), at(2))
        .unwrap();
    dispensary
        .issue_prescription_at(other, "Migraine", "LIC-2", date(20), at(2))
        .unwrap();
    let third = dispensary
        .issue_prescription_at(fx.patient, "Eczema", "LIC-2", date(20), at(3))
        .unwrap();

    let mine: Vec<_> = dispensary
        .prescriptions_for_patient(fx.patient)
        .unwrap()
        .iter()
        .map(|p| p.id_typed())
        .collect();
    assert_eq!(mine, vec![first.id_typed(), third.id_typed()]);
    assert!(dispensary.prescriptions_for_patient(PatientId::new()).unwrap().is_empty());
}

/// Employee collection whose storage cannot be read.
struct UnreadableEmployees;

impl Repository<Employee> for UnreadableEmployees {
    fn get(&self, _id: &EmployeeId) -> DomainResult<Option<Employee>> {
        Err(DomainError::storage("employee repository lock poisoned"))
    }

    fn list(&self) -> DomainResult<Vec<Employee>> {
        Err(DomainError::storage("employee repository lock poisoned"))
    }

    fn create(&self, _entity: Employee) -> DomainResult<Employee> {
        Err(DomainError::storage("employee repository lock poisoned"))
    }

    fn update(&self, _id: &EmployeeId, _entity: Employee) -> DomainResult<Employee> {
        Err(DomainError::storage("employee repository lock poisoned"))
    }

    fn delete(&self, _id: &EmployeeId) -> DomainResult<Employee> {
        Err(DomainError::storage("employee repository lock poisoned"))
    }
}

#[test]
fn unreadable_party_storage_is_not_reported_as_not_found() {
    let fx = fixture();
    let directory = Directory::new(
        fx.directory.patients.clone(),
        Arc::new(UnreadableEmployees),
        fx.directory.suppliers.clone(),
    );
    let dispensary = Dispensary::in_memory(directory).unwrap();
    let med = dispensary
        .register_medication_at("Amlodipine 5mg", "tablet", None, at(1))
        .unwrap()
        .id_typed();

    let err = dispensary
        .record_incoming_at(fx.pharmacist, med, 5, at(2))
        .unwrap_err();
    assert!(matches!(domain(&err), DomainError::Storage(_)));
    assert_eq!(dispensary.quantity_on_hand(med).unwrap(), 0);
}

#[test]
fn manual_adjustments_leave_no_requisition() {
    let fx = fixture();
    let dispensary = Dispensary::in_memory(fx.directory.clone()).unwrap();
    let med = stocked(&dispensary, fx.pharmacist, "Salbutamol inhaler", 0);

    assert_eq!(dispensary.apply_incoming_at(med, 7, at(2)).unwrap(), 7);
    assert_eq!(dispensary.apply_outgoing_at(med, 2, at(2)).unwrap(), 5);

    let err = dispensary.apply_outgoing_at(med, 6, at(2)).unwrap_err();
    assert!(matches!(domain(&err), DomainError::InsufficientStock { requested: 6, available: 5, .. }));
    let err = dispensary.apply_incoming_at(med, 0, at(2)).unwrap_err();
    assert_eq!(domain(&err), &DomainError::InvalidQuantity(0));

    assert!(dispensary.requisitions(None).unwrap().is_empty());
    assert_eq!(dispensary.quantity_on_hand(med).unwrap(), 5);
}

#[test]
fn reading_an_in_memory_store_back_rebuilds_state() {
    let fx = fixture();
    let store = Arc::new(InMemoryEventStore::new());
    let med = {
        let dispensary = Dispensary::open(store.clone(), fx.directory.clone()).unwrap();
        let med = stocked(&dispensary, fx.pharmacist, "Warfarin 5mg", 30);
        dispensary.apply_outgoing_at(med, 4, at(2)).unwrap();
        med
    };

    let rebuilt = Dispensary::open(store, fx.directory).unwrap();
    assert_eq!(rebuilt.quantity_on_hand(med).unwrap(), 26);
    assert_eq!(rebuilt.medications().unwrap().len(), 1);
    assert_eq!(rebuilt.incoming_requisitions().unwrap().len(), 1);
}

fn store_len(dispensary: &Dispensary<impl EventStore>) -> usize {
    dispensary.journal().store().load_all().unwrap().len()
}

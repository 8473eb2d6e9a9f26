//! In-process API of the dispensary.
//!
//! Resolves party ids against the [`Directory`], then hands off to the stock
//! ledger, prescription book, restocking and fulfillment. Every operation that
//! stamps a time has an `*_at` twin taking the timestamp explicitly.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;

use dispensary_core::{
    DomainError, EmployeeId, EntityKind, MedicationId, PatientId, PrescribedLineId,
    PrescriptionId, RequisitionId, SupplierId,
};
use dispensary_events::{EventEnvelope, Subscription};
use dispensary_inventory::Medication;
use dispensary_parties::Directory;
use dispensary_prescriptions::Prescription;
use dispensary_requisitions::{
    IncomingRequisition, OutgoingRequisition, Requisition, RequisitionKind,
};

use crate::config::JOURNAL_FILE;
use crate::error::DispensaryResult;
use crate::event_store::{EventStore, FileEventStore, InMemoryEventStore};
use crate::fulfillment;
use crate::journal::Journal;
use crate::prescriptions::PrescriptionBook;
use crate::restocking;
use crate::stock_ledger::StockLedger;

#[derive(Debug)]
pub struct Dispensary<S> {
    journal: Arc<Journal<S>>,
    ledger: StockLedger<S>,
    book: PrescriptionBook<S>,
    directory: Directory,
}

impl Dispensary<InMemoryEventStore> {
    pub fn in_memory(directory: Directory) -> DispensaryResult<Self> {
        Self::open(InMemoryEventStore::new(), directory)
    }
}

impl Dispensary<FileEventStore> {
    /// Open (or create) the journal file and replay it.
    pub fn open_file(path: impl AsRef<Path>, directory: Directory) -> DispensaryResult<Self> {
        Self::open(FileEventStore::open(path)?, directory)
    }

    /// Open everything kept in `dir`: the journal and the party collections.
    pub fn open_data_dir(dir: impl AsRef<Path>) -> DispensaryResult<Self> {
        let dir = dir.as_ref();
        let directory = Directory::open(dir)?;
        Self::open_file(dir.join(JOURNAL_FILE), directory)
    }
}

impl<S: EventStore> Dispensary<S> {
    /// Replay `store` and start serving operations.
    pub fn open(store: S, directory: Directory) -> DispensaryResult<Self> {
        let journal = Arc::new(Journal::open(store)?);
        let ledger = StockLedger::load(journal.clone())?;
        let book = PrescriptionBook::load(journal.clone())?;

        Ok(Self {
            journal,
            ledger,
            book,
            directory,
        })
    }

    pub fn journal(&self) -> &Journal<S> {
        &self.journal
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Every committed event from now on, with its JSON payload.
    pub fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
        self.journal.subscribe()
    }

    // --- medications -----------------------------------------------------

    pub fn register_medication(
        &self,
        name: &str,
        unit: &str,
        supplier_id: Option<SupplierId>,
    ) -> DispensaryResult<Medication> {
        self.register_medication_at(name, unit, supplier_id, Utc::now())
    }

    pub fn register_medication_at(
        &self,
        name: &str,
        unit: &str,
        supplier_id: Option<SupplierId>,
        at: DateTime<Utc>,
    ) -> DispensaryResult<Medication> {
        if let Some(supplier_id) = supplier_id {
            self.require_supplier(supplier_id)?;
        }
        self.ledger.register(name, unit, supplier_id, at)
    }

    pub fn update_medication(
        &self,
        id: MedicationId,
        name: &str,
        unit: &str,
    ) -> DispensaryResult<Medication> {
        self.update_medication_at(id, name, unit, Utc::now())
    }

    pub fn update_medication_at(
        &self,
        id: MedicationId,
        name: &str,
        unit: &str,
        at: DateTime<Utc>,
    ) -> DispensaryResult<Medication> {
        self.ledger.update(id, name, unit, at)
    }

    /// Manual stock increase without a requisition. Returns the new quantity.
    pub fn apply_incoming(&self, id: MedicationId, quantity: i64) -> DispensaryResult<i64> {
        self.ledger.apply_incoming(id, quantity, Utc::now())
    }

    pub fn apply_incoming_at(
        &self,
        id: MedicationId,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DispensaryResult<i64> {
        self.ledger.apply_incoming(id, quantity, at)
    }

    /// Manual stock decrease without a requisition. Returns the new quantity.
    pub fn apply_outgoing(&self, id: MedicationId, quantity: i64) -> DispensaryResult<i64> {
        self.ledger.apply_outgoing(id, quantity, Utc::now())
    }

    pub fn apply_outgoing_at(
        &self,
        id: MedicationId,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DispensaryResult<i64> {
        self.ledger.apply_outgoing(id, quantity, at)
    }

    pub fn quantity_on_hand(&self, id: MedicationId) -> DispensaryResult<i64> {
        self.ledger.quantity_on_hand(id)
    }

    pub fn medication(&self, id: MedicationId) -> DispensaryResult<Medication> {
        self.ledger.medication(id)
    }

    pub fn medications(&self) -> DispensaryResult<Vec<Medication>> {
        self.ledger.medications()
    }

    // --- restocking ------------------------------------------------------

    pub fn record_incoming(
        &self,
        employee_id: EmployeeId,
        medication_id: MedicationId,
        quantity: i64,
    ) -> DispensaryResult<IncomingRequisition> {
        self.record_incoming_at(employee_id, medication_id, quantity, Utc::now())
    }

    pub fn record_incoming_at(
        &self,
        employee_id: EmployeeId,
        medication_id: MedicationId,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DispensaryResult<IncomingRequisition> {
        self.require_employee(employee_id)?;
        restocking::record_incoming(&self.ledger, employee_id, medication_id, quantity, at)
    }

    // --- prescriptions ---------------------------------------------------

    pub fn issue_prescription(
        &self,
        patient_id: PatientId,
        description: &str,
        prescriber_license: &str,
        expires_on: NaiveDate,
    ) -> DispensaryResult<Prescription> {
        self.issue_prescription_at(patient_id, description, prescriber_license, expires_on, Utc::now())
    }

    pub fn issue_prescription_at(
        &self,
        patient_id: PatientId,
        description: &str,
        prescriber_license: &str,
        expires_on: NaiveDate,
        at: DateTime<Utc>,
    ) -> DispensaryResult<Prescription> {
        self.require_patient(patient_id)?;
        self.book
            .issue(patient_id, description, prescriber_license, expires_on, at)
    }

    /// Administrative header edit. Allowed after dispensing; lines stay frozen.
    pub fn edit_prescription(
        &self,
        id: PrescriptionId,
        patient_id: PatientId,
        description: &str,
        prescriber_license: &str,
        expires_on: NaiveDate,
    ) -> DispensaryResult<Prescription> {
        self.edit_prescription_at(id, patient_id, description, prescriber_license, expires_on, Utc::now())
    }

    pub fn edit_prescription_at(
        &self,
        id: PrescriptionId,
        patient_id: PatientId,
        description: &str,
        prescriber_license: &str,
        expires_on: NaiveDate,
        at: DateTime<Utc>,
    ) -> DispensaryResult<Prescription> {
        self.require_patient(patient_id)?;
        self.book
            .edit(id, patient_id, description, prescriber_license, expires_on, at)
    }

    pub fn add_prescribed_line(
        &self,
        prescription_id: PrescriptionId,
        medication_id: MedicationId,
        dosage: &str,
        period: &str,
        quantity: i64,
    ) -> DispensaryResult<Prescription> {
        self.add_prescribed_line_at(prescription_id, medication_id, dosage, period, quantity, Utc::now())
    }

    pub fn add_prescribed_line_at(
        &self,
        prescription_id: PrescriptionId,
        medication_id: MedicationId,
        dosage: &str,
        period: &str,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DispensaryResult<Prescription> {
        if !self.ledger.contains(medication_id)? {
            return Err(DomainError::not_found(EntityKind::Medication, medication_id).into());
        }
        self.book.add_line(
            prescription_id,
            PrescribedLineId::new(),
            medication_id,
            dosage,
            period,
            quantity,
            at,
        )
    }

    pub fn remove_prescribed_line(
        &self,
        prescription_id: PrescriptionId,
        line_id: PrescribedLineId,
    ) -> DispensaryResult<Prescription> {
        self.remove_prescribed_line_at(prescription_id, line_id, Utc::now())
    }

    pub fn remove_prescribed_line_at(
        &self,
        prescription_id: PrescriptionId,
        line_id: PrescribedLineId,
        at: DateTime<Utc>,
    ) -> DispensaryResult<Prescription> {
        self.book.remove_line(prescription_id, line_id, at)
    }

    pub fn prescription(&self, id: PrescriptionId) -> DispensaryResult<Prescription> {
        self.book.prescription(id)
    }

    pub fn prescriptions(&self) -> DispensaryResult<Vec<Prescription>> {
        self.book.prescriptions()
    }

    pub fn prescriptions_for_patient(
        &self,
        patient_id: PatientId,
    ) -> DispensaryResult<Vec<Prescription>> {
        self.book.for_patient(patient_id)
    }

    // --- dispensing ------------------------------------------------------

    pub fn dispense(
        &self,
        prescription_id: PrescriptionId,
        employee_id: EmployeeId,
    ) -> DispensaryResult<OutgoingRequisition> {
        self.dispense_at(prescription_id, employee_id, Utc::now())
    }

    pub fn dispense_at(
        &self,
        prescription_id: PrescriptionId,
        employee_id: EmployeeId,
        at: DateTime<Utc>,
    ) -> DispensaryResult<OutgoingRequisition> {
        self.require_employee(employee_id)?;
        fulfillment::dispense(&self.ledger, &self.book, employee_id, prescription_id, at)
    }

    // --- requisition history ---------------------------------------------

    pub fn requisition(&self, id: RequisitionId) -> DispensaryResult<Option<Requisition>> {
        Ok(self.journal.registry()?.get(id).cloned())
    }

    pub fn requisitions(&self, kind: Option<RequisitionKind>) -> DispensaryResult<Vec<Requisition>> {
        Ok(self.journal.registry()?.list(kind))
    }

    pub fn incoming_requisitions(&self) -> DispensaryResult<Vec<IncomingRequisition>> {
        Ok(self.journal.registry()?.incoming())
    }

    pub fn outgoing_requisitions(&self) -> DispensaryResult<Vec<OutgoingRequisition>> {
        Ok(self.journal.registry()?.outgoing())
    }

    pub fn incoming_for_medication(
        &self,
        medication_id: MedicationId,
    ) -> DispensaryResult<Vec<IncomingRequisition>> {
        Ok(self.journal.registry()?.incoming_for_medication(medication_id))
    }

    pub fn outgoing_for_prescription(
        &self,
        prescription_id: PrescriptionId,
    ) -> DispensaryResult<Vec<OutgoingRequisition>> {
        Ok(self.journal.registry()?.outgoing_for_prescription(prescription_id))
    }

    pub fn outgoing_for_patient(
        &self,
        patient_id: PatientId,
    ) -> DispensaryResult<Vec<OutgoingRequisition>> {
        Ok(self.journal.registry()?.outgoing_for_patient(patient_id))
    }

    fn require_employee(&self, id: EmployeeId) -> DispensaryResult<()> {
        if !self.directory.employees.exists(&id)? {
            return Err(DomainError::not_found(EntityKind::Employee, id).into());
        }
        Ok(())
    }

    fn require_patient(&self, id: PatientId) -> DispensaryResult<()> {
        if !self.directory.patients.exists(&id)? {
            return Err(DomainError::not_found(EntityKind::Patient, id).into());
        }
        Ok(())
    }

    fn require_supplier(&self, id: SupplierId) -> DispensaryResult<()> {
        if !self.directory.suppliers.exists(&id)? {
            return Err(DomainError::not_found(EntityKind::Supplier, id).into());
        }
        Ok(())
    }
}

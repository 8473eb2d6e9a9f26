use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};

use dispensary_core::{
    Aggregate, AggregateRoot, DomainError, EntityKind, ExpectedVersion, MedicationId, PatientId,
    PrescribedLineId, PrescriptionId,
};
use dispensary_prescriptions::{
    AddLine, EditPrescription, IssuePrescription, PRESCRIPTION_AGGREGATE, Prescription,
    PrescriptionCommand, PrescriptionEvent, RemoveLine,
};

use crate::error::{DispensaryError, DispensaryResult};
use crate::event_store::{EventStore, StreamAppend};
use crate::journal::{Journal, uncommitted};
use crate::locks::LockTable;

/// Prescriptions, one locked cell each.
///
/// Line edits only take the prescription's own lock. Dispensing takes it
/// first and then the medication locks (see `fulfillment`).
#[derive(Debug)]
pub struct PrescriptionBook<S> {
    journal: Arc<Journal<S>>,
    cells: LockTable<PrescriptionId, Prescription>,
}

impl<S: EventStore> PrescriptionBook<S> {
    pub fn load(journal: Arc<Journal<S>>) -> DispensaryResult<Self> {
        let cells = LockTable::new("prescription");
        for prescription in journal.rehydrate_all(PRESCRIPTION_AGGREGATE, |id| {
            Prescription::empty(PrescriptionId::from(id))
        })? {
            cells.insert(prescription.id_typed(), prescription)?;
        }

        Ok(Self { journal, cells })
    }

    pub fn issue(
        &self,
        patient_id: PatientId,
        description: &str,
        prescriber_license: &str,
        expires_on: NaiveDate,
        at: DateTime<Utc>,
    ) -> DispensaryResult<Prescription> {
        let id = PrescriptionId::new();
        let mut prescription = Prescription::empty(id);
        let events = prescription.handle(&PrescriptionCommand::IssuePrescription(
            IssuePrescription {
                prescription_id: id,
                patient_id,
                description: description.to_string(),
                prescriber_license: prescriber_license.to_string(),
                expires_on,
                occurred_at: at,
            },
        ))?;

        self.journal.commit(vec![StreamAppend::new_stream(
            id.aggregate_id(),
            uncommitted(id.aggregate_id(), PRESCRIPTION_AGGREGATE, &events)?,
        )])?;
        for e in &events {
            prescription.apply(e);
        }
        self.cells.insert(id, prescription.clone())?;

        tracing::info!(prescription = %id, patient = %patient_id, "prescription issued");
        Ok(prescription)
    }

    pub fn edit(
        &self,
        id: PrescriptionId,
        patient_id: PatientId,
        description: &str,
        prescriber_license: &str,
        expires_on: NaiveDate,
        at: DateTime<Utc>,
    ) -> DispensaryResult<Prescription> {
        self.execute(
            id,
            PrescriptionCommand::EditPrescription(EditPrescription {
                prescription_id: id,
                patient_id,
                description: description.to_string(),
                prescriber_license: prescriber_license.to_string(),
                expires_on,
                occurred_at: at,
            }),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_line(
        &self,
        id: PrescriptionId,
        line_id: PrescribedLineId,
        medication_id: MedicationId,
        dosage: &str,
        period: &str,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DispensaryResult<Prescription> {
        self.execute(
            id,
            PrescriptionCommand::AddLine(AddLine {
                prescription_id: id,
                line_id,
                medication_id,
                dosage: dosage.to_string(),
                period: period.to_string(),
                quantity,
                occurred_at: at,
            }),
        )
    }

    pub fn remove_line(
        &self,
        id: PrescriptionId,
        line_id: PrescribedLineId,
        at: DateTime<Utc>,
    ) -> DispensaryResult<Prescription> {
        self.execute(
            id,
            PrescriptionCommand::RemoveLine(RemoveLine {
                prescription_id: id,
                line_id,
                occurred_at: at,
            }),
        )
    }

    /// Cell of one prescription, for callers that hold its lock across other work.
    pub fn cell(&self, id: PrescriptionId) -> DispensaryResult<Arc<Mutex<Prescription>>> {
        self.cells
            .cell(&id)?
            .ok_or_else(|| DomainError::not_found(EntityKind::Prescription, id).into())
    }

    pub fn prescription(&self, id: PrescriptionId) -> DispensaryResult<Prescription> {
        self.cells
            .read(&id)?
            .ok_or_else(|| DomainError::not_found(EntityKind::Prescription, id).into())
    }

    pub fn prescriptions(&self) -> DispensaryResult<Vec<Prescription>> {
        self.cells.snapshot()
    }

    pub fn for_patient(&self, patient_id: PatientId) -> DispensaryResult<Vec<Prescription>> {
        Ok(self
            .prescriptions()?
            .into_iter()
            .filter(|p| p.patient_id() == patient_id)
            .collect())
    }

    pub(crate) fn lock_name(&self) -> &'static str {
        self.cells.name()
    }

    /// Handle one command on a locked prescription and commit the result.
    fn execute(
        &self,
        id: PrescriptionId,
        command: PrescriptionCommand,
    ) -> DispensaryResult<Prescription> {
        let cell = self.cell(id)?;
        let mut prescription = cell
            .lock()
            .map_err(|_| DispensaryError::Poisoned(self.cells.name()))?;

        let events = prescription.handle(&command)?;
        self.commit_events(&prescription, &events)?;
        for e in &events {
            prescription.apply(e);
        }

        Ok(prescription.clone())
    }

    fn commit_events(
        &self,
        prescription: &Prescription,
        events: &[PrescriptionEvent],
    ) -> DispensaryResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        self.journal
            .commit(vec![prescription_append(prescription, events)?])?;
        Ok(())
    }
}

/// Stream append for events decided on a locked prescription.
pub(crate) fn prescription_append(
    prescription: &Prescription,
    events: &[PrescriptionEvent],
) -> DispensaryResult<StreamAppend> {
    let id = prescription.id_typed().aggregate_id();
    Ok(StreamAppend::new(
        id,
        ExpectedVersion::Exact(prescription.version()),
        uncommitted(id, PRESCRIPTION_AGGREGATE, events)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::InMemoryEventStore;

    fn test_book() -> PrescriptionBook<InMemoryEventStore> {
        PrescriptionBook::load(Arc::new(Journal::open(InMemoryEventStore::new()).unwrap())).unwrap()
    }

    fn test_expiry() -> NaiveDate {
        (Utc::now() + chrono::Duration::days(30)).date_naive()
    }

    #[test]
    fn issue_then_add_and_remove_lines() {
        let book = test_book();
        let p = book
            .issue(PatientId::new(), "Sinusitis", "CRM 1234", test_expiry(), Utc::now())
            .unwrap();
        let line_id = PrescribedLineId::new();

        let p = book
            .add_line(p.id_typed(), line_id, MedicationId::new(), "1 tab", "12/12h", 14, Utc::now())
            .unwrap();
        assert_eq!(p.lines().len(), 1);

        let p = book.remove_line(p.id_typed(), line_id, Utc::now()).unwrap();
        assert!(p.lines().is_empty());
        assert_eq!(book.prescription(p.id_typed()).unwrap().version(), 3);
    }

    #[test]
    fn rejected_line_is_not_committed() {
        let book = test_book();
        let p = book
            .issue(PatientId::new(), "Sinusitis", "CRM 1234", test_expiry(), Utc::now())
            .unwrap();

        let err = book
            .add_line(p.id_typed(), PrescribedLineId::new(), MedicationId::new(), "1 tab", "daily", 0, Utc::now())
            .unwrap_err();
        assert_eq!(err.domain(), Some(&DomainError::InvalidQuantity(0)));
        assert_eq!(book.journal.store().load_all().unwrap().len(), 1);
    }

    #[test]
    fn for_patient_filters_by_owner() {
        let book = test_book();
        let patient = PatientId::new();
        book.issue(patient, "a", "CRM 1", test_expiry(), Utc::now()).unwrap();
        book.issue(PatientId::new(), "b", "CRM 1", test_expiry(), Utc::now()).unwrap();
        book.issue(patient, "c", "CRM 1", test_expiry(), Utc::now()).unwrap();

        let mine: Vec<_> = book
            .for_patient(patient)
            .unwrap()
            .iter()
            .map(|p| p.description().to_string())
            .collect();
        assert_eq!(mine, vec!["a", "c"]);
    }

    #[test]
    fn unknown_prescription_is_not_found() {
        let book = test_book();
        let err = book
            .remove_line(PrescriptionId::new(), PrescribedLineId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::EntityNotFound {
                kind: EntityKind::Prescription,
                ..
            })
        ));
    }
}

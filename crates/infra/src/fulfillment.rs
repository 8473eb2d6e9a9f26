//! Prescription fulfillment: dispense every line of a prescription or none.
//!
//! Lock order is the prescription first, then its medications in id order.
//! The stock check, the releases, the prescription's `MarkedDispensed` event
//! and the outgoing requisition all land in one journal batch.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use dispensary_core::{
    Aggregate, DomainError, EmployeeId, MedicationId, PrescriptionId, RequisitionId,
};
use dispensary_inventory::{MedicationCommand, ReleaseStock};
use dispensary_prescriptions::{MarkDispensed, PrescriptionCommand};
use dispensary_requisitions::{
    DispensedLine, OutgoingRequisition, REQUISITION_AGGREGATE, RequisitionEvent,
};

use crate::error::{DispensaryError, DispensaryResult};
use crate::event_store::{EventStore, StreamAppend};
use crate::journal::uncommitted;
use crate::prescriptions::{PrescriptionBook, prescription_append};
use crate::stock_ledger::StockLedger;

/// Dispense `prescription_id` on behalf of `employee_id`.
///
/// Fails, changing nothing, with:
/// - `PrescriptionDispensed` if it was dispensed before
/// - `EmptyPrescription` if it has no lines
/// - `ExpiredPrescription` if its expiry date is before `at`'s date
/// - `InsufficientStock` for the first line whose medication cannot cover it.
///   Lines sharing a medication are checked against what the earlier ones
///   leave behind.
pub fn dispense<S: EventStore>(
    ledger: &StockLedger<S>,
    book: &PrescriptionBook<S>,
    employee_id: EmployeeId,
    prescription_id: PrescriptionId,
    at: DateTime<Utc>,
) -> DispensaryResult<OutgoingRequisition> {
    let cell = book.cell(prescription_id)?;
    let mut prescription = cell
        .lock()
        .map_err(|_| DispensaryError::Poisoned(book.lock_name()))?;

    let requisition_id = RequisitionId::new();
    let marked = prescription
        .handle(&PrescriptionCommand::MarkDispensed(MarkDispensed {
            prescription_id,
            requisition_id,
            occurred_at: at,
        }))
        .inspect_err(|err| {
            tracing::warn!(prescription = %prescription_id, error = %err, "dispense rejected");
        })?;

    let lines = prescription.lines().to_vec();
    let medication_ids: Vec<MedicationId> = lines.iter().map(|l| l.medication_id).collect();
    let patient_id = prescription.patient_id();
    let prescription_stream = prescription_append(&prescription, &marked)?;

    let result = ledger.transact(&medication_ids, |session| {
        let mut remaining: BTreeMap<MedicationId, i64> = BTreeMap::new();
        for line in &lines {
            let available = match remaining.get(&line.medication_id) {
                Some(left) => *left,
                None => session.quantity_on_hand(line.medication_id)?,
            };
            let requested = line.quantity.get();
            if requested > available {
                return Err(DomainError::InsufficientStock {
                    medication_id: line.medication_id,
                    requested,
                    available,
                }
                .into());
            }
            remaining.insert(line.medication_id, available - requested);
        }

        for line in &lines {
            session.stage(MedicationCommand::ReleaseStock(ReleaseStock {
                medication_id: line.medication_id,
                quantity: line.quantity.get(),
                requisition_id: Some(requisition_id),
                occurred_at: at,
            }))?;
        }

        let requisition = OutgoingRequisition::new(
            requisition_id,
            employee_id,
            prescription_id,
            patient_id,
            lines
                .iter()
                .map(|l| DispensedLine {
                    line_id: l.line_id,
                    medication_id: l.medication_id,
                    quantity: l.quantity,
                })
                .collect(),
            at,
        )?;

        let requisition_stream = StreamAppend::new_stream(
            requisition_id.aggregate_id(),
            uncommitted(
                requisition_id.aggregate_id(),
                REQUISITION_AGGREGATE,
                &[RequisitionEvent::OutgoingRecorded(requisition.clone())],
            )?,
        );

        Ok((requisition, vec![prescription_stream, requisition_stream]))
    });

    let (requisition, _) = result.inspect_err(|err| {
        tracing::warn!(prescription = %prescription_id, error = %err, "dispense rejected");
    })?;

    for e in &marked {
        prescription.apply(e);
    }

    tracing::info!(
        prescription = %prescription_id,
        requisition = %requisition_id,
        employee = %employee_id,
        lines = requisition.lines().len(),
        "prescription dispensed"
    );
    Ok(requisition)
}

use chrono::{DateTime, Utc};

use dispensary_core::{EmployeeId, MedicationId, Quantity, RequisitionId};
use dispensary_inventory::{MedicationCommand, ReceiveStock};
use dispensary_requisitions::{IncomingRequisition, REQUISITION_AGGREGATE, RequisitionEvent};

use crate::error::DispensaryResult;
use crate::event_store::{EventStore, StreamAppend};
use crate::journal::uncommitted;
use crate::stock_ledger::StockLedger;

/// Add `quantity` units of a medication to stock and record who received them.
///
/// The stock event and the incoming requisition are committed together.
pub fn record_incoming<S: EventStore>(
    ledger: &StockLedger<S>,
    employee_id: EmployeeId,
    medication_id: MedicationId,
    quantity: i64,
    at: DateTime<Utc>,
) -> DispensaryResult<IncomingRequisition> {
    let quantity = Quantity::new(quantity)?;
    let requisition_id = RequisitionId::new();

    let (requisition, _) = ledger.transact(&[medication_id], |session| {
        session.stage(MedicationCommand::ReceiveStock(ReceiveStock {
            medication_id,
            quantity: quantity.get(),
            requisition_id: Some(requisition_id),
            occurred_at: at,
        }))?;

        let requisition =
            IncomingRequisition::new(requisition_id, employee_id, medication_id, quantity, at);
        let stream = StreamAppend::new_stream(
            requisition_id.aggregate_id(),
            uncommitted(
                requisition_id.aggregate_id(),
                REQUISITION_AGGREGATE,
                &[RequisitionEvent::IncomingRecorded(requisition.clone())],
            )?,
        );

        Ok((requisition, vec![stream]))
    })?;

    tracing::info!(
        medication = %medication_id,
        requisition = %requisition_id,
        employee = %employee_id,
        quantity = quantity.get(),
        "stock received"
    );
    Ok(requisition)
}

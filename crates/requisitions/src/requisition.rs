use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dispensary_core::{
    DomainError, EmployeeId, MedicationId, PatientId, PrescribedLineId, PrescriptionId, Quantity,
    RequisitionId,
};
use dispensary_events::Event;

/// Stream type name for requisition streams (one event per stream).
pub const REQUISITION_AGGREGATE: &str = "requisitions.requisition";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequisitionKind {
    Incoming,
    Outgoing,
}

impl core::fmt::Display for RequisitionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RequisitionKind::Incoming => f.write_str("incoming"),
            RequisitionKind::Outgoing => f.write_str("outgoing"),
        }
    }
}

/// Units of one medication added to stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingRequisition {
    id: RequisitionId,
    occurred_at: DateTime<Utc>,
    employee_id: EmployeeId,
    medication_id: MedicationId,
    quantity: Quantity,
}

impl IncomingRequisition {
    pub fn new(
        id: RequisitionId,
        employee_id: EmployeeId,
        medication_id: MedicationId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            occurred_at,
            employee_id,
            medication_id,
            quantity,
        }
    }

    pub fn id(&self) -> RequisitionId {
        self.id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    pub fn medication_id(&self) -> MedicationId {
        self.medication_id
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }
}

/// Snapshot of a prescribed line as it was dispensed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispensedLine {
    pub line_id: PrescribedLineId,
    pub medication_id: MedicationId,
    pub quantity: Quantity,
}

/// A whole prescription handed out in one go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingRequisition {
    id: RequisitionId,
    occurred_at: DateTime<Utc>,
    employee_id: EmployeeId,
    prescription_id: PrescriptionId,
    patient_id: PatientId,
    lines: Vec<DispensedLine>,
}

impl OutgoingRequisition {
    /// Fails with `EmptyPrescription` when `lines` is empty.
    pub fn new(
        id: RequisitionId,
        employee_id: EmployeeId,
        prescription_id: PrescriptionId,
        patient_id: PatientId,
        lines: Vec<DispensedLine>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::EmptyPrescription(prescription_id));
        }

        Ok(Self {
            id,
            occurred_at,
            employee_id,
            prescription_id,
            patient_id,
            lines,
        })
    }

    pub fn id(&self) -> RequisitionId {
        self.id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    pub fn prescription_id(&self) -> PrescriptionId {
        self.prescription_id
    }

    pub fn patient_id(&self) -> PatientId {
        self.patient_id
    }

    pub fn lines(&self) -> &[DispensedLine] {
        &self.lines
    }

    /// Total units of `medication_id` handed out across all lines.
    pub fn quantity_of(&self, medication_id: MedicationId) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.medication_id == medication_id)
            .map(|l| l.quantity.get())
            .sum()
    }
}

/// Either kind of requisition, as listed by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Requisition {
    Incoming(IncomingRequisition),
    Outgoing(OutgoingRequisition),
}

impl Requisition {
    pub fn id(&self) -> RequisitionId {
        match self {
            Requisition::Incoming(r) => r.id(),
            Requisition::Outgoing(r) => r.id(),
        }
    }

    pub fn kind(&self) -> RequisitionKind {
        match self {
            Requisition::Incoming(_) => RequisitionKind::Incoming,
            Requisition::Outgoing(_) => RequisitionKind::Outgoing,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Requisition::Incoming(r) => r.occurred_at(),
            Requisition::Outgoing(r) => r.occurred_at(),
        }
    }

    pub fn employee_id(&self) -> EmployeeId {
        match self {
            Requisition::Incoming(r) => r.employee_id(),
            Requisition::Outgoing(r) => r.employee_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequisitionEvent {
    IncomingRecorded(IncomingRequisition),
    OutgoingRecorded(OutgoingRequisition),
}

impl RequisitionEvent {
    pub fn requisition_id(&self) -> RequisitionId {
        match self {
            RequisitionEvent::IncomingRecorded(r) => r.id(),
            RequisitionEvent::OutgoingRecorded(r) => r.id(),
        }
    }
}

impl Event for RequisitionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RequisitionEvent::IncomingRecorded(_) => "requisitions.requisition.incoming_recorded",
            RequisitionEvent::OutgoingRecorded(_) => "requisitions.requisition.outgoing_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RequisitionEvent::IncomingRecorded(r) => r.occurred_at(),
            RequisitionEvent::OutgoingRecorded(r) => r.occurred_at(),
        }
    }
}

impl From<RequisitionEvent> for Requisition {
    fn from(event: RequisitionEvent) -> Self {
        match event {
            RequisitionEvent::IncomingRecorded(r) => Requisition::Incoming(r),
            RequisitionEvent::OutgoingRecorded(r) => Requisition::Outgoing(r),
        }
    }
}

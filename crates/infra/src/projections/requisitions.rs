use std::collections::HashMap;

use dispensary_core::{MedicationId, PatientId, PrescriptionId, RequisitionId};
use dispensary_events::{EventEnvelope, Projection};
use dispensary_requisitions::{
    IncomingRequisition, OutgoingRequisition, Requisition, RequisitionEvent, RequisitionKind,
};

/// Requisition registry: every incoming and outgoing requisition, in commit order.
///
/// Append-only. There is no update or delete; records only arrive through
/// committed `RequisitionEvent`s. Replayed envelopes (position at or below the
/// last applied one) are ignored, so the registry can be rebuilt from the
/// journal and fed live commits without double counting.
#[derive(Debug, Default)]
pub struct RequisitionRegistry {
    order: Vec<RequisitionId>,
    by_id: HashMap<RequisitionId, Requisition>,
    last_position: u64,
}

impl RequisitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: RequisitionId) -> Option<&Requisition> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All requisitions, optionally filtered by kind, in commit order.
    pub fn list(&self, kind: Option<RequisitionKind>) -> Vec<Requisition> {
        self.iter()
            .filter(|r| kind.is_none_or(|k| r.kind() == k))
            .cloned()
            .collect()
    }

    pub fn incoming(&self) -> Vec<IncomingRequisition> {
        self.iter()
            .filter_map(|r| match r {
                Requisition::Incoming(i) => Some(i.clone()),
                Requisition::Outgoing(_) => None,
            })
            .collect()
    }

    pub fn outgoing(&self) -> Vec<OutgoingRequisition> {
        self.iter()
            .filter_map(|r| match r {
                Requisition::Outgoing(o) => Some(o.clone()),
                Requisition::Incoming(_) => None,
            })
            .collect()
    }

    pub fn incoming_for_medication(&self, medication_id: MedicationId) -> Vec<IncomingRequisition> {
        self.incoming()
            .into_iter()
            .filter(|r| r.medication_id() == medication_id)
            .collect()
    }

    pub fn outgoing_for_prescription(
        &self,
        prescription_id: PrescriptionId,
    ) -> Vec<OutgoingRequisition> {
        self.outgoing()
            .into_iter()
            .filter(|r| r.prescription_id() == prescription_id)
            .collect()
    }

    pub fn outgoing_for_patient(&self, patient_id: PatientId) -> Vec<OutgoingRequisition> {
        self.outgoing()
            .into_iter()
            .filter(|r| r.patient_id() == patient_id)
            .collect()
    }

    fn iter(&self) -> impl Iterator<Item = &Requisition> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }
}

impl Projection for RequisitionRegistry {
    type Ev = RequisitionEvent;

    fn apply(&mut self, envelope: &EventEnvelope<RequisitionEvent>) {
        if envelope.position() <= self.last_position {
            return;
        }
        self.last_position = envelope.position();

        let requisition = Requisition::from(envelope.payload().clone());
        let id = requisition.id();
        if self.by_id.insert(id, requisition).is_none() {
            self.order.push(id);
        }
    }

    fn last_position(&self) -> u64 {
        self.last_position
    }
}

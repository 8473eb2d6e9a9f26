use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dispensary_core::{
    Aggregate, AggregateRoot, DomainError, EntityKind, MedicationId, RequisitionId, SupplierId,
};
use dispensary_events::Event;

/// Stream type name for medication stock streams.
pub const MEDICATION_AGGREGATE: &str = "inventory.medication";

/// Aggregate root: Medication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Medication {
    id: MedicationId,
    name: String,
    unit: String,
    supplier_id: Option<SupplierId>,
    quantity_on_hand: i64,
    version: u64,
    created: bool,
}

impl Medication {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: MedicationId) -> Self {
        Self {
            id,
            name: String::new(),
            unit: String::new(),
            supplier_id: None,
            quantity_on_hand: 0,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> MedicationId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn quantity_on_hand(&self) -> i64 {
        self.quantity_on_hand
    }
}

impl AggregateRoot for Medication {
    type Id = MedicationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterMedication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMedication {
    pub medication_id: MedicationId,
    pub name: String,
    pub unit: String,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateMedication (name / unit only; stock is untouched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMedication {
    pub medication_id: MedicationId,
    pub name: String,
    pub unit: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveStock (incoming units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub medication_id: MedicationId,
    pub quantity: i64,
    /// Requisition the movement belongs to; `None` for manual adjustments.
    pub requisition_id: Option<RequisitionId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReleaseStock (outgoing units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseStock {
    pub medication_id: MedicationId,
    pub quantity: i64,
    pub requisition_id: Option<RequisitionId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MedicationCommand {
    RegisterMedication(RegisterMedication),
    UpdateMedication(UpdateMedication),
    ReceiveStock(ReceiveStock),
    ReleaseStock(ReleaseStock),
}

/// Event: MedicationRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationRegistered {
    pub medication_id: MedicationId,
    pub name: String,
    pub unit: String,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MedicationUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationUpdated {
    pub medication_id: MedicationId,
    pub name: String,
    pub unit: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub medication_id: MedicationId,
    pub quantity: i64,
    pub requisition_id: Option<RequisitionId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReleased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReleased {
    pub medication_id: MedicationId,
    pub quantity: i64,
    pub requisition_id: Option<RequisitionId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MedicationEvent {
    MedicationRegistered(MedicationRegistered),
    MedicationUpdated(MedicationUpdated),
    StockReceived(StockReceived),
    StockReleased(StockReleased),
}

impl Event for MedicationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MedicationEvent::MedicationRegistered(_) => "inventory.medication.registered",
            MedicationEvent::MedicationUpdated(_) => "inventory.medication.updated",
            MedicationEvent::StockReceived(_) => "inventory.medication.stock_received",
            MedicationEvent::StockReleased(_) => "inventory.medication.stock_released",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MedicationEvent::MedicationRegistered(e) => e.occurred_at,
            MedicationEvent::MedicationUpdated(e) => e.occurred_at,
            MedicationEvent::StockReceived(e) => e.occurred_at,
            MedicationEvent::StockReleased(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Medication {
    type Command = MedicationCommand;
    type Event = MedicationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MedicationEvent::MedicationRegistered(e) => {
                self.id = e.medication_id;
                self.name = e.name.clone();
                self.unit = e.unit.clone();
                self.supplier_id = e.supplier_id;
                self.quantity_on_hand = 0;
                self.created = true;
            }
            MedicationEvent::MedicationUpdated(e) => {
                self.name = e.name.clone();
                self.unit = e.unit.clone();
            }
            MedicationEvent::StockReceived(e) => {
                self.quantity_on_hand += e.quantity;
            }
            MedicationEvent::StockReleased(e) => {
                self.quantity_on_hand -= e.quantity;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            MedicationCommand::RegisterMedication(cmd) => self.handle_register(cmd),
            MedicationCommand::UpdateMedication(cmd) => self.handle_update(cmd),
            MedicationCommand::ReceiveStock(cmd) => self.handle_receive(cmd),
            MedicationCommand::ReleaseStock(cmd) => self.handle_release(cmd),
        }
    }
}

impl Medication {
    fn ensure_registered(&self, medication_id: MedicationId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(EntityKind::Medication, medication_id));
        }
        if self.id != medication_id {
            return Err(DomainError::invariant("medication_id mismatch"));
        }
        Ok(())
    }

    fn validate_details(name: &str, unit: &str) -> Result<(), DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if unit.trim().is_empty() {
            return Err(DomainError::validation("unit of measure cannot be empty"));
        }
        Ok(())
    }

    fn handle_register(
        &self,
        cmd: &RegisterMedication,
    ) -> Result<Vec<MedicationEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("medication already exists"));
        }
        Self::validate_details(&cmd.name, &cmd.unit)?;

        Ok(vec![MedicationEvent::MedicationRegistered(
            MedicationRegistered {
                medication_id: cmd.medication_id,
                name: cmd.name.trim().to_string(),
                unit: cmd.unit.trim().to_string(),
                supplier_id: cmd.supplier_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_update(&self, cmd: &UpdateMedication) -> Result<Vec<MedicationEvent>, DomainError> {
        self.ensure_registered(cmd.medication_id)?;
        Self::validate_details(&cmd.name, &cmd.unit)?;

        Ok(vec![MedicationEvent::MedicationUpdated(MedicationUpdated {
            medication_id: cmd.medication_id,
            name: cmd.name.trim().to_string(),
            unit: cmd.unit.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveStock) -> Result<Vec<MedicationEvent>, DomainError> {
        self.ensure_registered(cmd.medication_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::InvalidQuantity(cmd.quantity));
        }
        if self.quantity_on_hand.checked_add(cmd.quantity).is_none() {
            return Err(DomainError::invariant("stock would overflow"));
        }

        Ok(vec![MedicationEvent::StockReceived(StockReceived {
            medication_id: cmd.medication_id,
            quantity: cmd.quantity,
            requisition_id: cmd.requisition_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_release(&self, cmd: &ReleaseStock) -> Result<Vec<MedicationEvent>, DomainError> {
        self.ensure_registered(cmd.medication_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::InvalidQuantity(cmd.quantity));
        }

        // Invariant: stock cannot go negative.
        if cmd.quantity > self.quantity_on_hand {
            return Err(DomainError::InsufficientStock {
                medication_id: cmd.medication_id,
                requested: cmd.quantity,
                available: self.quantity_on_hand,
            });
        }

        Ok(vec![MedicationEvent::StockReleased(StockReleased {
            medication_id: cmd.medication_id,
            quantity: cmd.quantity,
            requisition_id: cmd.requisition_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

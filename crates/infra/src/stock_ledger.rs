//! Stock ledger: the only place medication stock changes.
//!
//! Each medication lives in its own mutex-guarded cell. Work touching several
//! medications runs in a [`StockSession`]:
//!
//! 1. lock every involved cell, in medication id order
//! 2. stage commands against working copies (later commands see earlier ones)
//! 3. commit the staged stock events plus any companion streams in one batch
//! 4. only then write the working copies back into the cells
//!
//! An error at any step leaves both the cells and the store untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use dispensary_core::{
    Aggregate, AggregateRoot, DomainError, EntityKind, ExpectedVersion, MedicationId, Quantity,
    SupplierId,
};
use dispensary_inventory::{
    MEDICATION_AGGREGATE, Medication, MedicationCommand, MedicationEvent, ReceiveStock,
    RegisterMedication, ReleaseStock, UpdateMedication,
};

use crate::error::{DispensaryError, DispensaryResult};
use crate::event_store::{EventStore, StoredEvent, StreamAppend};
use crate::journal::{Journal, uncommitted};
use crate::locks::LockTable;

/// Working state of one ledger transaction.
#[derive(Debug)]
pub struct StockSession {
    working: BTreeMap<MedicationId, Medication>,
    base_versions: BTreeMap<MedicationId, u64>,
    staged: BTreeMap<MedicationId, Vec<MedicationEvent>>,
}

impl StockSession {
    fn new(medications: impl IntoIterator<Item = Medication>) -> Self {
        let working: BTreeMap<_, _> = medications
            .into_iter()
            .map(|m| (m.id_typed(), m))
            .collect();
        let base_versions = working.iter().map(|(id, m)| (*id, m.version())).collect();

        Self {
            working,
            base_versions,
            staged: BTreeMap::new(),
        }
    }

    /// The medication as staged so far.
    pub fn medication(&self, id: MedicationId) -> Result<&Medication, DomainError> {
        self.working
            .get(&id)
            .ok_or_else(|| DomainError::not_found(EntityKind::Medication, id))
    }

    pub fn quantity_on_hand(&self, id: MedicationId) -> Result<i64, DomainError> {
        self.medication(id).map(Medication::quantity_on_hand)
    }

    /// Decide and apply `command` on the working copy.
    pub fn stage(&mut self, command: MedicationCommand) -> Result<(), DomainError> {
        let id = match &command {
            MedicationCommand::RegisterMedication(c) => c.medication_id,
            MedicationCommand::UpdateMedication(c) => c.medication_id,
            MedicationCommand::ReceiveStock(c) => c.medication_id,
            MedicationCommand::ReleaseStock(c) => c.medication_id,
        };
        let medication = self
            .working
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(EntityKind::Medication, id))?;

        let events = medication.handle(&command)?;
        for e in &events {
            medication.apply(e);
        }
        self.staged.entry(id).or_default().extend(events);
        Ok(())
    }

    fn into_appends(
        self,
    ) -> DispensaryResult<(Vec<StreamAppend>, BTreeMap<MedicationId, Medication>)> {
        let mut appends = Vec::with_capacity(self.staged.len());
        let mut changed = BTreeMap::new();
        let mut working = self.working;

        for (id, events) in self.staged {
            if events.is_empty() {
                continue;
            }
            let base = self.base_versions.get(&id).copied().unwrap_or(0);
            appends.push(StreamAppend::new(
                id.aggregate_id(),
                ExpectedVersion::Exact(base),
                uncommitted(id.aggregate_id(), MEDICATION_AGGREGATE, &events)?,
            ));
            if let Some(m) = working.remove(&id) {
                changed.insert(id, m);
            }
        }

        Ok((appends, changed))
    }
}

/// Medication stock, one locked cell per medication.
#[derive(Debug)]
pub struct StockLedger<S> {
    journal: Arc<Journal<S>>,
    cells: LockTable<MedicationId, Medication>,
}

impl<S: EventStore> StockLedger<S> {
    /// Rebuild every medication from the journal.
    pub fn load(journal: Arc<Journal<S>>) -> DispensaryResult<Self> {
        let cells = LockTable::new("medication");
        for medication in journal.rehydrate_all(MEDICATION_AGGREGATE, |id| {
            Medication::empty(MedicationId::from(id))
        })? {
            cells.insert(medication.id_typed(), medication)?;
        }

        Ok(Self { journal, cells })
    }

    /// Run `work` with the cells of `ids` locked, then commit.
    ///
    /// `work` returns its result plus companion stream appends, which are
    /// committed in the same batch as the staged stock events.
    pub fn transact<T>(
        &self,
        ids: &[MedicationId],
        work: impl FnOnce(&mut StockSession) -> DispensaryResult<(T, Vec<StreamAppend>)>,
    ) -> DispensaryResult<(T, Vec<StoredEvent>)> {
        let cells = self
            .cells
            .cells_sorted(ids)?
            .map_err(|missing| DomainError::not_found(EntityKind::Medication, missing))?;

        let mut guards = Vec::with_capacity(cells.len());
        for (id, cell) in &cells {
            let guard = cell
                .lock()
                .map_err(|_| DispensaryError::Poisoned(self.cells.name()))?;
            guards.push((*id, guard));
        }

        let mut session = StockSession::new(guards.iter().map(|(_, g)| (**g).clone()));
        let (value, extras) = work(&mut session)?;

        let (mut batch, mut changed) = session.into_appends()?;
        batch.extend(extras.into_iter().filter(|a| !a.events.is_empty()));
        if batch.is_empty() {
            return Ok((value, Vec::new()));
        }

        let committed = self.journal.commit(batch)?;

        for (id, guard) in guards.iter_mut() {
            if let Some(updated) = changed.remove(id) {
                **guard = updated;
            }
        }

        Ok((value, committed))
    }

    pub fn register(
        &self,
        name: &str,
        unit: &str,
        supplier_id: Option<SupplierId>,
        at: DateTime<Utc>,
    ) -> DispensaryResult<Medication> {
        let id = MedicationId::new();
        let mut medication = Medication::empty(id);
        let events = medication.handle(&MedicationCommand::RegisterMedication(
            RegisterMedication {
                medication_id: id,
                name: name.to_string(),
                unit: unit.to_string(),
                supplier_id,
                occurred_at: at,
            },
        ))?;

        self.journal.commit(vec![StreamAppend::new_stream(
            id.aggregate_id(),
            uncommitted(id.aggregate_id(), MEDICATION_AGGREGATE, &events)?,
        )])?;
        for e in &events {
            medication.apply(e);
        }
        self.cells.insert(id, medication.clone())?;

        tracing::info!(medication = %id, name = medication.name(), "medication registered");
        Ok(medication)
    }

    pub fn update(
        &self,
        id: MedicationId,
        name: &str,
        unit: &str,
        at: DateTime<Utc>,
    ) -> DispensaryResult<Medication> {
        let (medication, _) = self.transact(&[id], |session| {
            session.stage(MedicationCommand::UpdateMedication(UpdateMedication {
                medication_id: id,
                name: name.to_string(),
                unit: unit.to_string(),
                occurred_at: at,
            }))?;
            Ok((session.medication(id)?.clone(), Vec::new()))
        })?;
        Ok(medication)
    }

    /// Administrative stock increase. Returns the new on-hand quantity.
    pub fn apply_incoming(
        &self,
        id: MedicationId,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DispensaryResult<i64> {
        let quantity = Quantity::new(quantity)?;
        let (on_hand, _) = self.transact(&[id], |session| {
            session.stage(MedicationCommand::ReceiveStock(ReceiveStock {
                medication_id: id,
                quantity: quantity.get(),
                requisition_id: None,
                occurred_at: at,
            }))?;
            Ok((session.quantity_on_hand(id)?, Vec::new()))
        })?;

        tracing::info!(medication = %id, quantity = quantity.get(), on_hand, "stock adjusted up");
        Ok(on_hand)
    }

    /// Administrative stock decrease. Returns the new on-hand quantity.
    pub fn apply_outgoing(
        &self,
        id: MedicationId,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DispensaryResult<i64> {
        let quantity = Quantity::new(quantity)?;
        let (on_hand, _) = self.transact(&[id], |session| {
            session.stage(MedicationCommand::ReleaseStock(ReleaseStock {
                medication_id: id,
                quantity: quantity.get(),
                requisition_id: None,
                occurred_at: at,
            }))?;
            Ok((session.quantity_on_hand(id)?, Vec::new()))
        })?;

        tracing::info!(medication = %id, quantity = quantity.get(), on_hand, "stock adjusted down");
        Ok(on_hand)
    }

    pub fn quantity_on_hand(&self, id: MedicationId) -> DispensaryResult<i64> {
        Ok(self.medication(id)?.quantity_on_hand())
    }

    pub fn medication(&self, id: MedicationId) -> DispensaryResult<Medication> {
        self.cells
            .read(&id)?
            .ok_or_else(|| DomainError::not_found(EntityKind::Medication, id).into())
    }

    /// Every medication, in registration order.
    pub fn medications(&self) -> DispensaryResult<Vec<Medication>> {
        self.cells.snapshot()
    }

    pub fn contains(&self, id: MedicationId) -> DispensaryResult<bool> {
        self.cells.contains(&id)
    }
}

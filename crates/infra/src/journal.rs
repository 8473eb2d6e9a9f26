//! Commit pipeline and startup replay.
//!
//! ```text
//! StreamAppend batch
//!   ↓
//! 1. append_batch (all-or-nothing, durable for the file store)
//!   ↓
//! 2. feed requisition envelopes to the registry projection
//!   ↓
//! 3. publish every envelope on the bus (failures are logged only)
//! ```
//!
//! Commits are serialized by the registry lock, so the registry and bus
//! subscribers see envelopes in position order.

use std::sync::{RwLock, RwLockReadGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use dispensary_core::{Aggregate, AggregateId};
use dispensary_events::{Event, EventBus, EventEnvelope, InMemoryEventBus, Projection, Subscription};
use dispensary_requisitions::{REQUISITION_AGGREGATE, RequisitionEvent};

use crate::error::{DispensaryError, DispensaryResult};
use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
use crate::event_store::StreamAppend;
use crate::projections::RequisitionRegistry;

/// Event store plus the in-process consumers of its commits.
#[derive(Debug)]
pub struct Journal<S> {
    store: S,
    registry: RwLock<RequisitionRegistry>,
    bus: InMemoryEventBus<EventEnvelope<JsonValue>>,
}

impl<S: EventStore> Journal<S> {
    /// Wrap `store` and rebuild the registry from what it already holds.
    pub fn open(store: S) -> DispensaryResult<Self> {
        let journal = Self {
            store,
            registry: RwLock::new(RequisitionRegistry::new()),
            bus: InMemoryEventBus::new(),
        };

        let history = journal.store.load_all()?;
        {
            let mut registry = journal.registry_mut()?;
            for stored in &history {
                feed_registry(&mut registry, stored)?;
            }
            tracing::debug!(
                events = history.len(),
                requisitions = registry.len(),
                "requisition registry rebuilt"
            );
        }

        Ok(journal)
    }

    /// Commit a batch, then update the registry and notify subscribers.
    pub fn commit(&self, batch: Vec<StreamAppend>) -> DispensaryResult<Vec<StoredEvent>> {
        let mut registry = self.registry_mut()?;

        let committed = self.store.append_batch(batch)?;

        for stored in &committed {
            // already durable: log, do not fail the commit
            if let Err(err) = feed_registry(&mut registry, stored) {
                tracing::error!(
                    position = stored.position,
                    event_type = %stored.event_type,
                    error = %err,
                    "committed requisition event could not be projected"
                );
            }
        }

        for stored in &committed {
            if let Err(err) = self.bus.publish(stored.to_envelope()) {
                tracing::warn!(
                    position = stored.position,
                    error = ?err,
                    "publishing committed event failed"
                );
            }
        }
        drop(registry);

        Ok(committed)
    }

    /// Read access to the requisition registry.
    pub fn registry(&self) -> DispensaryResult<RwLockReadGuard<'_, RequisitionRegistry>> {
        self.registry
            .read()
            .map_err(|_| DispensaryError::Poisoned("requisition registry"))
    }

    pub fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
        self.bus.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuild every aggregate of `aggregate_type` from the store.
    ///
    /// Aggregates come back in the order their streams first appear.
    pub fn rehydrate_all<A>(
        &self,
        aggregate_type: &str,
        make_aggregate: impl Fn(AggregateId) -> A,
    ) -> DispensaryResult<Vec<A>>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let mut order: Vec<AggregateId> = Vec::new();
        let mut streams: std::collections::HashMap<AggregateId, Vec<StoredEvent>> =
            std::collections::HashMap::new();

        for stored in self.store.load_all()? {
            if stored.aggregate_type != aggregate_type {
                continue;
            }
            let stream = streams.entry(stored.aggregate_id).or_insert_with(|| {
                order.push(stored.aggregate_id);
                Vec::new()
            });
            stream.push(stored);
        }

        let mut aggregates = Vec::with_capacity(order.len());
        for aggregate_id in order {
            let history = streams.remove(&aggregate_id).unwrap_or_default();
            validate_loaded_stream(aggregate_id, &history)?;

            let mut aggregate = make_aggregate(aggregate_id);
            apply_history(&mut aggregate, &history)?;
            aggregates.push(aggregate);
        }

        tracing::debug!(aggregate_type, count = aggregates.len(), "aggregates rehydrated");
        Ok(aggregates)
    }

    fn registry_mut(
        &self,
    ) -> DispensaryResult<std::sync::RwLockWriteGuard<'_, RequisitionRegistry>> {
        self.registry
            .write()
            .map_err(|_| DispensaryError::Poisoned("requisition registry"))
    }
}

fn feed_registry(registry: &mut RequisitionRegistry, stored: &StoredEvent) -> DispensaryResult<()> {
    if stored.aggregate_type != REQUISITION_AGGREGATE {
        return Ok(());
    }
    let event: RequisitionEvent = serde_json::from_value(stored.payload.clone())
        .map_err(|e| DispensaryError::Deserialize(e.to_string()))?;
    registry.apply(&stored.to_envelope().with_payload(event));
    Ok(())
}

/// Wrap decided domain events for appending to `aggregate_id`'s stream.
pub fn uncommitted<E>(
    aggregate_id: AggregateId,
    aggregate_type: &str,
    events: &[E],
) -> Result<Vec<UncommittedEvent>, EventStoreError>
where
    E: Event + Serialize,
{
    events
        .iter()
        .map(|ev| UncommittedEvent::from_typed(aggregate_id, aggregate_type, Uuid::now_v7(), ev))
        .collect()
}

fn validate_loaded_stream(aggregate_id: AggregateId, stream: &[StoredEvent]) -> DispensaryResult<()> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(EventStoreError::Corrupt(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))
            .into());
        }
        if e.sequence_number != last + 1 {
            return Err(EventStoreError::Corrupt(format!(
                "non-contiguous sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))
            .into());
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> DispensaryResult<()>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispensaryError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::InMemoryEventStore;
    use chrono::Utc;
    use dispensary_core::{AggregateRoot, EmployeeId, MedicationId, Quantity, RequisitionId};
    use dispensary_inventory::{
        MEDICATION_AGGREGATE, Medication, MedicationEvent, MedicationRegistered, StockReceived,
    };
    use dispensary_requisitions::IncomingRequisition;

    fn registered(id: MedicationId) -> MedicationEvent {
        MedicationEvent::MedicationRegistered(MedicationRegistered {
            medication_id: id,
            name: "Dipyrone".to_string(),
            unit: "ml".to_string(),
            supplier_id: None,
            occurred_at: Utc::now(),
        })
    }

    fn received(id: MedicationId, quantity: i64) -> MedicationEvent {
        MedicationEvent::StockReceived(StockReceived {
            medication_id: id,
            quantity,
            requisition_id: None,
            occurred_at: Utc::now(),
        })
    }

    fn incoming(medication_id: MedicationId) -> RequisitionEvent {
        RequisitionEvent::IncomingRecorded(IncomingRequisition::new(
            RequisitionId::new(),
            EmployeeId::new(),
            medication_id,
            Quantity::new(5).unwrap(),
            Utc::now(),
        ))
    }

    #[test]
    fn commit_feeds_registry_and_bus() {
        let journal = Journal::open(InMemoryEventStore::new()).unwrap();
        let sub = journal.subscribe();
        let med = MedicationId::new();
        let req = incoming(med);
        let req_id = AggregateId::from(req.requisition_id());

        journal
            .commit(vec![
                StreamAppend::new_stream(
                    med.aggregate_id(),
                    uncommitted(med.aggregate_id(), MEDICATION_AGGREGATE, &[registered(med)]).unwrap(),
                ),
                StreamAppend::new_stream(
                    req_id,
                    uncommitted(req_id, REQUISITION_AGGREGATE, &[req]).unwrap(),
                ),
            ])
            .unwrap();

        assert_eq!(journal.registry().unwrap().len(), 1);
        let published: Vec<_> = sub.drain().iter().map(|e| e.position()).collect();
        assert_eq!(published, vec![1, 2]);
    }

    #[test]
    fn failed_commit_touches_nothing() {
        let journal = Journal::open(InMemoryEventStore::new()).unwrap();
        let sub = journal.subscribe();
        let req = incoming(MedicationId::new());
        let req_id = AggregateId::from(req.requisition_id());

        let err = journal
            .commit(vec![StreamAppend::new(
                req_id,
                dispensary_core::ExpectedVersion::Exact(4),
                uncommitted(req_id, REQUISITION_AGGREGATE, &[req]).unwrap(),
            )])
            .unwrap_err();

        assert!(matches!(err, DispensaryError::Store(EventStoreError::Concurrency(_))));
        assert!(journal.registry().unwrap().is_empty());
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn reopen_rebuilds_registry_and_aggregates() {
        let store = std::sync::Arc::new(InMemoryEventStore::new());
        let med = MedicationId::new();
        let req = incoming(med);
        let req_id = AggregateId::from(req.requisition_id());
        {
            let journal = Journal::open(store.clone()).unwrap();
            journal
                .commit(vec![StreamAppend::new_stream(
                    med.aggregate_id(),
                    uncommitted(
                        med.aggregate_id(),
                        MEDICATION_AGGREGATE,
                        &[registered(med), received(med, 5)],
                    )
                    .unwrap(),
                )])
                .unwrap();
            journal
                .commit(vec![StreamAppend::new_stream(
                    req_id,
                    uncommitted(req_id, REQUISITION_AGGREGATE, &[req]).unwrap(),
                )])
                .unwrap();
        }

        let journal = Journal::open(store).unwrap();
        assert_eq!(journal.registry().unwrap().len(), 1);

        let meds = journal
            .rehydrate_all(MEDICATION_AGGREGATE, |id| Medication::empty(MedicationId::from(id)))
            .unwrap();
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].quantity_on_hand(), 5);
        assert_eq!(meds[0].version(), 2);
    }
}

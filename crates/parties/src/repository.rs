use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use dispensary_core::{DomainError, DomainResult, Entity};

use crate::record::PartyRecord;

/// CRUD collaborator for one entity collection.
///
/// Reads are fallible too: a collection that cannot be read is reported as a
/// `Storage` error, never as an absent record.
pub trait Repository<T: Entity>: Send + Sync {
    fn get(&self, id: &T::Id) -> DomainResult<Option<T>>;

    fn list(&self) -> DomainResult<Vec<T>>;

    /// Validate and store a new record. Fails with `Conflict` if the id exists.
    fn create(&self, entity: T) -> DomainResult<T>;

    /// Replace the record stored under `id`. The stored id is kept.
    fn update(&self, id: &T::Id, entity: T) -> DomainResult<T>;

    /// Remove and return the record.
    fn delete(&self, id: &T::Id) -> DomainResult<T>;

    /// First record matching `predicate`, if any.
    fn find(&self, predicate: &dyn Fn(&T) -> bool) -> DomainResult<Option<T>> {
        Ok(self.list()?.into_iter().find(|e| predicate(e)))
    }

    fn exists(&self, id: &T::Id) -> DomainResult<bool> {
        Ok(self.get(id)?.is_some())
    }
}

impl<T, R> Repository<T> for Arc<R>
where
    T: Entity,
    R: Repository<T> + ?Sized,
{
    fn get(&self, id: &T::Id) -> DomainResult<Option<T>> {
        (**self).get(id)
    }

    fn list(&self) -> DomainResult<Vec<T>> {
        (**self).list()
    }

    fn create(&self, entity: T) -> DomainResult<T> {
        (**self).create(entity)
    }

    fn update(&self, id: &T::Id, entity: T) -> DomainResult<T> {
        (**self).update(id, entity)
    }

    fn delete(&self, id: &T::Id) -> DomainResult<T> {
        (**self).delete(id)
    }
}

/// Records of one collection, in insertion order.
#[derive(Debug, Clone)]
pub(crate) struct Rows<T: Entity> {
    order: Vec<T::Id>,
    by_id: HashMap<T::Id, T>,
}

impl<T> Rows<T>
where
    T: PartyRecord,
    T::Id: Display + Hash,
{
    pub(crate) fn new() -> Self {
        Self {
            order: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Rebuild from stored records. Duplicate ids are rejected.
    pub(crate) fn from_records(records: Vec<T>) -> DomainResult<Self> {
        let mut rows = Self::new();
        for record in records {
            let id = record.id().clone();
            if rows.by_id.contains_key(&id) {
                return Err(DomainError::storage(format!("{} {id} stored twice", T::KIND)));
            }
            rows.order.push(id.clone());
            rows.by_id.insert(id, record);
        }
        Ok(rows)
    }

    pub(crate) fn get(&self, id: &T::Id) -> Option<T> {
        self.by_id.get(id).cloned()
    }

    pub(crate) fn list(&self) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect()
    }

    pub(crate) fn create(&mut self, entity: T) -> DomainResult<T> {
        entity.validate()?;

        let id = entity.id().clone();
        if self.by_id.contains_key(&id) {
            return Err(DomainError::conflict(format!("{} {id} already exists", T::KIND)));
        }

        self.order.push(id.clone());
        self.by_id.insert(id, entity.clone());
        Ok(entity)
    }

    pub(crate) fn update(&mut self, id: &T::Id, entity: T) -> DomainResult<T> {
        entity.validate()?;
        if entity.id() != id {
            return Err(DomainError::validation(format!(
                "{} id cannot change on update",
                T::KIND
            )));
        }

        match self.by_id.get_mut(id) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(entity)
            }
            None => Err(DomainError::not_found(T::KIND, id)),
        }
    }

    pub(crate) fn delete(&mut self, id: &T::Id) -> DomainResult<T> {
        let removed = self
            .by_id
            .remove(id)
            .ok_or_else(|| DomainError::not_found(T::KIND, id))?;
        self.order.retain(|k| k != id);
        Ok(removed)
    }
}

pub(crate) fn poisoned<T: PartyRecord>() -> DomainError {
    DomainError::storage(format!("{} repository lock poisoned", T::KIND))
}

/// In-memory repository for tests/dev.
///
/// Insertion order is kept so `list()` is stable.
#[derive(Debug)]
pub struct InMemoryRepository<T: Entity> {
    inner: RwLock<Rows<T>>,
}

impl<T> InMemoryRepository<T>
where
    T: PartyRecord,
    T::Id: Display + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Rows::new()),
        }
    }
}

impl<T> Default for InMemoryRepository<T>
where
    T: PartyRecord,
    T::Id: Display + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Repository<T> for InMemoryRepository<T>
where
    T: PartyRecord,
    T::Id: Display + Hash + Send + Sync,
{
    fn get(&self, id: &T::Id) -> DomainResult<Option<T>> {
        let rows = self.inner.read().map_err(|_| poisoned::<T>())?;
        Ok(rows.get(id))
    }

    fn list(&self) -> DomainResult<Vec<T>> {
        let rows = self.inner.read().map_err(|_| poisoned::<T>())?;
        Ok(rows.list())
    }

    fn create(&self, entity: T) -> DomainResult<T> {
        self.inner.write().map_err(|_| poisoned::<T>())?.create(entity)
    }

    fn update(&self, id: &T::Id, entity: T) -> DomainResult<T> {
        self.inner
            .write()
            .map_err(|_| poisoned::<T>())?
            .update(id, entity)
    }

    fn delete(&self, id: &T::Id) -> DomainResult<T> {
        self.inner.write().map_err(|_| poisoned::<T>())?.delete(id)
    }
}

//! Keyed table of mutex-guarded cells.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{DispensaryError, DispensaryResult};

/// One `Mutex` per key, behind a map that is only write-locked to add keys.
///
/// Callers that need several cells at once must lock them in key order, which
/// is how `cells_sorted` hands them out. Listing follows insertion order.
#[derive(Debug)]
pub struct LockTable<K, V> {
    name: &'static str,
    cells: RwLock<Cells<K, V>>,
}

#[derive(Debug)]
struct Cells<K, V> {
    order: Vec<K>,
    by_key: HashMap<K, Arc<Mutex<V>>>,
}

impl<K: Ord + Hash + Copy, V: Clone> LockTable<K, V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cells: RwLock::new(Cells {
                order: Vec::new(),
                by_key: HashMap::new(),
            }),
        }
    }

    /// Add a cell. A key that is already present keeps its existing cell.
    pub fn insert(&self, key: K, value: V) -> DispensaryResult<()> {
        let mut cells = self.cells.write().map_err(|_| DispensaryError::Poisoned(self.name))?;
        if !cells.by_key.contains_key(&key) {
            cells.order.push(key);
            cells.by_key.insert(key, Arc::new(Mutex::new(value)));
        }
        Ok(())
    }

    pub fn cell(&self, key: &K) -> DispensaryResult<Option<Arc<Mutex<V>>>> {
        let cells = self.cells.read().map_err(|_| DispensaryError::Poisoned(self.name))?;
        Ok(cells.by_key.get(key).cloned())
    }

    pub fn contains(&self, key: &K) -> DispensaryResult<bool> {
        let cells = self.cells.read().map_err(|_| DispensaryError::Poisoned(self.name))?;
        Ok(cells.by_key.contains_key(key))
    }

    /// Cells for `keys`, sorted and deduplicated. The inner `Err` names the
    /// first unknown key.
    pub fn cells_sorted(&self, keys: &[K]) -> DispensaryResult<Result<Vec<(K, Arc<Mutex<V>>)>, K>> {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();

        let cells = self.cells.read().map_err(|_| DispensaryError::Poisoned(self.name))?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            match cells.by_key.get(&key) {
                Some(cell) => out.push((key, cell.clone())),
                None => return Ok(Err(key)),
            }
        }
        Ok(Ok(out))
    }

    /// Copy of one value, taken under its lock.
    pub fn read(&self, key: &K) -> DispensaryResult<Option<V>> {
        match self.cell(key)? {
            Some(cell) => {
                let guard = cell.lock().map_err(|_| DispensaryError::Poisoned(self.name))?;
                Ok(Some(guard.clone()))
            }
            None => Ok(None),
        }
    }

    /// Copies of every value in insertion order. Each cell is locked briefly
    /// on its own.
    pub fn snapshot(&self) -> DispensaryResult<Vec<V>> {
        let cells: Vec<_> = {
            let table = self.cells.read().map_err(|_| DispensaryError::Poisoned(self.name))?;
            table
                .order
                .iter()
                .filter_map(|k| table.by_key.get(k).cloned())
                .collect()
        };

        cells
            .iter()
            .map(|cell| {
                cell.lock()
                    .map(|g| g.clone())
                    .map_err(|_| DispensaryError::Poisoned(self.name))
            })
            .collect()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

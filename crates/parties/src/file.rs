//! File-backed repository: one JSON document per collection.
//!
//! Every change rewrites the whole collection into a sibling `.tmp` file,
//! syncs it and renames it over the original, so a reader only ever sees the
//! previous or the next complete collection.

use std::fmt::Display;
use std::fs::{self, File};
use std::hash::Hash;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::Serialize;
use serde::de::DeserializeOwned;

use dispensary_core::{DomainError, DomainResult};

use crate::record::PartyRecord;
use crate::repository::{Repository, Rows, poisoned};

/// Durable repository for one party collection.
#[derive(Debug)]
pub struct FileRepository<T: PartyRecord> {
    path: PathBuf,
    inner: RwLock<Rows<T>>,
}

fn io_error(path: &Path, err: impl Display) -> DomainError {
    DomainError::storage(format!("{}: {err}", path.display()))
}

impl<T> FileRepository<T>
where
    T: PartyRecord + Serialize + DeserializeOwned,
    T::Id: Display + Hash,
{
    /// Open the collection at `path`. A missing file is an empty collection.
    pub fn open(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
            }
        }

        let rows = if path.is_file() {
            let bytes = fs::read(&path).map_err(|e| io_error(&path, e))?;
            let records: Vec<T> =
                serde_json::from_slice(&bytes).map_err(|e| io_error(&path, e))?;
            Rows::from_records(records)?
        } else {
            Rows::new()
        };

        tracing::debug!(
            collection = %path.display(),
            kind = %T::KIND,
            records = rows.list().len(),
            "party records loaded"
        );

        Ok(Self {
            path,
            inner: RwLock::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, rows: &Rows<T>) -> DomainResult<()> {
        let tmp = self.path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &rows.list())?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            fs::rename(&tmp, &self.path)
        };

        write().map_err(|e| {
            tracing::warn!(collection = %self.path.display(), error = %e, "saving party records failed");
            io_error(&self.path, e)
        })
    }

    /// Apply `change` to a copy, persist it, then publish it in memory.
    fn mutate<R>(&self, change: impl FnOnce(&mut Rows<T>) -> DomainResult<R>) -> DomainResult<R> {
        let mut rows = self.inner.write().map_err(|_| poisoned::<T>())?;
        let mut next = rows.clone();
        let out = change(&mut next)?;
        self.save(&next)?;
        *rows = next;
        Ok(out)
    }
}

impl<T> Repository<T> for FileRepository<T>
where
    T: PartyRecord + Serialize + DeserializeOwned,
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
        self.mutate(|rows| rows.create(entity))
    }

    fn update(&self, id: &T::Id, entity: T) -> DomainResult<T> {
        self.mutate(|rows| rows.update(id, entity))
    }

    fn delete(&self, id: &T::Id) -> DomainResult<T> {
        self.mutate(|rows| rows.delete(id))
    }
}

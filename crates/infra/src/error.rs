use thiserror::Error;

use dispensary_core::DomainError;

use crate::event_store::EventStoreError;

/// Failure of a dispensary operation.
///
/// Business rule failures arrive as `Domain`; everything else is
/// infrastructure. Nothing is retried and no variant implies a partial commit.
#[derive(Debug, Error)]
pub enum DispensaryError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("event store failure: {0}")]
    Store(#[from] EventStoreError),

    #[error("failed to decode stored event: {0}")]
    Deserialize(String),

    #[error("lock poisoned: {0}")]
    Poisoned(&'static str),
}

impl DispensaryError {
    /// The business error, if this is one.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            DispensaryError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

pub type DispensaryResult<T> = Result<T, DispensaryError>;

use dispensary_core::{DomainError, DomainResult, Entity, EntityKind};

pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 100;

/// A record kept by a party repository.
pub trait PartyRecord: Entity + Clone + Send + Sync + 'static {
    /// Kind reported in `EntityNotFound` errors.
    const KIND: EntityKind;

    /// Field-level checks run before a record is stored.
    fn validate(&self) -> DomainResult<()>;
}

pub(crate) fn require(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

pub(crate) fn require_name(name: &str) -> DomainResult<()> {
    let len = name.trim().chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(DomainError::validation(format!(
            "name must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters (got {len})"
        )));
    }
    Ok(())
}

use serde::{Deserialize, Serialize};

use dispensary_core::{DomainResult, Entity, EntityKind, PatientId};

use crate::record::{PartyRecord, require, require_name};
use crate::repository::Repository;

/// A patient prescriptions are issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub phone: String,
    /// Public health-system card number.
    pub health_card: String,
    pub national_id: String,
}

impl Patient {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        health_card: impl Into<String>,
        national_id: impl Into<String>,
    ) -> Self {
        Self {
            id: PatientId::new(),
            name: name.into(),
            phone: phone.into(),
            health_card: health_card.into(),
            national_id: national_id.into(),
        }
    }
}

impl Entity for Patient {
    type Id = PatientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl PartyRecord for Patient {
    const KIND: EntityKind = EntityKind::Patient;

    fn validate(&self) -> DomainResult<()> {
        require_name(&self.name)?;
        require("phone", &self.phone)?;
        require("health card", &self.health_card)?;
        require("national id", &self.national_id)
    }
}

/// Look a patient up by national id, the key front desks search by.
pub fn patient_by_national_id(
    patients: &dyn Repository<Patient>,
    national_id: &str,
) -> DomainResult<Option<Patient>> {
    let wanted = national_id.trim();
    patients.find(&|p: &Patient| p.national_id.trim() == wanted)
}

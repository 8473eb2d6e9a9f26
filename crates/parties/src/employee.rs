use serde::{Deserialize, Serialize};

use dispensary_core::{DomainResult, EmployeeId, Entity, EntityKind};

use crate::record::{PartyRecord, require, require_name};

/// Staff member who records requisitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub phone: String,
    pub national_id: String,
}

impl Employee {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        national_id: impl Into<String>,
    ) -> Self {
        Self {
            id: EmployeeId::new(),
            name: name.into(),
            phone: phone.into(),
            national_id: national_id.into(),
        }
    }
}

impl Entity for Employee {
    type Id = EmployeeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl PartyRecord for Employee {
    const KIND: EntityKind = EntityKind::Employee;

    fn validate(&self) -> DomainResult<()> {
        require_name(&self.name)?;
        require("phone", &self.phone)?;
        require("national id", &self.national_id)
    }
}

use serde::{Deserialize, Serialize};

use dispensary_core::{DomainResult, Entity, EntityKind, SupplierId};

use crate::record::{PartyRecord, require, require_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub phone: String,
    /// Company registration / tax number.
    pub tax_id: String,
}

impl Supplier {
    pub fn new(name: impl Into<String>, phone: impl Into<String>, tax_id: impl Into<String>) -> Self {
        Self {
            id: SupplierId::new(),
            name: name.into(),
            phone: phone.into(),
            tax_id: tax_id.into(),
        }
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl PartyRecord for Supplier {
    const KIND: EntityKind = EntityKind::Supplier;

    fn validate(&self) -> DomainResult<()> {
        require_name(&self.name)?;
        require("phone", &self.phone)?;
        require("tax id", &self.tax_id)
    }
}

//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A strictly positive unit count.
///
/// Every quantity-taking operation (restock, dispense line, manual stock
/// adjustment) goes through `Quantity::new`, so `InvalidQuantity` is raised
/// before any lock is taken or any state is read.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl Quantity {
    pub fn new(value: i64) -> DomainResult<Self> {
        if value <= 0 {
            return Err(DomainError::InvalidQuantity(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl ValueObject for Quantity {}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_is_rejected() {
        assert_eq!(Quantity::new(0), Err(DomainError::InvalidQuantity(0)));
    }

    #[test]
    fn deserializing_a_negative_quantity_fails() {
        let parsed: Result<Quantity, _> = serde_json::from_str("-3");
        assert!(parsed.is_err());
        let ok: Quantity = serde_json::from_str("3").unwrap();
        assert_eq!(ok.get(), 3);
    }

    proptest! {
        /// Property: a quantity exists exactly when the input is positive.
        #[test]
        fn quantity_accepts_only_positive_values(value in any::<i64>()) {
            match Quantity::new(value) {
                Ok(q) => {
                    prop_assert!(value > 0);
                    prop_assert_eq!(q.get(), value);
                }
                Err(e) => {
                    prop_assert!(value <= 0);
                    prop_assert_eq!(e, DomainError::InvalidQuantity(value));
                }
            }
        }
    }
}

//! Entitlement module - grants of capacity from a pool to a consumer

use crate::{Consumer, Pool};

/// A grant of pool capacity to a consumer
///
/// Created on a successful bind, resized by updates and destroyed on unbind.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entitlement {
    /// Unique identifier
    pub id: String,

    /// Consumer holding the grant
    pub consumer: Consumer,

    /// Pool the grant was taken from
    pub pool: Pool,

    /// Granted units (positive)
    pub quantity: u64,
}

impl Entitlement {
    /// Create an entitlement
    ///
    /// # Errors
    /// Returns an error if `quantity` is zero.
    pub fn new(
        id: impl Into<String>,
        consumer: Consumer,
        pool: Pool,
        quantity: u64,
    ) -> Result<Self, String> {
        let id = id.into();
        if quantity == 0 {
            return Err(format!("Entitlement {} must grant at least one unit", id));
        }
        Ok(Self {
            id,
            consumer,
            pool,
            quantity,
        })
    }

    /// Granted units as a signed value, for arithmetic with quantity changes
    pub fn signed_quantity(&self) -> i64 {
        i64::try_from(self.quantity).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Capacity;

    #[test]
    fn test_zero_quantity_rejected() {
        let consumer = Consumer::new("c1", "org", "system");
        let pool = Pool::new("p1", "org", "prod", Capacity::Count(5));

        assert!(Entitlement::new("e0", consumer.clone(), pool.clone(), 0).is_err());
        assert_eq!(Entitlement::new("e1", consumer, pool, 2).unwrap().signed_quantity(), 2);
    }
}

//! Deferred pool mutations produced by binds and unbinds
//!
//! The rules never write to storage. They describe the writes in a
//! [`PoolOperationCallback`] and the caller replays it inside the transaction
//! that read the pools in the first place.

use crate::traits::PoolWriter;
use crate::{Capacity, Pool};
use std::collections::BTreeMap;

/// A pending absolute quantity for one pool
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuantityChange {
    /// Pool to update
    pub pool_id: String,

    /// New quantity
    pub quantity: Capacity,
}

/// One recorded operation
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PoolOperation {
    /// Set a pool's quantity
    SetQuantity(QuantityChange),

    /// Persist a newly built pool
    CreatePool(Pool),

    /// Operations produced by a sub-step
    Nested(PoolOperationCallback),
}

/// Append-only batch of pool mutations
///
/// Entries keep their call order, including repeated writes to the same pool;
/// replaying them in order makes the last write win.
///
/// # Examples
///
/// ```
/// use allot_domain::{Capacity, Pool, PoolOperationCallback};
///
/// let bonus = Pool::new("bonus", "org", "prod", Capacity::Count(40));
///
/// let mut callback = PoolOperationCallback::new();
/// callback.set_quantity_to_pool(&bonus, Capacity::Count(28));
///
/// let mut nested = PoolOperationCallback::new();
/// nested.set_quantity_to_pool(&bonus, Capacity::Count(16));
/// callback.append_callback(nested);
///
/// assert_eq!(callback.quantity_changes().len(), 2);
/// assert_eq!(callback.final_quantities().get("bonus"), Some(&Capacity::Count(16)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolOperationCallback {
    operations: Vec<PoolOperation>,
}

impl PoolOperationCallback {
    /// Create an empty callback
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending quantity for `pool`
    pub fn set_quantity_to_pool(&mut self, pool: &Pool, quantity: Capacity) {
        self.operations.push(PoolOperation::SetQuantity(QuantityChange {
            pool_id: pool.id.clone(),
            quantity,
        }));
    }

    /// Record a pool to create
    pub fn create_pool(&mut self, pool: Pool) {
        self.operations.push(PoolOperation::CreatePool(pool));
    }

    /// Append the operations of a sub-step after everything recorded so far
    pub fn append_callback(&mut self, other: PoolOperationCallback) {
        if !other.is_empty() {
            self.operations.push(PoolOperation::Nested(other));
        }
    }

    /// Whether nothing was recorded (nested empties included)
    pub fn is_empty(&self) -> bool {
        self.operations.iter().all(|op| match op {
            PoolOperation::Nested(inner) => inner.is_empty(),
            _ => false,
        })
    }

    /// Top-level operations in call order
    pub fn operations(&self) -> &[PoolOperation] {
        &self.operations
    }

    /// Every quantity change, nested ones inlined, in call order
    pub fn quantity_changes(&self) -> Vec<&QuantityChange> {
        let mut changes = Vec::new();
        self.visit(&mut |op| {
            if let PoolOperation::SetQuantity(change) = op {
                changes.push(change);
            }
        });
        changes
    }

    /// Every pool to create, nested ones inlined, in call order
    pub fn pools_to_create(&self) -> Vec<&Pool> {
        let mut pools = Vec::new();
        self.visit(&mut |op| {
            if let PoolOperation::CreatePool(pool) = op {
                pools.push(pool);
            }
        });
        pools
    }

    /// Resulting quantity per pool once all changes are replayed
    pub fn final_quantities(&self) -> BTreeMap<String, Capacity> {
        self.quantity_changes()
            .into_iter()
            .map(|change| (change.pool_id.clone(), change.quantity))
            .collect()
    }

    /// Replay every operation against `writer` in call order
    ///
    /// # Errors
    /// Stops at the first writer failure; the caller is expected to roll back
    /// the surrounding transaction.
    pub fn apply<W: PoolWriter>(&self, writer: &mut W) -> Result<(), W::Error> {
        for op in &self.operations {
            match op {
                PoolOperation::SetQuantity(change) => {
                    writer.set_pool_quantity(&change.pool_id, change.quantity)?;
                }
                PoolOperation::CreatePool(pool) => writer.create_pool(pool.clone())?,
                PoolOperation::Nested(inner) => inner.apply(writer)?,
            }
        }
        Ok(())
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a PoolOperation)) {
        for op in &self.operations {
            match op {
                PoolOperation::Nested(inner) => inner.visit(f),
                other => f(other),
            }
        }
    }
}

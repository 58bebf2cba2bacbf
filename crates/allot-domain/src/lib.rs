//! Allot Domain Layer
//!
//! This crate contains the data model shared by the entitlement rules:
//! consumers, pools, entitlements and the deferred pool operations the rules
//! emit. It has no mandatory external dependencies; `serde` derives are
//! available behind the `serde` feature.
//!
//! ## Key Concepts
//!
//! - **Pool**: A block of entitlement capacity tied to a subscription
//! - **Derived (bonus) pool**: A pool whose quantity follows exports from a physical pool
//! - **Capacity**: Unlimited, blocked, or a positive count of units
//! - **Entitlement**: A grant of pool capacity to a consumer
//! - **Manifest consumer**: A downstream distributor that re-exports entitlements
//!
//! ## Architecture
//!
//! - Persistence owns every entity; the rules only borrow them for one call
//! - Trait definitions for every external interaction live in [`traits`]
//! - Mutations are described in a [`PoolOperationCallback`], never performed here

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attributes;
pub mod capacity;
pub mod consumer;
pub mod entitlement;
pub mod pool;
pub mod pool_operation;
pub mod traits;

// Re-exports for convenience
pub use attributes::{Attributes, VirtLimit};
pub use capacity::Capacity;
pub use consumer::{Consumer, ConsumerCategory, ConsumerType};
pub use entitlement::Entitlement;
pub use pool::{Pool, PoolQuantity};
pub use pool_operation::{PoolOperation, PoolOperationCallback, QuantityChange};
pub use traits::{Clock, FixedClock, SystemClock};

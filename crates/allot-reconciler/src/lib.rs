//! Allot Reconciler - Bonus Pool Quantity Management
//!
//! After entitlements are granted or removed, the derived (bonus) pools of a
//! subscription have to follow. This crate works out those changes.
//!
//! ## Operations
//!
//! - **Post-entitlement**: create host-restricted pools for physical hosts, or
//!   shrink bonus pools when a manifest consumer exports capacity
//! - **Post-unbind**: give exported capacity back to the bonus pools
//!
//! Post-entitlement changes are returned as a
//! [`PoolOperationCallback`](allot_domain::PoolOperationCallback) for the
//! caller to replay; post-unbind applies its changes directly.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod reconciler;

pub use config::ReconcilerConfig;
pub use error::ReconcilerError;
pub use reconciler::Reconciler;

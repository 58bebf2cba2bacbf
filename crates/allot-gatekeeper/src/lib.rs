//! Allot Gatekeeper - Entitlement Rule Enforcement
//!
//! Decides whether a consumer may take entitlements from a pool. Every
//! applicable validator runs and reports into a [`ValidationResult`]; the
//! capacity and expiration checks run last for every pool.
//!
//! ## Validation Pipeline
//!
//! 1. Compiled validators, each keyed by a pool attribute ([`PoolValidator`])
//! 2. Optional product rules looked up by product id ([`rules::RuleSource`])
//! 3. Universal post-checks: capacity, then expiration
//!
//! Business-rule failures never abort the pipeline; only collaborator
//! failures surface as [`GatekeeperError`].

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod context;
mod enforcer;
mod error;
pub mod messages;
mod result;
pub mod rules;
mod validator;

pub use config::EnforcerConfig;
pub use context::{CallerType, ValidationContext, ValidationContextBuilder};
pub use enforcer::Enforcer;
pub use error::GatekeeperError;
pub use messages::{DefaultTranslator, ErrorKeys, MessageTranslator, WarningKeys};
pub use result::{ValidationError, ValidationResult, ValidationWarning};
pub use rules::{ProductRuleTable, RuleError, RuleOutcome, RuleSource};
pub use validator::PoolValidator;

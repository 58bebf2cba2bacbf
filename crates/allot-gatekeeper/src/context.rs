//! Validation context - everything a rule may look at

use crate::GatekeeperError;
use allot_domain::{Consumer, ConsumerType, Pool};
use serde::{Deserialize, Serialize};

/// Origin of a validation request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallerType {
    /// A consumer binding to a pool
    Bind,

    /// Listing the pools a consumer could bind to
    ListPools,

    /// Anything else
    #[default]
    Unknown,
}

/// Immutable snapshot handed to every validator
///
/// Built once per pool through [`ValidationContext::builder`].
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    caller: CallerType,
    consumer: &'a Consumer,
    consumer_type: &'a ConsumerType,
    pool: &'a Pool,
    quantity: i64,
    host: Option<&'a Consumer>,
}

impl<'a> ValidationContext<'a> {
    /// Start building a context
    pub fn builder() -> ValidationContextBuilder<'a> {
        ValidationContextBuilder::default()
    }

    /// Who is asking
    pub fn caller(&self) -> CallerType {
        self.caller
    }

    /// Consumer requesting the entitlement
    pub fn consumer(&self) -> &'a Consumer {
        self.consumer
    }

    /// Resolved type of the consumer
    pub fn consumer_type(&self) -> &'a ConsumerType {
        self.consumer_type
    }

    /// Pool being validated
    pub fn pool(&self) -> &'a Pool {
        self.pool
    }

    /// Requested quantity
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Host of the consumer, when it is a guest with a known host
    pub fn host(&self) -> Option<&'a Consumer> {
        self.host
    }

    /// Shorthand for the consumer type's manifest flag
    pub fn is_manifest(&self) -> bool {
        self.consumer_type.is_manifest()
    }
}

/// Staged builder for [`ValidationContext`]
///
/// # Examples
///
/// ```
/// use allot_domain::{Capacity, Consumer, ConsumerType, Pool};
/// use allot_gatekeeper::{CallerType, ValidationContext};
///
/// let consumer = Consumer::new("c1", "org", "system");
/// let consumer_type = ConsumerType::system();
/// let pool = Pool::new("p1", "org", "prod", Capacity::Count(5));
///
/// let context = ValidationContext::builder()
///     .caller(CallerType::Bind)
///     .consumer(&consumer)
///     .consumer_type(&consumer_type)
///     .pool(&pool)
///     .quantity(2)
///     .build()
///     .unwrap();
/// assert_eq!(context.quantity(), 2);
/// assert!(context.host().is_none());
///
/// assert!(ValidationContext::builder().pool(&pool).build().is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ValidationContextBuilder<'a> {
    caller: CallerType,
    consumer: Option<&'a Consumer>,
    consumer_type: Option<&'a ConsumerType>,
    pool: Option<&'a Pool>,
    quantity: i64,
    host: Option<&'a Consumer>,
}

impl Default for ValidationContextBuilder<'_> {
    fn default() -> Self {
        Self {
            caller: CallerType::Unknown,
            consumer: None,
            consumer_type: None,
            pool: None,
            quantity: 1,
            host: None,
        }
    }
}

impl<'a> ValidationContextBuilder<'a> {
    /// Set the caller classification
    pub fn caller(mut self, caller: CallerType) -> Self {
        self.caller = caller;
        self
    }

    /// Set the consumer
    pub fn consumer(mut self, consumer: &'a Consumer) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// Set the resolved consumer type
    pub fn consumer_type(mut self, consumer_type: &'a ConsumerType) -> Self {
        self.consumer_type = Some(consumer_type);
        self
    }

    /// Set the pool
    pub fn pool(mut self, pool: &'a Pool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Set the requested quantity
    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    /// Set (or clear) the host consumer
    pub fn host(mut self, host: Option<&'a Consumer>) -> Self {
        self.host = host;
        self
    }

    /// Finish the context
    ///
    /// # Errors
    /// Returns [`GatekeeperError::MissingContextField`] when the consumer, its
    /// type or the pool was not supplied.
    pub fn build(self) -> Result<ValidationContext<'a>, GatekeeperError> {
        Ok(ValidationContext {
            caller: self.caller,
            consumer: self
                .consumer
                .ok_or(GatekeeperError::MissingContextField("consumer"))?,
            consumer_type: self
                .consumer_type
                .ok_or(GatekeeperError::MissingContextField("consumer_type"))?,
            pool: self.pool.ok_or(GatekeeperError::MissingContextField("pool"))?,
            quantity: self.quantity,
            host: self.host,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allot_domain::Capacity;

    #[test]
    fn test_builder_defaults() {
        let consumer = Consumer::new("c1", "org", "system");
        let consumer_type = ConsumerType::system();
        let pool = Pool::new("p1", "org", "prod", Capacity::Unlimited);

        let context = ValidationContext::builder()
            .consumer(&consumer)
            .consumer_type(&consumer_type)
            .pool(&pool)
            .build()
            .unwrap();

        assert_eq!(context.caller(), CallerType::Unknown);
        assert_eq!(context.quantity(), 1);
        assert!(!context.is_manifest());
    }

    #[test]
    fn test_builder_reports_missing_field() {
        let consumer = Consumer::new("c1", "org", "system");
        let pool = Pool::new("p1", "org", "prod", Capacity::Unlimited);

        let result = ValidationContext::builder()
            .consumer(&consumer)
            .pool(&pool)
            .build();

        match result {
            Err(GatekeeperError::MissingContextField(field)) => assert_eq!(field, "consumer_type"),
            other => panic!("Expected MissingContextField, got {:?}", other),
        }
    }

    #[test]
    fn test_caller_type_serde_names() {
        let json = serde_json::to_string(&CallerType::ListPools).unwrap();
        assert_eq!(json, "\"list-pools\"");
    }
}

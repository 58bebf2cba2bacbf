//! Pluggable product rules
//!
//! Product-specific rules are looked up by label (the pool's product id) and
//! run after the compiled validators. A missing rule is normal and reported as
//! [`RuleOutcome::NoRule`].

use crate::{ValidationContext, ValidationResult};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// What happened when a label was evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// A rule existed and ran
    Applied,

    /// No rule is registered for the label
    NoRule,
}

/// A rule failed to run (as opposed to reporting a validation error)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RuleError(pub String);

/// Source of product-specific rules
pub trait RuleSource: Send + Sync {
    /// Run the rule registered for `label`, if any
    fn evaluate(
        &self,
        label: &str,
        context: &ValidationContext<'_>,
        result: &mut ValidationResult,
    ) -> Result<RuleOutcome, RuleError>;
}

type ProductRule =
    Box<dyn Fn(&ValidationContext<'_>, &mut ValidationResult) -> Result<(), RuleError> + Send + Sync>;

/// In-process rule source backed by closures
///
/// # Examples
///
/// ```
/// use allot_gatekeeper::rules::{ProductRuleTable, RuleSource};
///
/// let table = ProductRuleTable::new().with_rule("awesomeos", |context, result| {
///     if context.quantity() > 4 {
///         result.add_error("rulefailed.too.many");
///     }
///     Ok(())
/// });
/// assert!(table.contains("awesomeos"));
/// assert!(!table.contains("other"));
/// ```
#[derive(Default)]
pub struct ProductRuleTable {
    rules: HashMap<String, ProductRule>,
}

impl ProductRuleTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    pub fn with_rule<F>(mut self, label: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&ValidationContext<'_>, &mut ValidationResult) -> Result<(), RuleError>
            + Send
            + Sync
            + 'static,
    {
        self.register(label, rule);
        self
    }

    /// Register (or replace) the rule for `label`
    pub fn register<F>(&mut self, label: impl Into<String>, rule: F)
    where
        F: Fn(&ValidationContext<'_>, &mut ValidationResult) -> Result<(), RuleError>
            + Send
            + Sync
            + 'static,
    {
        self.rules.insert(label.into(), Box::new(rule));
    }

    /// Whether a rule is registered for `label`
    pub fn contains(&self, label: &str) -> bool {
        self.rules.contains_key(label)
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rule is registered
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleSource for ProductRuleTable {
    fn evaluate(
        &self,
        label: &str,
        context: &ValidationContext<'_>,
        result: &mut ValidationResult,
    ) -> Result<RuleOutcome, RuleError> {
        match self.rules.get(label) {
            Some(rule) => {
                rule(context, result)?;
                Ok(RuleOutcome::Applied)
            }
            None => Ok(RuleOutcome::NoRule),
        }
    }
}

impl fmt::Debug for ProductRuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels: Vec<&String> = self.rules.keys().collect();
        labels.sort();
        f.debug_struct("ProductRuleTable")
            .field("labels", &labels)
            .finish()
    }
}

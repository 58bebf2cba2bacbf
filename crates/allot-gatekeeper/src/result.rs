//! Validation results
//!
//! Errors block an entitlement, warnings only inform. Both carry a message key
//! and positional arguments so the caller can localise them.

use serde::Serialize;
use std::fmt;

/// A blocking rule failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Message key
    pub key: String,

    /// Positional arguments for the message
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Pre-formatted message, when the check formats its own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationError {
    /// Create an error with no arguments
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            args: Vec::new(),
            message: None,
        }
    }

    /// Attach positional arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.args = args.into_iter().map(|a| a.to_string()).collect();
        self
    }

    /// Attach a formatted message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl From<&str> for ValidationError {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ValidationError {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}", message),
            None if self.args.is_empty() => write!(f, "{}", self.key),
            None => write!(f, "{} ({})", self.key, self.args.join(", ")),
        }
    }
}

/// A non-blocking rule finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    /// Message key
    pub key: String,

    /// Positional arguments for the message
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl ValidationWarning {
    /// Create a warning with no arguments
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            args: Vec::new(),
        }
    }

    /// Attach positional arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.args = args.into_iter().map(|a| a.to_string()).collect();
        self
    }
}

impl From<&str> for ValidationWarning {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ValidationWarning {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{} ({})", self.key, self.args.join(", "))
        }
    }
}

/// Errors and warnings accumulated by one validation attempt
///
/// Entries keep the order in which the rules reported them.
///
/// # Examples
///
/// ```
/// use allot_gatekeeper::{ValidationResult, ValidationWarning};
///
/// let mut result = ValidationResult::new();
/// assert!(result.is_successful());
///
/// result.add_warning(ValidationWarning::new("rulewarning.architecture.mismatch"));
/// assert!(result.is_successful());
/// assert!(result.has_warnings());
///
/// result.add_error("rulefailed.no.entitlements.available");
/// assert!(!result.is_successful());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a blocking error (a bare key or a structured error)
    pub fn add_error(&mut self, error: impl Into<ValidationError>) {
        self.errors.push(error.into());
    }

    /// Record a warning (a bare key or a structured warning)
    pub fn add_warning(&mut self, warning: impl Into<ValidationWarning>) {
        self.warnings.push(warning.into());
    }

    /// Errors in reporting order
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Warnings in reporting order
    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    /// Whether any error was reported
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether any warning was reported
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// True iff no error was reported
    pub fn is_successful(&self) -> bool {
        !self.has_errors()
    }

    /// Whether an error with `key` was reported
    pub fn has_error(&self, key: &str) -> bool {
        self.errors.iter().any(|e| e.key == key)
    }

    /// Whether a warning with `key` was reported
    pub fn has_warning(&self, key: &str) -> bool {
        self.warnings.iter().any(|w| w.key == key)
    }

    /// Append everything from `other`, after what is already recorded
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

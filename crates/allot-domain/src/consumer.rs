//! Consumer module - registered clients of the entitlement service

use crate::attributes::{facts, Attributes};

/// Broad classification of a consumer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ConsumerCategory {
    /// Systems and hypervisors that consume entitlements themselves
    Ordinary,

    /// Downstream distributors that export entitlements in a manifest
    Manifest,

    /// Anything else (people, domains, ...)
    Other,
}

/// Type of a consumer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsumerType {
    /// Type label, e.g. "system" or "candlepin"
    pub label: String,

    /// Classification driving the rules
    pub category: ConsumerCategory,
}

impl ConsumerType {
    /// Create a consumer type
    pub fn new(label: impl Into<String>, category: ConsumerCategory) -> Self {
        Self {
            label: label.into(),
            category,
        }
    }

    /// Ordinary system consumer
    pub fn system() -> Self {
        Self::new("system", ConsumerCategory::Ordinary)
    }

    /// Person consumer
    pub fn person() -> Self {
        Self::new("person", ConsumerCategory::Other)
    }

    /// Distributor consumer with the given label
    pub fn manifest(label: impl Into<String>) -> Self {
        Self::new(label, ConsumerCategory::Manifest)
    }

    /// Whether consumers of this type export entitlements downstream
    pub fn is_manifest(&self) -> bool {
        self.category == ConsumerCategory::Manifest
    }
}

/// A registered client of the entitlement service
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Consumer {
    /// Unique identifier
    pub uuid: String,

    /// Display name
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,

    /// Owning organisation
    pub owner_id: String,

    /// Label of the consumer's type (resolved through a directory)
    pub type_label: String,

    /// Facts reported by the client
    #[cfg_attr(feature = "serde", serde(default))]
    pub facts: Attributes,

    /// Registration time (seconds since the Unix epoch)
    #[cfg_attr(feature = "serde", serde(default))]
    pub created: u64,
}

impl Consumer {
    /// Create a consumer with no facts
    pub fn new(
        uuid: impl Into<String>,
        owner_id: impl Into<String>,
        type_label: impl Into<String>,
    ) -> Self {
        let uuid = uuid.into();
        Self {
            name: uuid.clone(),
            uuid,
            owner_id: owner_id.into(),
            type_label: type_label.into(),
            facts: Attributes::new(),
            created: 0,
        }
    }

    /// Builder-style helper to add a fact
    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    /// Get a fact value
    pub fn fact(&self, key: &str) -> Option<&str> {
        self.facts.get(key).map(String::as_str)
    }

    /// Whether a fact is present
    pub fn has_fact(&self, key: &str) -> bool {
        self.facts.contains_key(key)
    }

    /// Whether this consumer is a virtual guest
    pub fn is_guest(&self) -> bool {
        self.fact(facts::VIRT_IS_GUEST)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Guest uuid as reported by the hypervisor, used to find the host
    pub fn virt_uuid(&self) -> Option<&str> {
        self.fact(facts::VIRT_UUID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_detection() {
        let physical = Consumer::new("c1", "org", "system");
        assert!(!physical.is_guest());

        let guest = Consumer::new("c2", "org", "system").with_fact(facts::VIRT_IS_GUEST, "True");
        assert!(guest.is_guest());

        let not_guest = Consumer::new("c3", "org", "system").with_fact(facts::VIRT_IS_GUEST, "false");
        assert!(!not_guest.is_guest());

        let yes = Consumer::new("c4", "org", "system").with_fact(facts::VIRT_IS_GUEST, "yes");
        assert!(!yes.is_guest());
    }

    #[test]
    fn test_virt_uuid() {
        let guest = Consumer::new("c1", "org", "system").with_fact(facts::VIRT_UUID, "abc-123");
        assert_eq!(guest.virt_uuid(), Some("abc-123"));
        assert!(guest.has_fact(facts::VIRT_UUID));
    }

    #[test]
    fn test_consumer_type_presets() {
        assert!(!ConsumerType::system().is_manifest());
        assert!(!ConsumerType::person().is_manifest());
        assert!(ConsumerType::manifest("candlepin").is_manifest());
    }
}

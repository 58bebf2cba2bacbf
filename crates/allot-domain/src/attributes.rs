//! Attribute and fact keys understood by the entitlement rules

use std::collections::BTreeMap;

/// Attribute map as stored on pools and products
pub type Attributes = BTreeMap<String, String>;

/// Number of guest entitlements one physical unit yields ("unlimited" or an integer)
pub const VIRT_LIMIT: &str = "virt_limit";

/// Derived pools from this product may only serve guests of the binding host
pub const HOST_LIMITED: &str = "host_limited";

/// Groups pools that stack under a single derived pool
pub const STACKING_ID: &str = "stacking_id";

/// "yes" when a consumer may hold more than one unit
pub const MULTI_ENTITLEMENT: &str = "multi-entitlement";

/// Quantity granted to a physical consumer must be a multiple of this value
pub const INSTANCE_MULTIPLIER: &str = "instance_multiplier";

/// Marks a bonus pool derived from a physical pool
pub const DERIVED_POOL: &str = "pool_derived";

/// Pool is restricted to guests of the host with this uuid
pub const REQUIRES_HOST: &str = "requires_host";

/// Pool is restricted to the consumer with this uuid
pub const REQUIRES_CONSUMER: &str = "requires_consumer";

/// Pool is restricted to consumers of the listed types
pub const REQUIRES_CONSUMER_TYPE: &str = "requires_consumer_type";

/// Pool is only for virtual guests
pub const VIRT_ONLY: &str = "virt_only";

/// Pool is only for physical systems
pub const PHYSICAL_ONLY: &str = "physical_only";

/// Pool is only for guests whose host is not yet known
pub const UNMAPPED_GUESTS_ONLY: &str = "unmapped_guests_only";

/// Supported architectures (comma separated)
pub const ARCHITECTURE: &str = "arch";

/// Sockets covered by one unit
pub const SOCKETS: &str = "sockets";

/// Cores covered by one unit
pub const CORES: &str = "cores";

/// RAM covered by one unit, in GiB
pub const RAM: &str = "ram";

/// Consumer fact keys
pub mod facts {
    /// Uuid of the guest as reported by the hypervisor
    pub const VIRT_UUID: &str = "virt.uuid";

    /// "true" for virtual guests
    pub const VIRT_IS_GUEST: &str = "virt.is_guest";

    /// Machine architecture
    pub const ARCHITECTURE: &str = "uname.machine";

    /// Physical socket count
    pub const SOCKETS: &str = "cpu.cpu_socket(s)";

    /// Cores per socket
    pub const CORES_PER_SOCKET: &str = "cpu.core(s)_per_socket";

    /// Total memory in KiB
    pub const MEMORY_TOTAL: &str = "memory.memtotal";
}

/// Whether an attribute value reads as an affirmative flag ("true" or "yes", any case)
pub fn is_affirmative(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
}

/// Whether a [`MULTI_ENTITLEMENT`] value allows several units ("yes", any case)
pub fn is_yes(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("yes"))
}

/// Parsed value of the [`VIRT_LIMIT`] attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtLimit {
    /// Guests may take any number of derived entitlements
    Unlimited,

    /// Derived entitlements per physical unit
    Limited(i64),
}

impl VirtLimit {
    /// Parse an attribute value
    ///
    /// "unlimited" is matched case-insensitively; anything that is neither that
    /// sentinel nor an integer is malformed and yields `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use allot_domain::VirtLimit;
    ///
    /// assert_eq!(VirtLimit::parse("Unlimited"), Some(VirtLimit::Unlimited));
    /// assert_eq!(VirtLimit::parse("4"), Some(VirtLimit::Limited(4)));
    /// assert_eq!(VirtLimit::parse("four"), None);
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("unlimited") {
            return Some(VirtLimit::Unlimited);
        }
        value.parse::<i64>().ok().map(VirtLimit::Limited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirmative_values() {
        assert!(is_affirmative(Some("true")));
        assert!(is_affirmative(Some("YES")));
        assert!(!is_affirmative(Some("no")));
        assert!(!is_affirmative(Some("1")));
        assert!(!is_affirmative(None));

        assert!(is_yes(Some("Yes")));
        assert!(!is_yes(Some("true")));
        assert!(!is_yes(None));
    }

    #[test]
    fn test_virt_limit_parse() {
        assert_eq!(VirtLimit::parse("UNLIMITED"), Some(VirtLimit::Unlimited));
        assert_eq!(VirtLimit::parse(" 8 "), Some(VirtLimit::Limited(8)));
        assert_eq!(VirtLimit::parse("-1"), Some(VirtLimit::Limited(-1)));
        assert_eq!(VirtLimit::parse(""), None);
        assert_eq!(VirtLimit::parse("4.5"), None);
    }
}

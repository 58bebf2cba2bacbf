//! Capacity module - how many units a pool can still hand out

use std::fmt;

/// Raw value persisted for an unlimited pool
pub const UNLIMITED_RAW: i64 = -1;

/// Quantity of a pool
///
/// Storage encodes this as a signed integer where `-1` means unlimited and `0`
/// means exhausted. Keeping the three states apart in the type means a blocked
/// bonus pool can never be mistaken for a missing or unlimited one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "i64", into = "i64")
)]
pub enum Capacity {
    /// No upper bound on consumption
    Unlimited,

    /// Zero units; blocks any further bind
    Blocked,

    /// A positive number of units
    Count(u64),
}

impl Capacity {
    /// Build a capacity from a unit count, mapping zero to [`Capacity::Blocked`]
    ///
    /// # Examples
    ///
    /// ```
    /// use allot_domain::Capacity;
    ///
    /// assert_eq!(Capacity::count(0), Capacity::Blocked);
    /// assert_eq!(Capacity::count(5), Capacity::Count(5));
    /// ```
    pub fn count(units: u64) -> Self {
        if units == 0 {
            Capacity::Blocked
        } else {
            Capacity::Count(units)
        }
    }

    /// Decode the persisted signed representation
    ///
    /// # Errors
    /// Returns an error for any negative value other than the unlimited sentinel
    pub fn from_raw(raw: i64) -> Result<Self, String> {
        match raw {
            UNLIMITED_RAW => Ok(Capacity::Unlimited),
            0 => Ok(Capacity::Blocked),
            n if n > 0 => Ok(Capacity::Count(n as u64)),
            n => Err(format!("Invalid pool quantity: {}", n)),
        }
    }

    /// Encode back to the persisted signed representation
    pub fn to_raw(&self) -> i64 {
        match self {
            Capacity::Unlimited => UNLIMITED_RAW,
            Capacity::Blocked => 0,
            Capacity::Count(n) => i64::try_from(*n).unwrap_or(i64::MAX),
        }
    }

    /// Whether this pool has no upper bound
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Capacity::Unlimited)
    }

    /// Whether this pool is at zero
    pub fn is_blocked(&self) -> bool {
        matches!(self, Capacity::Blocked)
    }

    /// Apply a signed delta, never dropping below zero
    ///
    /// An unlimited pool stays unlimited whatever the delta.
    ///
    /// # Examples
    ///
    /// ```
    /// use allot_domain::Capacity;
    ///
    /// assert_eq!(Capacity::Count(20).adjusted(-12), Capacity::Count(8));
    /// assert_eq!(Capacity::Count(5).adjusted(-12), Capacity::Blocked);
    /// assert_eq!(Capacity::Blocked.adjusted(4), Capacity::Count(4));
    /// assert_eq!(Capacity::Unlimited.adjusted(-3), Capacity::Unlimited);
    /// ```
    pub fn adjusted(&self, delta: i64) -> Self {
        match self {
            Capacity::Unlimited => Capacity::Unlimited,
            Capacity::Blocked | Capacity::Count(_) => {
                let current = i128::from(self.to_raw());
                let next = (current + i128::from(delta)).max(0);
                Capacity::count(u64::try_from(next).unwrap_or(u64::MAX))
            }
        }
    }

    /// Whether `requested` more units fit next to `consumed` already handed out
    ///
    /// A negative request (shrinking an existing entitlement) always fits.
    pub fn available(&self, consumed: u64, requested: i64) -> bool {
        match self {
            Capacity::Unlimited => true,
            Capacity::Blocked | Capacity::Count(_) => {
                i128::from(self.to_raw()) - i128::from(consumed) >= i128::from(requested)
            }
        }
    }
}

impl TryFrom<i64> for Capacity {
    type Error = String;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

impl From<Capacity> for i64 {
    fn from(capacity: Capacity) -> Self {
        capacity.to_raw()
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Unlimited => write!(f, "unlimited"),
            Capacity::Blocked => write!(f, "0"),
            Capacity::Count(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_decoding() {
        assert_eq!(Capacity::from_raw(-1), Ok(Capacity::Unlimited));
        assert_eq!(Capacity::from_raw(0), Ok(Capacity::Blocked));
        assert_eq!(Capacity::from_raw(10), Ok(Capacity::Count(10)));
        assert!(Capacity::from_raw(-2).is_err());
    }

    #[test]
    fn test_availability() {
        assert!(Capacity::Unlimited.available(1_000, 1_000));
        assert!(Capacity::Count(10).available(7, 3));
        assert!(!Capacity::Count(10).available(8, 3));
        assert!(!Capacity::Blocked.available(0, 1));
        assert!(Capacity::Blocked.available(0, -1));
    }

    #[test]
    fn test_display() {
        assert_eq!(Capacity::Unlimited.to_string(), "unlimited");
        assert_eq!(Capacity::Blocked.to_string(), "0");
        assert_eq!(Capacity::Count(3).to_string(), "3");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: decoding then encoding the persisted value is lossless
        #[test]
        fn test_raw_roundtrip(raw in -1i64..i64::MAX) {
            let capacity = Capacity::from_raw(raw).map_err(TestCaseError::fail)?;
            prop_assert_eq!(capacity.to_raw(), raw);
        }

        /// Property: an adjustment and its inverse restore the count when nothing was floored
        #[test]
        fn test_adjust_inverse(start in 1u64..1_000_000, delta in 0i64..1_000_000) {
            let start = Capacity::Count(start);
            prop_assert_eq!(start.adjusted(delta).adjusted(-delta), start);
        }

        /// Property: adjustments never produce a negative or unlimited value from a finite one
        #[test]
        fn test_adjust_never_negative(start in 0u64..1_000, delta in -10_000i64..10_000) {
            let adjusted = Capacity::count(start).adjusted(delta);
            prop_assert!(!adjusted.is_unlimited());
            prop_assert!(adjusted.to_raw() >= 0);
        }
    }
}

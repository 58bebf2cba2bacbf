//! Property tests for the pool data model

use allot_domain::{Capacity, Pool};
use proptest::collection::btree_map;
use proptest::prelude::*;

proptest! {
    /// Property: the flattened map holds every key of both sources, pool values winning
    #[test]
    fn test_flattened_attributes_precedence(
        pool_attrs in btree_map("[a-e]", "[a-z]{1,4}", 0..5),
        product_attrs in btree_map("[a-e]", "[a-z]{1,4}", 0..5),
    ) {
        let mut pool = Pool::new("p", "org", "prod", Capacity::Count(1));
        pool.attributes = pool_attrs.clone();
        pool.product_attributes = product_attrs.clone();

        let flat = pool.flattened_attributes();

        for (key, value) in &flat {
            let expected = pool_attrs.get(key).or_else(|| product_attrs.get(key));
            prop_assert_eq!(Some(value), expected);
            prop_assert_eq!(pool.merged_attribute(key), Some(value.as_str()));
        }
        for key in pool_attrs.keys().chain(product_attrs.keys()) {
            prop_assert!(flat.contains_key(key));
            prop_assert!(pool.has_merged_attribute(key));
        }
    }

    /// Property: availability agrees with plain signed arithmetic for finite pools
    #[test]
    fn test_availability_matches_arithmetic(
        total in 0u64..1_000,
        consumed in 0u64..1_000,
        requested in -50i64..1_000,
    ) {
        let mut pool = Pool::new("p", "org", "prod", Capacity::count(total));
        pool.consumed = consumed;

        let expected = total as i64 - consumed as i64 >= requested;
        prop_assert_eq!(pool.entitlements_available(requested), expected);
    }

    /// Property: unlimited pools always have room
    #[test]
    fn test_unlimited_always_available(consumed in 0u64..u64::MAX, requested in any::<i64>()) {
        let mut pool = Pool::new("p", "org", "prod", Capacity::Unlimited);
        pool.consumed = consumed;
        prop_assert!(pool.entitlements_available(requested));
    }
}

//! Voxel spacing canonicalisation

use copick::codec::{EntityKey, Spacing, VoxelSpacingKey};
use proptest::prelude::*;

proptest! {
    #[test]
    fn canonical_form_parses_back(milli in 1u64..10_000_000) {
        let spacing = Spacing::new(milli as f64 / 1000.0).unwrap();
        let canonical = spacing.canonical();
        prop_assert!(Spacing::is_canonical(&canonical));
        prop_assert_eq!(Spacing::parse(&canonical).unwrap(), spacing);
        prop_assert_eq!(canonical.split('.').nth(1).map(str::len), Some(3));
    }

    #[test]
    fn spellings_of_one_value_are_equal(milli in 1u64..1_000_000) {
        let value = milli as f64 / 1000.0;
        let short = format!("{}", value);
        let long = format!("{:.3}", value);
        prop_assert_eq!(Spacing::parse(&short).unwrap(), Spacing::parse(&long).unwrap());

        let from_short = VoxelSpacingKey::decode(&format!("VoxelSpacing{}", short)).unwrap();
        let from_long = VoxelSpacingKey::decode(&format!("VoxelSpacing{}", long)).unwrap();
        prop_assert_eq!(from_short, from_long);
    }

    #[test]
    fn nearby_values_share_a_key(milli in 1u64..1_000_000, jitter in -0.0004f64..0.0004) {
        let base = milli as f64 / 1000.0;
        prop_assert_eq!(Spacing::new(base).unwrap(), Spacing::new(base + jitter).unwrap());
    }

    #[test]
    fn non_positive_values_are_rejected(value in -1000.0f64..=0.0) {
        prop_assert!(Spacing::new(value).is_err());
    }
}

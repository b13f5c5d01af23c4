//! Encoding then decoding a valid key yields the same key

use copick::codec::{
    EntityKey, FeaturesKey, MeshKey, PicksKey, RunKey, SegmentationKey, Spacing, TomogramKey,
};
use proptest::prelude::*;

fn component() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9-]{0,15}"
}

fn session() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[0-9]{1,4}", component()]
}

fn spacing() -> impl Strategy<Value = Spacing> {
    (1u64..200_000).prop_map(|milli| Spacing::new(milli as f64 / 1000.0).unwrap())
}

proptest! {
    #[test]
    fn picks_keys_round_trip(object in component(), user in component(), session in session()) {
        let key = PicksKey::new(object, user, session);
        prop_assert!(key.validate().is_ok());
        prop_assert_eq!(PicksKey::decode(&key.encode()).unwrap(), Some(key));
    }

    #[test]
    fn mesh_keys_round_trip(object in component(), user in component(), session in session()) {
        let key = MeshKey::new(object, user, session);
        prop_assert_eq!(MeshKey::decode(&key.encode()).unwrap(), Some(key));
    }

    #[test]
    fn segmentation_keys_round_trip(
        spacing in spacing(),
        name in component(),
        user in component(),
        session in session(),
        multilabel in any::<bool>(),
    ) {
        prop_assume!(!name.ends_with("-multilabel"));
        let key = SegmentationKey::new(spacing, name, user, session, multilabel);
        prop_assert_eq!(SegmentationKey::decode(&key.encode()).unwrap(), Some(key));
    }

    #[test]
    fn tomogram_and_features_keys_round_trip(tomo in component(), feature in component()) {
        let tomogram = TomogramKey::new(tomo.clone());
        prop_assert_eq!(TomogramKey::decode(&tomogram.encode()).unwrap(), Some(tomogram));

        let features = FeaturesKey::new(tomo, feature);
        prop_assert_eq!(FeaturesKey::decode(&features.encode()).unwrap(), Some(features.clone()));
        // a features store is never mistaken for a tomogram
        prop_assert_eq!(TomogramKey::decode(&features.encode()).unwrap(), None);
    }

    #[test]
    fn run_names_round_trip(name in "[A-Za-z0-9][A-Za-z0-9_.-]{0,30}") {
        let key = RunKey::new(name);
        prop_assert_eq!(RunKey::decode(&key.encode()).unwrap(), Some(key));
    }

    #[test]
    fn separator_in_component_is_refused(left in component(), right in component()) {
        let user = format!("{}_{}", left, right);
        prop_assert!(PicksKey::new("ribosome", user, "0").validate().is_err());
    }

    #[test]
    fn accepted_picks_names_re_encode_exactly(name in "[a-z0-9_.-]{0,24}") {
        if let Ok(Some(key)) = PicksKey::decode(&name) {
            prop_assert_eq!(key.encode(), name);
        }
    }
}

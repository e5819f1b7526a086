//! Determinism properties of the hierarchy resolver.

use proptest::prelude::*;

use sparepart_core::hierarchy::{resolve, RawComponentRecord, RenumberTarget};
use sparepart_core::models::work_item::path_depth;

fn target() -> RenumberTarget {
    RenumberTarget {
        asset_item: "WAGX".to_string(),
        asset_serial: "OLD123".to_string(),
        new_asset_item: "NEWX".to_string(),
        new_asset_serial: "NEW123".to_string(),
    }
}

prop_compose! {
    fn arb_record()(
        depth in 1usize..5,
        segments in proptest::collection::vec(1u8..4, 4),
        item in "[A-Z]{1,4}",
        serial in "[A-Z0-9]{1,6}",
        removed in proptest::bool::weighted(0.8),
    ) -> RawComponentRecord {
        let path: Vec<String> = segments[..depth].iter().map(u8::to_string).collect();
        RawComponentRecord {
            path: path.join("-"),
            component_item: item,
            component_serial: serial,
            removal_timestamp: if removed { "20260105103000".to_string() } else { String::new() },
            ..RawComponentRecord::default()
        }
    }
}

proptest! {
    /// The same raw record set always resolves to the identical item set.
    #[test]
    fn resolution_is_deterministic(records in proptest::collection::vec(arb_record(), 0..20)) {
        let first = resolve(&records, &target());
        let second = resolve(&records, &target());
        prop_assert_eq!(first, second);
    }

    /// Never-removed records are out of scope.
    #[test]
    fn unremoved_records_are_filtered(records in proptest::collection::vec(arb_record(), 0..20)) {
        let removed = records
            .iter()
            .filter(|r| !r.removal_timestamp.is_empty())
            .count();
        let items = resolve(&records, &target());
        prop_assert_eq!(items.len(), removed);
    }

    /// Sequence numbers are a contiguous 1..=n range ordered most-nested
    /// first.
    #[test]
    fn sequence_is_contiguous_and_depth_sorted(records in proptest::collection::vec(arb_record(), 0..20)) {
        let items = resolve(&records, &target());
        for (index, item) in items.iter().enumerate() {
            prop_assert_eq!(item.sequence_number, index as i64 + 1);
        }
        for pair in items.windows(2) {
            prop_assert!(path_depth(&pair[0].hierarchy_path) >= path_depth(&pair[1].hierarchy_path));
        }
    }
}

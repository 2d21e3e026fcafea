//! Property-based tests for the push engine.
//!
//! Tests invariants using proptest:
//! - Sequence / version-counter tie on every emitted record
//! - Strict sequence monotonicity across pushes
//! - Dir-create-then-delete version round trip

mod common;

use common::*;

use bex_push::convert;
use bex_testing::data;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: every emitted record's sequence equals the value of the
    /// appended version counter, whose id is the local device projection.
    #[test]
    fn prop_emitted_record_ties_sequence_to_version(
        prior in prop::collection::vec((any::<u64>(), 1u64..1_000_000), 0..5),
        floor in 0u64..1_000_000,
    ) {
        let h = harness_with_floor(floor);
        let prev = data::prior_file_record(FOLDER, "f.txt", &prior);
        let mut observer = h.pusher.push_delete(&prev, FOLDER, "f.txt").expect("push_delete");
        prop_assert!(observer.is_completed().expect("write result"));

        let file = &observer.index_update().files[0];
        let counters = &file.version.as_ref().expect("version").counters;
        prop_assert_eq!(counters.len(), prior.len() + 1);
        for (counter, &(id, value)) in counters.iter().zip(prior.iter()) {
            prop_assert_eq!(counter.id, id);
            prop_assert_eq!(counter.value, value);
        }
        let appended = counters.last().expect("appended counter");
        prop_assert_eq!(appended.value as i64, file.sequence);
        prop_assert_eq!(appended.id, h.config.device_id.short_id());
    }

    /// Property: sequences strictly increase across sequential pushes on
    /// the same sequencer.
    #[test]
    fn prop_sequences_strictly_increase(
        count in 1usize..16,
        floor in 0u64..1000,
    ) {
        let h = harness_with_floor(floor);
        let mut last = floor as i64;
        for i in 0..count {
            let observer = h.pusher.push_dir(FOLDER, &format!("dir-{i}")).expect("push_dir");
            let sequence = observer.index_update().files[0].sequence;
            prop_assert!(sequence > last);
            last = sequence;
        }
    }

    /// Property: creating a directory and then deleting it via the
    /// returned record yields a vector of exactly two counters, both for
    /// the local device, in allocation order.
    #[test]
    fn prop_dir_then_delete_has_two_local_counters(floor in 0u64..1000) {
        let h = harness_with_floor(floor);
        let created = h.pusher.push_dir(FOLDER, "nested").expect("push_dir");
        let update = created.index_update().clone();
        let record = convert::record_from_wire(&update.folder, &update.files[0])
            .expect("announced record round-trips");

        let deleted = h.pusher.push_delete(&record, FOLDER, "nested").expect("push_delete");
        let file = &deleted.index_update().files[0];
        prop_assert!(file.deleted);
        let counters = &file.version.as_ref().expect("version").counters;
        prop_assert_eq!(counters.len(), 2);
        let local = h.config.device_id.short_id();
        prop_assert!(counters.iter().all(|c| c.id == local));
        prop_assert!(counters[1].value > counters[0].value);
    }
}

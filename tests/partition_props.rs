//! Property tests for partition bookkeeping
//!
//! Random interleavings of assign/remove must keep sizes, seating, and
//! per-student trial lists consistent.

use proptest::prelude::*;

use skilltrace::model::bkt::BktParams;
use skilltrace::model::Partition;

fn params() -> BktParams {
    BktParams {
        psi: 0.5,
        mu: 0.15,
        pi1: 0.85,
        prop0: 0.3,
    }
}

/// Give item `i` one trial per student at index `i` so merged lists are
/// disjoint and easy to predict.
fn item_trials(item: usize, num_students: usize) -> Vec<(usize, Vec<usize>)> {
    (0..num_students).map(|s| (s, vec![item])).collect()
}

proptest! {
    #[test]
    fn prop_sizes_always_sum_to_seated_items(
        moves in prop::collection::vec((0usize..8, prop::bool::ANY), 1..60)
    ) {
        let num_items = 8;
        let num_students = 3;
        let mut partition = Partition::new(num_items);

        for (item, join_first_live) in moves {
            let trials = item_trials(item, num_students);
            match partition.seat_of(item) {
                Some(handle) => {
                    partition.remove(item, handle, &trials);
                }
                None => {
                    let target = if join_first_live {
                        partition.live_handles().next()
                    } else {
                        None
                    };
                    match target {
                        Some(handle) => partition.assign(item, handle, &trials),
                        None => {
                            partition.assign_new(item, params(), &trials);
                        }
                    }
                }
            }

            // invariant: sizes sum to the number of seated items
            let seated = (0..num_items).filter(|&i| partition.seat_of(i).is_some()).count();
            let total: usize = partition.live_handles().map(|h| partition.size(h)).sum();
            prop_assert_eq!(total, seated);

            // invariant: every seated item names a live skill with params
            for i in 0..num_items {
                if let Some(handle) = partition.seat_of(i) {
                    prop_assert!(partition.record(handle).is_some());
                }
            }

            // invariant: trial lists hold exactly the seated items' trials
            for handle in partition.live_handles() {
                let members: Vec<usize> = (0..num_items)
                    .filter(|&i| partition.seat_of(i) == Some(handle))
                    .collect();
                for student in 0..num_students {
                    let mut expected: Vec<usize> = members.clone();
                    expected.sort_unstable();
                    let got = partition
                        .trials(handle)
                        .get(&student)
                        .cloned()
                        .unwrap_or_default();
                    prop_assert_eq!(got, expected.clone());
                }
            }
        }
    }

    #[test]
    fn prop_assign_then_remove_is_identity(
        first in 0usize..6,
        second in 0usize..6,
    ) {
        prop_assume!(first != second);
        let num_students = 2;
        let mut partition = Partition::new(6);

        let handle = partition.assign_new(first, params(), &item_trials(first, num_students));
        let before_size = partition.size(handle);
        let before_trials = partition.trials(handle).clone();

        partition.assign(second, handle, &item_trials(second, num_students));
        partition.remove(second, handle, &item_trials(second, num_students));

        prop_assert_eq!(partition.size(handle), before_size);
        prop_assert_eq!(partition.trials(handle).clone(), before_trials);
        prop_assert_eq!(partition.seat_of(second), None);
    }
}

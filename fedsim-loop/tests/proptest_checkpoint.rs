//! Property-based tests for checkpoint retention using proptest.

use proptest::prelude::*;

use fedsim_loop::CheckpointManager;
use std::collections::BTreeSet;
use tempfile::TempDir;

proptest! {
    // Proptest re-runs each case many times; keep the disk churn modest.
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// After any sequence of saves, at most `retention` records remain and
    /// they are exactly the most-recent-by-round-index subset.
    #[test]
    fn retention_bound_holds_for_any_save_sequence(
        rounds in prop::collection::vec(0u64..200, 1..40),
        retention in 1usize..6,
    ) {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path(), retention);

        let mut saved = BTreeSet::new();
        for &round in &rounds {
            manager.save(&round, round).unwrap();
            saved.insert(round);

            let retained = manager.rounds().unwrap();
            prop_assert!(retained.len() <= retention);

            let expected: Vec<u64> = saved
                .iter()
                .rev()
                .take(retention)
                .copied()
                .rev()
                .collect();
            prop_assert_eq!(&retained, &expected);
        }
    }

    /// `load_latest` always restores the highest retained round's state.
    #[test]
    fn load_latest_returns_highest_round(
        rounds in prop::collection::vec(0u64..200, 1..20),
    ) {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path(), 8);

        for &round in &rounds {
            manager.save(&(round * 10), round).unwrap();
        }

        let expected_round = *manager.rounds().unwrap().last().unwrap();
        let (state, round): (u64, u64) = manager.load_latest().unwrap().unwrap();
        prop_assert_eq!(round, expected_round);
        prop_assert_eq!(state, expected_round * 10);
    }
}

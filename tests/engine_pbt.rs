//! Property-based tests for the pure cores:
//! - retention stays within [0,100] and never grows with elapsed time
//! - stability strictly grows on correct answers, never drops below one day
//! - the Leitner box stays within [0,5] under any answer sequence
//! - the Bloom level stays within [1,6] under any answer sequence

use proptest::prelude::*;

use bloomclimber::engine::bloom::{self, BloomState, LevelContext};
use bloomclimber::engine::retention::{next_stability, retention};
use bloomclimber::engine::srs::{apply_answer, BoxState};

fn arb_days() -> impl Strategy<Value = f64> {
    (0u64..=36500u64).prop_map(|v| v as f64 / 10.0)
}

fn arb_stability() -> impl Strategy<Value = f64> {
    (10u64..=100_000u64).prop_map(|v| v as f64 / 10.0)
}

fn arb_bloom_level() -> impl Strategy<Value = i32> {
    1i32..=6
}

proptest! {
    #[test]
    fn retention_is_a_percentage(days in arb_days(), stability in arb_stability()) {
        let score = retention(days, stability);
        prop_assert!((0..=100).contains(&score));
    }

    #[test]
    fn retention_never_grows_with_time(
        d1 in arb_days(),
        delta in arb_days(),
        stability in arb_stability(),
    ) {
        prop_assert!(retention(d1 + delta, stability) <= retention(d1, stability));
    }

    #[test]
    fn correct_answers_always_grow_stability(
        stability in arb_stability(),
        level in arb_bloom_level(),
    ) {
        prop_assert!(next_stability(stability, level, true) > stability);
    }

    #[test]
    fn wrong_answers_never_grow_stability_and_respect_the_floor(
        stability in arb_stability(),
        level in arb_bloom_level(),
    ) {
        let next = next_stability(stability, level, false);
        prop_assert!(next <= stability);
        prop_assert!(next >= 1.0);
    }

    #[test]
    fn the_box_stays_within_bounds(answers in proptest::collection::vec(any::<bool>(), 0..60)) {
        let mut state = BoxState { box_level: 0, consecutive_correct: 0 };
        for was_correct in answers {
            let t = apply_answer(state, was_correct);
            prop_assert!((0..=5).contains(&t.box_level));
            prop_assert!(t.consecutive_correct >= 0);
            prop_assert_eq!(t.mastered, t.consecutive_correct >= 3);
            if !was_correct {
                prop_assert_eq!(t.box_level, 1);
            }
            state = BoxState {
                box_level: t.box_level,
                consecutive_correct: t.consecutive_correct,
            };
        }
    }

    #[test]
    fn the_bloom_level_stays_within_bounds(
        answers in proptest::collection::vec(
            (any::<bool>(), 0u8..=10, any::<bool>()),
            0..80,
        ),
    ) {
        let mut state = BloomState::default();
        for (was_correct, coverage_tenths, next_level_available) in answers {
            let ctx = LevelContext {
                coverage: f64::from(coverage_tenths) / 10.0,
                next_level_available,
            };
            let (next, _) = bloom::apply_answer(state, was_correct, ctx);
            prop_assert!((1..=6).contains(&next.current_level));
            prop_assert!(next.unlocked_level >= state.unlocked_level);
            prop_assert!(next.unlocked_level >= next.current_level);
            state = next;
        }
    }
}

//! Bloom-level climber: per learner and topic, which cognitive tier (1-6) is
//! being served, promoted by coverage or a long streak and demoted after
//! repeated misses. The transition itself is pure; the engine feeds it the
//! coverage and next-tier availability it cannot compute locally.

use serde::{Deserialize, Serialize};

pub const MIN_LEVEL: i32 = 1;
pub const MAX_LEVEL: i32 = 6;

/// Promotion fires at 80% mastered coverage of the current tier, or at a
/// 20-long streak. The two gates are deliberately incommensurable (one is a
/// fraction of content, one an absolute count); this mirrors the behavior
/// the platform shipped with.
pub const COVERAGE_GATE: f64 = 0.8;
pub const STREAK_GATE: i32 = 20;
const DEMOTION_THRESHOLD: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressEvent {
    LevelUnlocked,
    Promotion,
    StreakExtended,
    Demotion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomState {
    pub current_level: i32,
    pub unlocked_level: i32,
    pub streak: i32,
    pub level_correct_count: i32,
    pub consecutive_wrong: i32,
}

impl Default for BloomState {
    fn default() -> Self {
        Self {
            current_level: MIN_LEVEL,
            unlocked_level: MIN_LEVEL,
            streak: 0,
            level_correct_count: 0,
            consecutive_wrong: 0,
        }
    }
}

/// Promotion inputs measured against the topic subtree.
#[derive(Debug, Clone, Copy)]
pub struct LevelContext {
    pub coverage: f64,
    pub next_level_available: bool,
}

pub fn coverage(mastered_in_level: i64, total_in_level: i64) -> f64 {
    if total_in_level <= 0 {
        return 0.0;
    }
    mastered_in_level as f64 / total_in_level as f64
}

/// UI progress-bar fraction toward the streak gate.
pub fn streak_progress(level_correct_count: i32) -> f64 {
    (f64::from(level_correct_count.max(0)) / f64::from(STREAK_GATE)).min(1.0)
}

pub fn apply_answer(
    state: BloomState,
    was_correct: bool,
    ctx: LevelContext,
) -> (BloomState, Option<ProgressEvent>) {
    let mut next = state;

    if was_correct {
        next.streak += 1;
        next.level_correct_count += 1;
        next.consecutive_wrong = 0;

        let gate_met = ctx.coverage >= COVERAGE_GATE || next.streak >= STREAK_GATE;
        if gate_met && next.current_level < MAX_LEVEL && ctx.next_level_available {
            let event = if next.current_level >= next.unlocked_level {
                next.unlocked_level = next.current_level + 1;
                ProgressEvent::LevelUnlocked
            } else {
                ProgressEvent::Promotion
            };
            next.current_level += 1;
            next.streak = 0;
            next.level_correct_count = 0;
            return (next, Some(event));
        }

        if next.streak > 1 {
            return (next, Some(ProgressEvent::StreakExtended));
        }
        return (next, None);
    }

    next.streak = 0;
    next.consecutive_wrong += 1;

    if next.consecutive_wrong >= DEMOTION_THRESHOLD && next.current_level > MIN_LEVEL {
        next.current_level -= 1;
        next.consecutive_wrong = 0;
        next.level_correct_count = 0;
        return (next, Some(ProgressEvent::Demotion));
    }

    (next, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available() -> LevelContext {
        LevelContext { coverage: 0.0, next_level_available: true }
    }

    #[test]
    fn twentieth_straight_correct_unlocks_the_next_level() {
        let state = BloomState { streak: 19, level_correct_count: 19, ..Default::default() };
        let (next, event) = apply_answer(state, true, available());
        assert_eq!(next.current_level, 2);
        assert_eq!(next.unlocked_level, 2);
        assert_eq!(next.streak, 0);
        assert_eq!(next.level_correct_count, 0);
        assert_eq!(event, Some(ProgressEvent::LevelUnlocked));
    }

    #[test]
    fn coverage_gate_promotes_without_a_long_streak() {
        let state = BloomState { streak: 2, level_correct_count: 2, ..Default::default() };
        let ctx = LevelContext { coverage: 0.85, next_level_available: true };
        let (next, event) = apply_answer(state, true, ctx);
        assert_eq!(next.current_level, 2);
        assert_eq!(event, Some(ProgressEvent::LevelUnlocked));
    }

    #[test]
    fn revisiting_an_already_unlocked_level_is_an_ordinary_promotion() {
        let state = BloomState {
            current_level: 2,
            unlocked_level: 4,
            streak: 19,
            level_correct_count: 19,
            ..Default::default()
        };
        let (next, event) = apply_answer(state, true, available());
        assert_eq!(next.current_level, 3);
        assert_eq!(next.unlocked_level, 4);
        assert_eq!(event, Some(ProgressEvent::Promotion));
    }

    #[test]
    fn no_promotion_into_an_empty_tier() {
        let state = BloomState { streak: 25, level_correct_count: 25, ..Default::default() };
        let ctx = LevelContext { coverage: 1.0, next_level_available: false };
        let (next, event) = apply_answer(state, true, ctx);
        assert_eq!(next.current_level, 1);
        assert_eq!(event, Some(ProgressEvent::StreakExtended));
    }

    #[test]
    fn level_never_exceeds_six() {
        let state = BloomState {
            current_level: 6,
            unlocked_level: 6,
            streak: 30,
            level_correct_count: 30,
            ..Default::default()
        };
        let (next, _) = apply_answer(state, true, available());
        assert_eq!(next.current_level, 6);
    }

    #[test]
    fn short_streaks_just_extend() {
        let state = BloomState { streak: 1, level_correct_count: 1, ..Default::default() };
        let (next, event) = apply_answer(state, true, available());
        assert_eq!(next.streak, 2);
        assert_eq!(event, Some(ProgressEvent::StreakExtended));

        let (_, first) = apply_answer(BloomState::default(), true, available());
        assert_eq!(first, None);
    }

    #[test]
    fn third_wrong_in_a_row_demotes() {
        let state = BloomState {
            current_level: 3,
            unlocked_level: 3,
            consecutive_wrong: 2,
            level_correct_count: 7,
            ..Default::default()
        };
        let (next, event) = apply_answer(state, false, available());
        assert_eq!(next.current_level, 2);
        assert_eq!(next.consecutive_wrong, 0);
        assert_eq!(next.level_correct_count, 0);
        assert_eq!(event, Some(ProgressEvent::Demotion));
    }

    #[test]
    fn level_never_drops_below_one() {
        let mut state = BloomState { consecutive_wrong: 2, ..Default::default() };
        for _ in 0..10 {
            let (next, event) = apply_answer(state, false, available());
            assert_eq!(next.current_level, 1);
            assert_eq!(event, None);
            state = next;
        }
    }

    #[test]
    fn wrong_answer_resets_the_streak_but_keeps_level_count() {
        let state = BloomState { streak: 5, level_correct_count: 5, ..Default::default() };
        let (next, event) = apply_answer(state, false, available());
        assert_eq!(next.streak, 0);
        assert_eq!(next.level_correct_count, 5);
        assert_eq!(next.consecutive_wrong, 1);
        assert_eq!(event, None);
    }

    #[test]
    fn empty_tier_counts_as_zero_coverage() {
        assert_eq!(coverage(0, 0), 0.0);
        assert_eq!(coverage(5, 0), 0.0);
        assert!((coverage(4, 5) - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn streak_progress_saturates_at_one() {
        assert_eq!(streak_progress(0), 0.0);
        assert!((streak_progress(10) - 0.5).abs() < f64::EPSILON);
        assert_eq!(streak_progress(20), 1.0);
        assert_eq!(streak_progress(50), 1.0);
    }
}

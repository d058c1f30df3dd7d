//! Leitner-box review scheduling per learner and question. The transition is
//! pure; `record_review` persists it and runs on the SRS worker, never on the
//! answer-response path.

use chrono::{DateTime, Duration, Utc};

use crate::progress::{ProgressStore, QuestionProgress};

pub const MAX_BOX: i32 = 5;
pub const MASTERY_STREAK: i32 = 3;

/// Re-show buffer after a miss: the question comes back within the same
/// study session instead of tomorrow.
const WRONG_ANSWER_BUFFER_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxState {
    pub box_level: i32,
    pub consecutive_correct: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxTransition {
    pub box_level: i32,
    pub consecutive_correct: i32,
    pub mastered: bool,
    pub review_delay: Duration,
}

/// Box-to-interval table. Box 0 is "new, show immediately" and is never the
/// result of a transition.
fn box_interval(box_level: i32) -> Duration {
    match box_level {
        1 => Duration::days(1),
        2 => Duration::days(3),
        3 => Duration::days(7),
        4 => Duration::days(14),
        _ => Duration::days(30),
    }
}

pub fn apply_answer(state: BoxState, was_correct: bool) -> BoxTransition {
    let (box_level, consecutive_correct) = if was_correct {
        ((state.box_level + 1).min(MAX_BOX), state.consecutive_correct + 1)
    } else {
        // Demote to the shortest non-zero interval, not all the way to new.
        (1, 0)
    };

    let review_delay = if was_correct {
        box_interval(box_level)
    } else {
        Duration::minutes(WRONG_ANSWER_BUFFER_MINUTES)
    };

    BoxTransition {
        box_level,
        consecutive_correct,
        mastered: consecutive_correct >= MASTERY_STREAK,
        review_delay,
    }
}

/// Loads (or default-initializes) the learner/question row, applies one
/// answer and persists the new box, streak, mastery flag and due time.
pub async fn record_review(
    store: &ProgressStore,
    learner_id: i64,
    question_id: i64,
    was_correct: bool,
    now: DateTime<Utc>,
) -> Result<QuestionProgress, sqlx::Error> {
    let mut progress = store
        .get_question_progress(learner_id, question_id)
        .await?
        .unwrap_or_else(|| QuestionProgress::new(learner_id, question_id));

    let was_mastered = progress.mastered;

    let transition = apply_answer(
        BoxState {
            box_level: progress.box_level,
            consecutive_correct: progress.consecutive_correct,
        },
        was_correct,
    );

    progress.box_level = transition.box_level;
    progress.consecutive_correct = transition.consecutive_correct;
    progress.mastered = transition.mastered;
    progress.next_review_at = Some((now + transition.review_delay).timestamp_millis());
    progress.last_answered_at = Some(now.timestamp_millis());

    store.upsert_question_progress(&progress, now.timestamp_millis()).await?;

    if progress.mastered && !was_mastered {
        tracing::info!(learner_id, question_id, "question mastered");
    }
    tracing::debug!(
        learner_id,
        question_id,
        box_level = progress.box_level,
        correct = was_correct,
        streak = progress.consecutive_correct,
        "review recorded"
    );

    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(box_level: i32, consecutive_correct: i32) -> BoxState {
        BoxState { box_level, consecutive_correct }
    }

    #[test]
    fn correct_answer_moves_up_one_box() {
        let t = apply_answer(state(0, 0), true);
        assert_eq!(t.box_level, 1);
        assert_eq!(t.consecutive_correct, 1);
        assert!(!t.mastered);
        assert_eq!(t.review_delay, Duration::days(1));
    }

    #[test]
    fn box_caps_at_five() {
        let t = apply_answer(state(5, 7), true);
        assert_eq!(t.box_level, 5);
        assert_eq!(t.review_delay, Duration::days(30));
    }

    #[test]
    fn wrong_answer_resets_to_box_one_with_short_buffer() {
        for prior in 0..=5 {
            let t = apply_answer(state(prior, 2), false);
            assert_eq!(t.box_level, 1);
            assert_eq!(t.consecutive_correct, 0);
            assert!(!t.mastered);
            assert_eq!(t.review_delay, Duration::minutes(5));
        }
    }

    #[test]
    fn third_consecutive_correct_masters_the_question() {
        // Box 4, two in a row: one more correct answer lands in box 5,
        // mastered, due in 30 days.
        let t = apply_answer(state(4, 2), true);
        assert_eq!(t.box_level, 5);
        assert_eq!(t.consecutive_correct, 3);
        assert!(t.mastered);
        assert_eq!(t.review_delay, Duration::days(30));
    }

    #[test]
    fn interval_table_matches_boxes() {
        let expected = [(1, 1), (2, 3), (3, 7), (4, 14), (5, 30)];
        for (box_level, days) in expected {
            let t = apply_answer(state(box_level - 1, 0), true);
            assert_eq!(t.box_level, box_level);
            assert_eq!(t.review_delay, Duration::days(days));
        }
    }
}

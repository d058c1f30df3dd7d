//! Topic mastery percentage: mastered questions count fully, questions with
//! some correct streak count half, so breadth of attempted content moves the
//! bar before everything is fully mastered.

const LEARNING_WEIGHT: f64 = 0.5;

pub fn weighted_mastery(mastered_count: i64, learning_count: i64, total_questions: i64) -> i64 {
    let total = total_questions.max(1) as f64;
    let points = mastered_count as f64 + learning_count as f64 * LEARNING_WEIGHT;
    ((points / total) * 100.0).round().min(100.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_progress_scores_zero() {
        assert_eq!(weighted_mastery(0, 0, 10), 0);
    }

    #[test]
    fn mastered_counts_full_learning_counts_half() {
        assert_eq!(weighted_mastery(3, 2, 10), 40);
        assert_eq!(weighted_mastery(0, 4, 10), 20);
    }

    #[test]
    fn fully_mastered_topic_is_one_hundred() {
        assert_eq!(weighted_mastery(10, 0, 10), 100);
    }

    #[test]
    fn score_is_capped_at_one_hundred() {
        // More progress rows than live questions can happen after content is
        // deactivated; the score still caps.
        assert_eq!(weighted_mastery(12, 4, 10), 100);
    }

    #[test]
    fn zero_question_topics_do_not_divide_by_zero() {
        assert_eq!(weighted_mastery(0, 0, 0), 0);
        assert_eq!(weighted_mastery(2, 0, 0), 100);
    }

    #[test]
    fn rounds_to_nearest_percent() {
        assert_eq!(weighted_mastery(1, 0, 3), 33);
        assert_eq!(weighted_mastery(2, 0, 3), 67);
    }
}

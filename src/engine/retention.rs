//! Forgetting-curve model: exponential decay calibrated so that one
//! stability-interval of elapsed time leaves 90% retention.

const MASTERY_WEIGHT: f64 = 0.7;
const RETENTION_WEIGHT: f64 = 0.3;
const STABILITY_FLOOR: f64 = 1.0;
pub const DEFAULT_STABILITY: f64 = 1.0;

/// Estimated recall (0-100) after `days_elapsed` days. A non-positive
/// stability is invalid input and reads as fully forgotten.
pub fn retention(days_elapsed: f64, stability: f64) -> i64 {
    if stability <= 0.0 {
        return 0;
    }
    let score = 100.0 * 0.9_f64.powf(days_elapsed.max(0.0) / stability);
    score.clamp(0.0, 100.0).round() as i64
}

/// Stability update after one answer. Correct answers multiply stability, and
/// harder questions multiply it more; wrong answers halve it but never push
/// it under one day.
pub fn next_stability(current_stability: f64, bloom_level: i32, was_correct: bool) -> f64 {
    let current = if current_stability > 0.0 {
        current_stability
    } else {
        DEFAULT_STABILITY
    };

    let updated = if was_correct {
        current * (2.0 + 0.1 * f64::from(bloom_level))
    } else {
        (current * 0.5).max(STABILITY_FLOOR)
    };

    (updated * 100.0).round() / 100.0
}

/// Exam-readiness blend: mastery carries 70%, retention 30%.
pub fn readiness(mastery: i64, retention: i64) -> i64 {
    (mastery as f64 * MASTERY_WEIGHT + retention as f64 * RETENTION_WEIGHT).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_material_is_fully_retained() {
        assert_eq!(retention(0.0, 1.0), 100);
        assert_eq!(retention(0.0, 365.0), 100);
    }

    #[test]
    fn one_stability_interval_leaves_ninety_percent() {
        assert_eq!(retention(10.0, 10.0), 90);
        assert_eq!(retention(3.0, 3.0), 90);
    }

    #[test]
    fn invalid_stability_reads_as_forgotten() {
        assert_eq!(retention(5.0, 0.0), 0);
        assert_eq!(retention(5.0, -2.0), 0);
    }

    #[test]
    fn retention_decays_with_time() {
        let scores: Vec<i64> = [0.0, 5.0, 20.0, 90.0]
            .iter()
            .map(|d| retention(*d, 10.0))
            .collect();
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn correct_answers_grow_stability_by_bloom_level() {
        assert_eq!(next_stability(1.0, 1, true), 2.1);
        assert_eq!(next_stability(1.0, 6, true), 2.6);
        assert_eq!(next_stability(4.0, 3, true), 9.2);
    }

    #[test]
    fn wrong_answers_halve_stability_with_a_floor() {
        assert_eq!(next_stability(10.0, 4, false), 5.0);
        assert_eq!(next_stability(1.5, 2, false), 1.0);
        assert_eq!(next_stability(1.0, 1, false), 1.0);
    }

    #[test]
    fn zero_stability_input_restarts_from_default() {
        assert_eq!(next_stability(0.0, 2, true), 2.2);
    }

    #[test]
    fn readiness_blends_mastery_and_retention() {
        assert_eq!(readiness(100, 100), 100);
        assert_eq!(readiness(0, 0), 0);
        assert_eq!(readiness(80, 50), 71);
        assert_eq!(readiness(50, 100), 65);
    }
}

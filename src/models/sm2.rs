//! SM-2 (SuperMemo 2) spaced repetition algorithm implementation.
//!
//! The SM-2 algorithm calculates review intervals based on recall quality:
//! - Each kanji has an ease factor (EF) that adjusts based on performance
//! - Quality grades 0-2: Reset repetitions, review again tomorrow
//! - Quality grades 3-5: Increase interval progressively (1 day → 6 days → EF multiplier)
//! - EF is adjusted after every review, failed ones included, and never drops below 1.3
//!
//! Intervals past the second repetition are `interval * EF` with the EF the
//! kanji had *before* this review, rounded half away from zero.

use super::{MasteryState, Quality};

/// Ease factor floor.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor of a kanji that has never been reviewed.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Interval after the first passing review, and after any failed review.
pub const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval after the second consecutive passing review.
pub const SECOND_INTERVAL_DAYS: u32 = 6;

/// Computes the state that follows `prior` after a review graded `quality`.
pub fn grade_review(prior: &MasteryState, quality: Quality) -> MasteryState {
    let (interval_days, repetitions) = if quality.is_passing() {
        let interval = match prior.repetitions {
            0 => FIRST_INTERVAL_DAYS,
            1 => SECOND_INTERVAL_DAYS,
            _ => scaled_interval(prior.interval_days, prior.ease_factor),
        };
        (interval, prior.repetitions.saturating_add(1))
    } else {
        (FIRST_INTERVAL_DAYS, 0)
    };

    MasteryState {
        repetitions,
        ease_factor: next_ease_factor(prior.ease_factor, quality),
        interval_days,
    }
}

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3.
pub fn next_ease_factor(ease_factor: f64, quality: Quality) -> f64 {
    let miss = 5.0 - f64::from(quality.value());
    let updated = ease_factor + (0.1 - miss * (0.08 + miss * 0.02));

    if updated < MIN_EASE_FACTOR {
        tracing::trace!(
            ease_factor,
            quality = quality.value(),
            updated,
            "ease factor clamped to floor"
        );
        MIN_EASE_FACTOR
    } else {
        updated
    }
}

/// `round(interval * ease)` with half-away-from-zero rounding.
///
/// Never returns less than one day; saturates at `u32::MAX`.
fn scaled_interval(interval_days: u32, ease_factor: f64) -> u32 {
    let scaled = (f64::from(interval_days) * ease_factor).round();
    // float-to-int `as` saturates
    (scaled as u32).max(FIRST_INTERVAL_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state(repetitions: u32, ease_factor: f64, interval_days: u32) -> MasteryState {
        MasteryState {
            repetitions,
            ease_factor,
            interval_days,
        }
    }

    fn q(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_first_review_perfect() {
        let next = grade_review(&MasteryState::default(), q(5));
        assert_eq!(next.repetitions, 1);
        assert_eq!(next.interval_days, 1);
        assert_close(next.ease_factor, 2.6);
    }

    #[test]
    fn test_second_review_perfect() {
        let next = grade_review(&state(1, 2.6, 1), q(5));
        assert_eq!(next.repetitions, 2);
        assert_eq!(next.interval_days, 6);
        assert_close(next.ease_factor, 2.7);
    }

    #[test]
    fn test_third_review_uses_prior_ease() {
        // 6 * 2.5 = 15, not 6 * 2.5-after-update
        let next = grade_review(&state(2, 2.5, 6), q(3));
        assert_eq!(next.interval_days, 15);
        assert_eq!(next.repetitions, 3);
        assert_close(next.ease_factor, 2.36);
    }

    #[test]
    fn test_failed_review_resets() {
        let next = grade_review(&state(4, 2.0, 20), q(1));
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.interval_days, 1);
        // 2.0 + (0.1 - 4 * 0.16)
        assert_close(next.ease_factor, 1.46);
        assert!(next.ease_factor < 2.0);
    }

    #[test]
    fn test_failure_uses_pre_failure_ease() {
        let next = grade_review(&state(3, 2.8, 40), q(2));
        // 2.8 + (0.1 - 3 * 0.14) = 2.48
        assert_close(next.ease_factor, 2.48);
    }

    #[test]
    fn test_ef_floor_holds() {
        let next = grade_review(&state(5, 1.3, 30), q(0));
        assert_eq!(next.ease_factor, 1.3);
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.interval_days, 1);
    }

    #[test]
    fn test_repeated_blackouts_stay_on_floor() {
        let mut current = state(5, 2.5, 10);
        for _ in 0..20 {
            current = grade_review(&current, Quality::BLACKOUT);
            assert!(current.ease_factor >= MIN_EASE_FACTOR);
        }
        assert_eq!(current.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(grade_review(&state(2, 2.5, 1), q(4)).interval_days, 3);
        assert_eq!(grade_review(&state(2, 2.5, 5), q(4)).interval_days, 13);
        assert_eq!(grade_review(&state(2, 2.5, 3), q(4)).interval_days, 8);
    }

    #[test]
    fn test_grade_four_keeps_ease() {
        let next = grade_review(&MasteryState::default(), q(4));
        assert_close(next.ease_factor, 2.5);
    }

    #[test]
    fn test_interval_grows_exponentially() {
        let mut current = MasteryState::default();
        let mut intervals = Vec::new();
        for _ in 0..5 {
            current = grade_review(&current, q(4));
            intervals.push(current.interval_days);
        }
        assert_eq!(intervals, vec![1, 6, 15, 38, 95]);
    }

    #[test]
    fn test_huge_interval_saturates() {
        let next = grade_review(&state(9, 2.5, u32::MAX), q(5));
        assert_eq!(next.interval_days, u32::MAX);
    }

    fn any_state() -> impl Strategy<Value = MasteryState> {
        (0u32..50, 1.3f64..4.0, 0u32..5000).prop_map(|(r, e, i)| MasteryState {
            repetitions: r,
            ease_factor: e,
            interval_days: if r >= 1 { i.max(1) } else { i },
        })
    }

    fn any_quality() -> impl Strategy<Value = Quality> {
        (0u8..=5).prop_map(|v| Quality::new(v).unwrap())
    }

    proptest! {
        #[test]
        fn prop_ease_never_below_floor(prior in any_state(), quality in any_quality()) {
            prop_assert!(grade_review(&prior, quality).ease_factor >= MIN_EASE_FACTOR);
        }

        #[test]
        fn prop_failure_resets(prior in any_state(), value in 0u8..3) {
            let next = grade_review(&prior, Quality::new(value).unwrap());
            prop_assert_eq!(next.repetitions, 0);
            prop_assert_eq!(next.interval_days, 1);
        }

        #[test]
        fn prop_pass_schedule(prior in any_state(), value in 3u8..=5) {
            let next = grade_review(&prior, Quality::new(value).unwrap());
            prop_assert_eq!(next.repetitions, prior.repetitions + 1);
            let expected = match prior.repetitions {
                0 => 1,
                1 => 6,
                _ => (f64::from(prior.interval_days) * prior.ease_factor).round() as u32,
            };
            prop_assert_eq!(next.interval_days, expected);
            prop_assert!(next.interval_days >= 1);
        }

        #[test]
        fn prop_deterministic(prior in any_state(), quality in any_quality()) {
            prop_assert_eq!(grade_review(&prior, quality), grade_review(&prior, quality));
        }

        #[test]
        fn prop_ease_monotonic_in_quality(prior in any_state()) {
            let eases: Vec<f64> = Quality::all().map(|q| grade_review(&prior, q).ease_factor).collect();
            for pair in eases.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
        }
    }
}

//! Per-learner mastery of a single kanji.

use super::sm2::{DEFAULT_EASE_FACTOR, grade_review};
use super::Quality;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The part of a mastery record the SM-2 formula reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MasteryState {
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval_days: u32,
}

impl Default for MasteryState {
    /// State of a kanji the learner has never reviewed.
    fn default() -> Self {
        Self {
            repetitions: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 0,
        }
    }
}

/// Scheduling state plus bookkeeping for one (learner, kanji) pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MasteryRecord {
    pub learner_id: String,
    pub kanji_id: i64,
    pub state: MasteryState,
    pub next_review_date: DateTime<Utc>,
    pub last_review_date: Option<DateTime<Utc>>,
    pub total_reviews: u32,
    pub correct_reviews: u32,
}

impl MasteryRecord {
    /// Applies a review to `prior`, or to the default state when the learner
    /// has no record for this kanji yet.
    pub fn after_review(
        prior: Option<&MasteryRecord>,
        learner_id: &str,
        kanji_id: i64,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> MasteryRecord {
        let (prior_state, total, correct) = prior
            .map(|r| (r.state, r.total_reviews, r.correct_reviews))
            .unwrap_or_default();

        let state = grade_review(&prior_state, quality);

        MasteryRecord {
            learner_id: learner_id.to_string(),
            kanji_id,
            state,
            next_review_date: next_review_date(reviewed_at, state.interval_days),
            last_review_date: Some(reviewed_at),
            total_reviews: total.saturating_add(1),
            correct_reviews: if quality.is_passing() {
                correct.saturating_add(1)
            } else {
                correct
            },
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }

    /// Share of passing reviews, `None` before the first review.
    pub fn accuracy(&self) -> Option<f64> {
        (self.total_reviews > 0)
            .then(|| f64::from(self.correct_reviews) / f64::from(self.total_reviews))
    }
}

/// `reviewed_at + interval_days`, saturating at the largest representable instant.
pub fn next_review_date(reviewed_at: DateTime<Utc>, interval_days: u32) -> DateTime<Utc> {
    reviewed_at
        .checked_add_signed(Duration::days(i64::from(interval_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

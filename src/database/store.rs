//! Progress store abstraction.
//!
//! One mastery record per (learner, kanji). Implementations must serialize
//! [`ProgressStore::record_review`] per key so concurrent reviews of the same
//! kanji by the same learner never lose an update.

use crate::error::StoreError;
use crate::models::{MasteryRecord, Quality};
use chrono::{DateTime, Utc};

pub trait ProgressStore: Send + Sync {
    /// Current record, `None` if the learner never reviewed this kanji.
    fn fetch(&self, learner_id: &str, kanji_id: i64) -> Result<Option<MasteryRecord>, StoreError>;

    /// Inserts or replaces the record for `(record.learner_id, record.kanji_id)`.
    fn save(&self, record: &MasteryRecord) -> Result<(), StoreError>;

    /// Grades a review against the stored record and persists the result as
    /// one atomic step.
    fn record_review(
        &self,
        learner_id: &str,
        kanji_id: i64,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> Result<MasteryRecord, StoreError>;
}

//! Due-item selection.
//!
//! A kanji is due when the learner has no record for it yet or its next
//! review date has passed. [`SessionPlan`] decides how many new and due
//! kanji go into one session.

use super::MasteryRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub fn is_due(record: Option<&MasteryRecord>, now: DateTime<Utc>) -> bool {
    record.is_none_or(|r| r.is_due(now))
}

/// Limits for composing one study session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPlan {
    /// Never-reviewed kanji admitted per session
    pub max_new: usize,
    /// Due reviews admitted per session
    pub max_reviews: usize,
}

impl Default for SessionPlan {
    fn default() -> Self {
        Self {
            max_new: 20,
            max_reviews: 100,
        }
    }
}

impl SessionPlan {
    /// Picks the items to study at `now` from a deck listed in deck order.
    ///
    /// Due reviews come first, most overdue first, then new kanji in deck
    /// order. Items reviewed but not yet due are left out.
    pub fn select<T>(
        &self,
        items: Vec<(T, Option<MasteryRecord>)>,
        now: DateTime<Utc>,
    ) -> Vec<(T, Option<MasteryRecord>)> {
        let mut reviews = Vec::new();
        let mut fresh = Vec::new();

        for (item, record) in items {
            match record {
                None => fresh.push((item, None)),
                Some(r) if r.is_due(now) => reviews.push((item, Some(r))),
                Some(_) => {}
            }
        }

        // stable: ties keep deck order
        reviews.sort_by_key(|(_, r)| r.as_ref().map(|r| r.next_review_date));
        reviews.truncate(self.max_reviews);
        fresh.truncate(self.max_new);

        reviews.extend(fresh);
        reviews
    }
}

//! In-memory progress store, used by tests and short-lived sessions.

use super::store::ProgressStore;
use crate::error::StoreError;
use crate::models::{MasteryRecord, Quality};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

type Key = (String, i64);

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<Key, MasteryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Key, MasteryRecord>>, StoreError> {
        self.records.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ProgressStore for MemoryStore {
    fn fetch(&self, learner_id: &str, kanji_id: i64) -> Result<Option<MasteryRecord>, StoreError> {
        Ok(self
            .lock()?
            .get(&(learner_id.to_string(), kanji_id))
            .cloned())
    }

    fn save(&self, record: &MasteryRecord) -> Result<(), StoreError> {
        self.lock()?.insert(
            (record.learner_id.clone(), record.kanji_id),
            record.clone(),
        );
        Ok(())
    }

    fn record_review(
        &self,
        learner_id: &str,
        kanji_id: i64,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> Result<MasteryRecord, StoreError> {
        let mut records = self.lock()?;
        let key = (learner_id.to_string(), kanji_id);
        let updated =
            MasteryRecord::after_review(records.get(&key), learner_id, kanji_id, quality, reviewed_at);
        records.insert(key, updated.clone());
        Ok(updated)
    }
}

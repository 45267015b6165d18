//! Study session management for spaced repetition practice.
//! Drives kanji through the SM-2 scheduler in rounds and keeps session statistics.

use super::rewards::xp_for_answer;
use super::{Kanji, MasteryRecord, Quality, SessionPlan};
use crate::database::ProgressStore;
use crate::error::SessionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// A kanji queued in a session together with the learner's latest record.
#[derive(Clone, Debug)]
pub struct SessionCard {
    pub kanji_id: i64,
    pub kanji: Kanji,
    pub record: Option<MasteryRecord>,
    /// Passed in the current round
    pub passed: bool,
}

impl SessionCard {
    pub fn new(kanji_id: i64, kanji: Kanji, record: Option<MasteryRecord>) -> Self {
        Self {
            kanji_id,
            kanji,
            record,
            passed: false,
        }
    }
}

/// Builds the session queue from a deck's kanji and the learner's records,
/// keeping only what `plan` admits at `now`.
pub fn due_cards(
    progress: Vec<(i64, Kanji, Option<MasteryRecord>)>,
    plan: &SessionPlan,
    now: DateTime<Utc>,
) -> Vec<SessionCard> {
    let items: Vec<_> = progress
        .into_iter()
        .map(|(id, kanji, record)| ((id, kanji), record))
        .collect();
    plan.select(items, now)
        .into_iter()
        .map(|((id, kanji), record)| SessionCard::new(id, kanji, record))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Show failed kanji again in a new round until they pass
    pub retry_failed: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { retry_failed: true }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Distinct kanji graded at least once
    pub cards_studied: u32,
    /// Every grade given, retries included
    pub reviews: u32,
    pub correct_answers: u32,
    pub xp_earned: u32,
    pub rounds: u32,
}

impl SessionStats {
    /// Percentage of passing grades, rounded
    pub fn accuracy_percent(&self) -> u32 {
        if self.reviews == 0 {
            return 0;
        }
        (f64::from(self.correct_answers) * 100.0 / f64::from(self.reviews)).round() as u32
    }
}

/// Result of grading one card.
#[derive(Clone, Debug, PartialEq)]
pub struct ReviewOutcome {
    pub kanji_id: i64,
    pub quality: Quality,
    pub record: MasteryRecord,
    pub xp: u32,
}

/// Manages a study session with multiple review rounds.
/// Kanji that aren't passed (grade < 3) are repeated in subsequent rounds.
pub struct StudySession {
    pub learner_id: String,
    pub deck_name: String,
    pub xp_multiplier: f64,
    cards: Vec<SessionCard>,
    current_round: Vec<usize>,
    current_index: usize,
    round_number: u32,
    options: SessionOptions,
    store: Arc<dyn ProgressStore>,
    studied: HashSet<i64>,
    stats: SessionStats,
}

impl StudySession {
    pub fn new(
        learner_id: impl Into<String>,
        deck_name: impl Into<String>,
        xp_multiplier: f64,
        cards: Vec<SessionCard>,
        store: Arc<dyn ProgressStore>,
        options: SessionOptions,
    ) -> Self {
        let current_round: Vec<usize> = (0..cards.len()).collect();
        let round_number = u32::from(!cards.is_empty());

        Self {
            learner_id: learner_id.into(),
            deck_name: deck_name.into(),
            xp_multiplier,
            cards,
            current_round,
            current_index: 0,
            round_number,
            options,
            store,
            studied: HashSet::new(),
            stats: SessionStats {
                rounds: round_number,
                ..SessionStats::default()
            },
        }
    }

    pub fn current_card(&self) -> Option<&SessionCard> {
        if self.is_completed() {
            return None;
        }
        self.current_round
            .get(self.current_index)
            .and_then(|&idx| self.cards.get(idx))
    }

    /// Grades the current card, persists the new mastery record and moves on.
    pub fn grade_current_card(
        &mut self,
        quality: Quality,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome, SessionError> {
        let idx = match self.current_round.get(self.current_index) {
            Some(&idx) if !self.is_completed() => idx,
            _ => return Err(SessionError::Completed),
        };
        let card = &mut self.cards[idx];

        let record = self
            .store
            .record_review(&self.learner_id, card.kanji_id, quality, now)?;
        let xp = xp_for_answer(quality, self.xp_multiplier);

        card.passed = quality.is_passing();
        card.record = Some(record.clone());

        self.stats.reviews += 1;
        self.stats.xp_earned += xp;
        if card.passed {
            self.stats.correct_answers += 1;
        }
        if self.studied.insert(card.kanji_id) {
            self.stats.cards_studied += 1;
        }

        tracing::debug!(
            learner = %self.learner_id,
            kanji = %card.kanji.character,
            quality = quality.value(),
            interval_days = record.state.interval_days,
            "card graded"
        );

        let outcome = ReviewOutcome {
            kanji_id: card.kanji_id,
            quality,
            record,
            xp,
        };
        self.next_card();
        Ok(outcome)
    }

    fn next_card(&mut self) {
        if self.current_index + 1 < self.current_round.len() {
            self.current_index += 1;
        } else {
            self.start_next_round();
        }
    }

    /// Starts a new round with the kanji that failed in this one.
    /// If none failed, or retries are off, the session is complete.
    fn start_next_round(&mut self) {
        let failed: Vec<usize> = self
            .current_round
            .iter()
            .copied()
            .filter(|&idx| !self.cards[idx].passed)
            .collect();

        if failed.is_empty() || !self.options.retry_failed {
            self.current_index = self.current_round.len();
            tracing::info!(
                learner = %self.learner_id,
                deck = %self.deck_name,
                reviews = self.stats.reviews,
                correct = self.stats.correct_answers,
                xp = self.stats.xp_earned,
                "study session completed"
            );
            return;
        }

        self.current_round = failed;
        self.current_index = 0;
        self.round_number += 1;
        self.stats.rounds = self.round_number;
    }

    /// True once the last card of the last round has been graded.
    pub fn is_completed(&self) -> bool {
        self.current_index >= self.current_round.len()
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    /// Cards passed so far in the current round
    pub fn passed_count(&self) -> usize {
        self.current_round
            .iter()
            .filter(|&&idx| self.cards[idx].passed)
            .count()
    }

    pub fn round_size(&self) -> usize {
        self.current_round.len()
    }

    /// 1-based position within the current round
    pub fn position(&self) -> usize {
        (self.current_index + 1).min(self.current_round.len())
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn cards(&self) -> &[SessionCard] {
        &self.cards
    }

    pub fn phase_message(&self) -> String {
        if self.round_number <= 1 {
            format!("Round {}: {} kanji", self.round_number, self.round_size())
        } else {
            format!(
                "Round {} (Review): {} kanji to retry",
                self.round_number,
                self.round_size()
            )
        }
    }
}

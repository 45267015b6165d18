//! Error types, one enum per layer.
//!
//! Scheduling errors never wrap storage errors: the scheduler only fails on a
//! bad quality rating, and the store knows nothing about grading rules.

use thiserror::Error;

/// Rejected input to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Quality rating outside 0..=5
    #[error("invalid quality rating {0}: expected an integer from 0 to 5")]
    InvalidQuality(i64),
    /// Quality rating that is not an integer at all
    #[error("invalid quality rating {0:?}: not an integer")]
    UnparsableQuality(String),
}

/// Progress store error
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Deck not found
    #[error("Deck not found: {0}")]
    DeckNotFound(String),
    /// Deck name already taken
    #[error("Deck '{0}' already exists")]
    DuplicateDeck(String),
    /// Kanji ID unknown to the catalogue
    #[error("Kanji not found: {0}")]
    KanjiNotFound(i64),
    /// Stored timestamp out of range
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),
    /// Stored current date is not a unix timestamp
    #[error("Malformed current date: {0:?}")]
    MalformedDate(String),
    /// Stored reading list is not valid JSON
    #[error("Malformed stored value: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Another thread panicked while holding the store lock
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Study session error
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Grading was attempted after every card passed
    #[error("study session is already completed")]
    Completed,
}

/// Deck import/export error
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

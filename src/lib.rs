pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;

pub use database::{MemoryStore, ProgressStore, SqliteStore};
pub use error::{ExportError, SchedulerError, SessionError, StoreError};
pub use models::{
    Deck, DeckSet, Kanji, MasteryRecord, MasteryState, Quality, SessionPlan, StudySession,
    grade_review, is_due,
};

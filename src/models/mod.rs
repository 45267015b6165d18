pub mod deck;
pub mod deck_set;
pub mod due;
pub mod kanji;
pub mod learning_session;
pub mod mastery;
pub mod quality;
pub mod rewards;
pub mod sm2;

pub use deck::Deck;
pub use deck_set::DeckSet;
pub use due::{SessionPlan, is_due};
pub use kanji::Kanji;
pub use learning_session::{ReviewOutcome, SessionCard, SessionOptions, SessionStats, StudySession};
pub use mastery::{MasteryRecord, MasteryState};
pub use quality::Quality;
pub use sm2::grade_review;

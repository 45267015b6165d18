//! Database operations for the kanji application
//!
//! Handles SQLite database initialization, decks and kanji, per-learner
//! mastery records and the study session log. Timestamps are stored as unix
//! seconds.

use super::store::ProgressStore;
use crate::error::StoreError;
use crate::models::{Deck, DeckSet, Kanji, MasteryRecord, MasteryState, Quality, SessionStats};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub type Result<T> = std::result::Result<T, StoreError>;

/// Opens (or creates) the database file and makes sure the schema exists.
pub fn init_database(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(path.as_ref())?;
    create_schema(&conn)?;
    tracing::info!(path = %path.as_ref().display(), "database ready");
    Ok(conn)
}

/// Fresh database that lives only as long as the connection.
pub fn init_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Creates tables for kanji, decks, mastery records, sessions and app state.
///
/// Sets the current date to now if not already initialized.
fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS kanjis (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            character TEXT NOT NULL UNIQUE,
            onyomi TEXT NOT NULL DEFAULT '[]',
            kunyomi TEXT NOT NULL DEFAULT '[]',
            meaning TEXT NOT NULL,
            jlpt_level INTEGER NOT NULL,
            stroke_count INTEGER
        );

        CREATE TABLE IF NOT EXISTS decks (
            name TEXT PRIMARY KEY,
            xp_multiplier REAL NOT NULL DEFAULT 1.0
        );

        CREATE TABLE IF NOT EXISTS deck_kanjis (
            deck_name TEXT NOT NULL,
            kanji_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (deck_name, kanji_id),
            FOREIGN KEY (deck_name) REFERENCES decks(name) ON DELETE CASCADE,
            FOREIGN KEY (kanji_id) REFERENCES kanjis(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS kanji_progress (
            learner_id TEXT NOT NULL,
            kanji_id INTEGER NOT NULL,
            ease_factor REAL NOT NULL DEFAULT 2.5,
            interval_days INTEGER NOT NULL DEFAULT 0,
            repetitions INTEGER NOT NULL DEFAULT 0,
            next_review_date INTEGER NOT NULL,
            last_review_date INTEGER,
            total_reviews INTEGER NOT NULL DEFAULT 0,
            correct_reviews INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (learner_id, kanji_id),
            FOREIGN KEY (kanji_id) REFERENCES kanjis(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS study_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            learner_id TEXT NOT NULL,
            deck_name TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            ended_at INTEGER,
            cards_studied INTEGER NOT NULL DEFAULT 0,
            correct_answers INTEGER NOT NULL DEFAULT 0,
            xp_earned INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![Utc::now().timestamp().to_string()],
    )?;

    Ok(())
}

fn to_datetime(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(StoreError::InvalidTimestamp(secs))
}

/// Retrieves the simulated current date from the database
pub fn get_current_date(conn: &Connection) -> Result<DateTime<Utc>> {
    let value: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )?;

    let secs = value
        .trim()
        .parse::<i64>()
        .map_err(|_| StoreError::MalformedDate(value.clone()))?;
    to_datetime(secs)
}

pub fn set_current_date(date: DateTime<Utc>, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![date.timestamp().to_string()],
    )?;
    Ok(())
}

/// Moves the simulated date forward, for trying out review schedules
pub fn advance_days(days: u32, conn: &Connection) -> Result<DateTime<Utc>> {
    let next = get_current_date(conn)? + Duration::days(i64::from(days));
    set_current_date(next, conn)?;
    tracing::info!(%next, days, "advanced current date");
    Ok(next)
}

/// Creates a new deck in the database
pub fn new_deck(name: &str, xp_multiplier: f64, conn: &Connection) -> Result<()> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO decks (name, xp_multiplier) VALUES (?1, ?2)",
        params![name, xp_multiplier],
    )?;
    if inserted == 0 {
        return Err(StoreError::DuplicateDeck(name.to_string()));
    }
    tracing::info!(deck = name, "deck created");
    Ok(())
}

/// Adds a kanji to the catalogue and returns its ID.
///
/// A kanji whose character is already known keeps its ID; its readings and
/// meaning are replaced by the new ones.
pub fn add_kanji(kanji: &Kanji, conn: &Connection) -> Result<i64> {
    conn.execute(
        "INSERT INTO kanjis (character, onyomi, kunyomi, meaning, jlpt_level, stroke_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (character) DO UPDATE SET
            onyomi = excluded.onyomi,
            kunyomi = excluded.kunyomi,
            meaning = excluded.meaning,
            jlpt_level = excluded.jlpt_level,
            stroke_count = excluded.stroke_count",
        params![
            kanji.character,
            serde_json::to_string(&kanji.onyomi)?,
            serde_json::to_string(&kanji.kunyomi)?,
            kanji.meaning,
            kanji.jlpt_level,
            kanji.stroke_count,
        ],
    )?;

    let kanji_id: i64 = conn.query_row(
        "SELECT id FROM kanjis WHERE character = ?1",
        params![kanji.character],
        |row| row.get(0),
    )?;

    Ok(kanji_id)
}

/// Appends a kanji at the end of a deck. Adding it twice is a no-op.
///
/// Returns whether the kanji was newly linked.
pub fn add_kanji_to_deck(deck_name: &str, kanji_id: i64, conn: &Connection) -> Result<bool> {
    deck_xp_multiplier(deck_name, conn)?;
    let known: Option<i64> = conn
        .query_row("SELECT id FROM kanjis WHERE id = ?1", params![kanji_id], |row| row.get(0))
        .optional()?;
    if known.is_none() {
        return Err(StoreError::KanjiNotFound(kanji_id));
    }
    let linked = conn.execute(
        "INSERT OR IGNORE INTO deck_kanjis (deck_name, kanji_id, position)
         VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM deck_kanjis WHERE deck_name = ?1))",
        params![deck_name, kanji_id],
    )?;
    Ok(linked == 1)
}

/// Stores a whole deck and its kanji in one transaction and returns the
/// number of distinct kanji linked to it.
///
/// Fails with [`StoreError::DuplicateDeck`] if the name is taken.
pub fn import_deck(deck: &Deck, conn: &mut Connection) -> Result<usize> {
    let tx = conn.transaction()?;
    new_deck(&deck.name, deck.xp_multiplier, &tx)?;
    let mut linked = 0;
    for kanji in &deck.kanjis {
        let kanji_id = add_kanji(kanji, &tx)?;
        if add_kanji_to_deck(&deck.name, kanji_id, &tx)? {
            linked += 1;
        }
    }
    tx.commit()?;

    tracing::info!(deck = %deck.name, kanjis = linked, "deck imported");
    Ok(linked)
}

fn deck_xp_multiplier(deck_name: &str, conn: &Connection) -> Result<f64> {
    conn.query_row(
        "SELECT xp_multiplier FROM decks WHERE name = ?1",
        params![deck_name],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| StoreError::DeckNotFound(deck_name.to_string()))
}

struct KanjiRow {
    id: i64,
    character: String,
    onyomi: String,
    kunyomi: String,
    meaning: String,
    jlpt_level: u8,
    stroke_count: Option<u8>,
}

impl KanjiRow {
    fn into_kanji(self) -> Result<(i64, Kanji)> {
        Ok((
            self.id,
            Kanji {
                character: self.character,
                onyomi: serde_json::from_str(&self.onyomi)?,
                kunyomi: serde_json::from_str(&self.kunyomi)?,
                meaning: self.meaning,
                jlpt_level: self.jlpt_level,
                stroke_count: self.stroke_count,
            },
        ))
    }
}

/// Retrieves all kanji of a deck in deck order
///
/// Returns vector of (kanji_id, Kanji) tuples
pub fn get_kanjis_for_deck(deck_name: &str, conn: &Connection) -> Result<Vec<(i64, Kanji)>> {
    deck_xp_multiplier(deck_name, conn)?;

    let mut stmt = conn.prepare(
        "SELECT k.id, k.character, k.onyomi, k.kunyomi, k.meaning, k.jlpt_level, k.stroke_count
         FROM deck_kanjis d
         JOIN kanjis k ON k.id = d.kanji_id
         WHERE d.deck_name = ?1
         ORDER BY d.position ASC",
    )?;

    let rows = stmt
        .query_map(params![deck_name], |row| {
            Ok(KanjiRow {
                id: row.get(0)?,
                character: row.get(1)?,
                onyomi: row.get(2)?,
                kunyomi: row.get(3)?,
                meaning: row.get(4)?,
                jlpt_level: row.get(5)?,
                stroke_count: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter().map(KanjiRow::into_kanji).collect()
}

/// Retrieves all deck names from database
pub fn get_all_decks(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM decks ORDER BY name")?;
    let decks = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(decks)
}

pub fn load_deck(deck_name: &str, conn: &Connection) -> Result<Deck> {
    let xp_multiplier = deck_xp_multiplier(deck_name, conn)?;
    let kanjis = get_kanjis_for_deck(deck_name, conn)?
        .into_iter()
        .map(|(_, kanji)| kanji)
        .collect();

    Ok(Deck {
        name: deck_name.to_string(),
        xp_multiplier,
        kanjis,
    })
}

/// Loads all decks with their kanji into memory
///
/// Does not load mastery records - those are per learner.
pub fn load_all_decks(conn: &Connection) -> Result<DeckSet> {
    let decks = get_all_decks(conn)?
        .iter()
        .map(|name| load_deck(name, conn))
        .collect::<Result<Vec<_>>>()?;
    Ok(DeckSet { decks })
}

struct ProgressRow {
    learner_id: String,
    kanji_id: i64,
    ease_factor: f64,
    interval_days: u32,
    repetitions: u32,
    next_review_date: i64,
    last_review_date: Option<i64>,
    total_reviews: u32,
    correct_reviews: u32,
}

const PROGRESS_COLUMNS: &str = "learner_id, kanji_id, ease_factor, interval_days, repetitions,
     next_review_date, last_review_date, total_reviews, correct_reviews";

impl ProgressRow {
    fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            learner_id: row.get(offset)?,
            kanji_id: row.get(offset + 1)?,
            ease_factor: row.get(offset + 2)?,
            interval_days: row.get(offset + 3)?,
            repetitions: row.get(offset + 4)?,
            next_review_date: row.get(offset + 5)?,
            last_review_date: row.get(offset + 6)?,
            total_reviews: row.get(offset + 7)?,
            correct_reviews: row.get(offset + 8)?,
        })
    }

    fn into_record(self) -> Result<MasteryRecord> {
        Ok(MasteryRecord {
            learner_id: self.learner_id,
            kanji_id: self.kanji_id,
            state: MasteryState {
                repetitions: self.repetitions,
                ease_factor: self.ease_factor,
                interval_days: self.interval_days,
            },
            next_review_date: to_datetime(self.next_review_date)?,
            last_review_date: self.last_review_date.map(to_datetime).transpose()?,
            total_reviews: self.total_reviews,
            correct_reviews: self.correct_reviews,
        })
    }
}

pub fn fetch_progress(
    learner_id: &str,
    kanji_id: i64,
    conn: &Connection,
) -> Result<Option<MasteryRecord>> {
    conn.query_row(
        &format!(
            "SELECT {PROGRESS_COLUMNS} FROM kanji_progress WHERE learner_id = ?1 AND kanji_id = ?2"
        ),
        params![learner_id, kanji_id],
        |row| ProgressRow::from_row(row, 0),
    )
    .optional()?
    .map(ProgressRow::into_record)
    .transpose()
}

/// Writes a mastery record, replacing any previous one for the same key
pub fn save_progress(record: &MasteryRecord, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO kanji_progress (learner_id, kanji_id, ease_factor, interval_days, repetitions,
                                     next_review_date, last_review_date, total_reviews, correct_reviews)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT (learner_id, kanji_id) DO UPDATE SET
            ease_factor = excluded.ease_factor,
            interval_days = excluded.interval_days,
            repetitions = excluded.repetitions,
            next_review_date = excluded.next_review_date,
            last_review_date = excluded.last_review_date,
            total_reviews = excluded.total_reviews,
            correct_reviews = excluded.correct_reviews",
        params![
            record.learner_id,
            record.kanji_id,
            record.state.ease_factor,
            record.state.interval_days,
            record.state.repetitions,
            record.next_review_date.timestamp(),
            record.last_review_date.map(|d| d.timestamp()),
            record.total_reviews,
            record.correct_reviews,
        ],
    )?;
    tracing::debug!(
        learner = %record.learner_id,
        kanji_id = record.kanji_id,
        interval_days = record.state.interval_days,
        "mastery record saved"
    );
    Ok(())
}

/// Every kanji of a deck with the learner's record, if any, in deck order
pub fn deck_progress(
    deck_name: &str,
    learner_id: &str,
    conn: &Connection,
) -> Result<Vec<(i64, Kanji, Option<MasteryRecord>)>> {
    let kanjis = get_kanjis_for_deck(deck_name, conn)?;
    kanjis
        .into_iter()
        .map(|(id, kanji)| {
            let record = fetch_progress(learner_id, id, conn)?;
            Ok((id, kanji, record))
        })
        .collect()
}

/// One row of the study session log
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StudySessionLog {
    pub id: i64,
    pub learner_id: String,
    pub deck_name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub cards_studied: u32,
    pub correct_answers: u32,
    pub xp_earned: u32,
}

pub fn start_study_session(
    learner_id: &str,
    deck_name: &str,
    started_at: DateTime<Utc>,
    conn: &Connection,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO study_sessions (learner_id, deck_name, started_at) VALUES (?1, ?2, ?3)",
        params![learner_id, deck_name, started_at.timestamp()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn finish_study_session(
    session_id: i64,
    ended_at: DateTime<Utc>,
    stats: &SessionStats,
    conn: &Connection,
) -> Result<()> {
    conn.execute(
        "UPDATE study_sessions
         SET ended_at = ?1, cards_studied = ?2, correct_answers = ?3, xp_earned = ?4
         WHERE id = ?5",
        params![
            ended_at.timestamp(),
            stats.cards_studied,
            stats.correct_answers,
            stats.xp_earned,
            session_id
        ],
    )?;
    Ok(())
}

/// Most recent sessions of a learner, newest first
pub fn recent_study_sessions(
    learner_id: &str,
    limit: usize,
    conn: &Connection,
) -> Result<Vec<StudySessionLog>> {
    let mut stmt = conn.prepare(
        "SELECT id, learner_id, deck_name, started_at, ended_at, cards_studied, correct_answers, xp_earned
         FROM study_sessions
         WHERE learner_id = ?1
         ORDER BY started_at DESC, id DESC
         LIMIT ?2",
    )?;

    let rows = stmt
        .query_map(params![learner_id, limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, u32>(6)?,
                row.get::<_, u32>(7)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(
            |(id, learner_id, deck_name, started, ended, cards, correct, xp)| {
                Ok(StudySessionLog {
                    id,
                    learner_id,
                    deck_name,
                    started_at: to_datetime(started)?,
                    ended_at: ended.map(to_datetime).transpose()?,
                    cards_studied: cards,
                    correct_answers: correct,
                    xp_earned: xp,
                })
            },
        )
        .collect()
}

/// SQLite-backed [`ProgressStore`].
///
/// Review dates are kept to whole seconds, so `record_review` truncates the
/// review instant before grading and the returned record matches what a
/// later `fetch` reads back. The connection sits behind a mutex; `record_review` additionally runs in
/// an immediate transaction so other processes sharing the file are
/// serialized too.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Runs `f` with exclusive access to the connection
    pub fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        f(&mut conn)
    }
}

impl ProgressStore for SqliteStore {
    fn fetch(&self, learner_id: &str, kanji_id: i64) -> Result<Option<MasteryRecord>> {
        let conn = self.lock()?;
        fetch_progress(learner_id, kanji_id, &conn)
    }

    fn save(&self, record: &MasteryRecord) -> Result<()> {
        let conn = self.lock()?;
        save_progress(record, &conn)
    }

    fn record_review(
        &self,
        learner_id: &str,
        kanji_id: i64,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> Result<MasteryRecord> {
        let reviewed_at = reviewed_at.trunc_subsecs(0);
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let prior = fetch_progress(learner_id, kanji_id, &tx)?;
        let updated =
            MasteryRecord::after_review(prior.as_ref(), learner_id, kanji_id, quality, reviewed_at);
        save_progress(&updated, &tx)?;
        tx.commit()?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::thread;

    fn kanji(character: &str, meaning: &str) -> Kanji {
        Kanji {
            character: character.to_string(),
            onyomi: vec!["オン".to_string()],
            kunyomi: vec!["くん".to_string(), "よみ".to_string()],
            meaning: meaning.to_string(),
            jlpt_level: 5,
            stroke_count: Some(3),
        }
    }

    fn sample_deck() -> Deck {
        Deck {
            name: "N5 Numbers".to_string(),
            xp_multiplier: 1.5,
            kanjis: vec![kanji("一", "one"), kanji("二", "two"), kanji("三", "three")],
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 7, 0, 0).unwrap()
    }

    #[test]
    fn test_import_and_load_deck() {
        let mut conn = init_in_memory().unwrap();
        assert_eq!(import_deck(&sample_deck(), &mut conn).unwrap(), 3);

        let loaded = load_deck("N5 Numbers", &conn).unwrap();
        assert_eq!(loaded, sample_deck());
        assert_eq!(get_all_decks(&conn).unwrap(), vec!["N5 Numbers"]);
        assert_eq!(load_all_decks(&conn).unwrap().kanji_count(), 3);
    }

    #[test]
    fn test_duplicate_deck_rejected() {
        let mut conn = init_in_memory().unwrap();
        import_deck(&sample_deck(), &mut conn).unwrap();

        let err = import_deck(&sample_deck(), &mut conn).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateDeck(name) if name == "N5 Numbers"));
        assert_eq!(get_kanjis_for_deck("N5 Numbers", &conn).unwrap().len(), 3);
    }

    #[test]
    fn test_kanji_shared_between_decks() {
        let conn = init_in_memory().unwrap();
        new_deck("A", 1.0, &conn).unwrap();
        new_deck("B", 1.0, &conn).unwrap();
        let first = add_kanji(&kanji("水", "water"), &conn).unwrap();
        let second = add_kanji(&kanji("水", "water"), &conn).unwrap();
        assert_eq!(first, second);

        assert!(add_kanji_to_deck("A", first, &conn).unwrap());
        assert!(!add_kanji_to_deck("A", first, &conn).unwrap());
        assert!(add_kanji_to_deck("B", first, &conn).unwrap());
        assert_eq!(get_kanjis_for_deck("A", &conn).unwrap().len(), 1);
        assert_eq!(get_kanjis_for_deck("B", &conn).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_deck() {
        let conn = init_in_memory().unwrap();
        assert!(matches!(
            load_deck("missing", &conn),
            Err(StoreError::DeckNotFound(_))
        ));
        assert!(matches!(
            add_kanji_to_deck("missing", 1, &conn),
            Err(StoreError::DeckNotFound(_))
        ));
    }

    #[test]
    fn test_progress_roundtrip_through_store() {
        let mut conn = init_in_memory().unwrap();
        import_deck(&sample_deck(), &mut conn).unwrap();
        let ids: Vec<i64> = get_kanjis_for_deck("N5 Numbers", &conn)
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let store = SqliteStore::new(conn);

        assert!(store.fetch("alice", ids[0]).unwrap().is_none());

        let five = Quality::new(5).unwrap();
        store.record_review("alice", ids[0], five, day(1)).unwrap();
        let second = store.record_review("alice", ids[0], five, day(2)).unwrap();

        let stored = store.fetch("alice", ids[0]).unwrap().unwrap();
        assert_eq!(stored, second);
        assert_eq!(stored.state.repetitions, 2);
        assert_eq!(stored.state.interval_days, 6);
        assert_eq!(stored.next_review_date, day(8));
        assert_eq!(stored.last_review_date, Some(day(2)));
        assert_eq!(stored.total_reviews, 2);

        let progress = store
            .with_connection(|c| deck_progress("N5 Numbers", "alice", c))
            .unwrap();
        assert_eq!(progress.len(), 3);
        assert!(progress[0].2.is_some());
        assert!(progress[1].2.is_none());
    }

    #[test]
    fn test_save_overwrites() {
        let conn = init_in_memory().unwrap();
        let id = add_kanji(&kanji("火", "fire"), &conn).unwrap();
        let store = SqliteStore::new(conn);

        let mut record =
            MasteryRecord::after_review(None, "bob", id, Quality::new(3).unwrap(), day(1));
        store.save(&record).unwrap();
        record.state.ease_factor = 1.9;
        record.total_reviews = 9;
        store.save(&record).unwrap();

        assert_eq!(store.fetch("bob", id).unwrap(), Some(record));
    }

    #[test]
    fn test_concurrent_reviews_do_not_lose_updates() {
        let conn = init_in_memory().unwrap();
        let id = add_kanji(&kanji("木", "tree"), &conn).unwrap();
        let store = Arc::new(SqliteStore::new(conn));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..10 {
                        let quality = Quality::new(if i % 2 == 0 { 5 } else { 1 }).unwrap();
                        store.record_review("carol", id, quality, day(3)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let record = store.fetch("carol", id).unwrap().unwrap();
        assert_eq!(record.total_reviews, 40);
        assert_eq!(record.correct_reviews, 20);
    }

    #[test]
    fn test_simulated_clock() {
        let conn = init_in_memory().unwrap();
        set_current_date(day(1), &conn).unwrap();
        assert_eq!(get_current_date(&conn).unwrap(), day(1));
        assert_eq!(advance_days(3, &conn).unwrap(), day(4));
        assert_eq!(get_current_date(&conn).unwrap(), day(4));
    }

    #[test]
    fn test_malformed_current_date_is_an_error() {
        let conn = init_in_memory().unwrap();
        conn.execute(
            "UPDATE app_state SET value = 'garbage' WHERE key = 'current_date'",
            [],
        )
        .unwrap();

        let err = get_current_date(&conn).unwrap_err();
        assert!(matches!(err, StoreError::MalformedDate(raw) if raw == "garbage"));
        assert!(advance_days(1, &conn).is_err());
    }

    #[test]
    fn test_subsecond_review_matches_stored_record() {
        let mut conn = init_in_memory().unwrap();
        import_deck(&sample_deck(), &mut conn).unwrap();
        let id = get_kanjis_for_deck("N5 Numbers", &conn).unwrap()[0].0;
        let store = SqliteStore::new(conn);

        let reviewed_at = day(1) + Duration::milliseconds(750);
        let returned = store
            .record_review("alice", id, Quality::new(4).unwrap(), reviewed_at)
            .unwrap();

        assert_eq!(returned.last_review_date, Some(day(1)));
        assert_eq!(returned.next_review_date, day(2));
        assert_eq!(store.fetch("alice", id).unwrap(), Some(returned));
    }

    #[test]
    fn test_reimported_kanji_takes_new_definition() {
        let mut conn = init_in_memory().unwrap();
        import_deck(&sample_deck(), &mut conn).unwrap();
        let id = get_kanjis_for_deck("N5 Numbers", &conn).unwrap()[0].0;

        let mut revised = kanji("一", "one, single");
        revised.kunyomi = vec!["ひと".to_string()];
        assert_eq!(add_kanji(&revised, &conn).unwrap(), id);

        let kanjis = get_kanjis_for_deck("N5 Numbers", &conn).unwrap();
        assert_eq!(kanjis[0], (id, revised));
        assert_eq!(kanjis.len(), 3);
    }

    #[test]
    fn test_import_counts_distinct_kanji() {
        let mut conn = init_in_memory().unwrap();
        let deck = Deck {
            name: "Repeats".to_string(),
            xp_multiplier: 1.0,
            kanjis: vec![kanji("一", "one"), kanji("二", "two"), kanji("一", "one")],
        };

        assert_eq!(import_deck(&deck, &mut conn).unwrap(), 2);
        assert_eq!(get_kanjis_for_deck("Repeats", &conn).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_kanji_not_added_to_deck() {
        let mut conn = init_in_memory().unwrap();
        import_deck(&sample_deck(), &mut conn).unwrap();

        assert!(matches!(
            add_kanji_to_deck("N5 Numbers", 999, &conn),
            Err(StoreError::KanjiNotFound(999))
        ));
        assert_eq!(get_kanjis_for_deck("N5 Numbers", &conn).unwrap().len(), 3);
    }

    #[test]
    fn test_session_log() {
        let conn = init_in_memory().unwrap();
        let first = start_study_session("alice", "N5", day(1), &conn).unwrap();
        let second = start_study_session("alice", "N5", day(2), &conn).unwrap();
        start_study_session("bob", "N5", day(2), &conn).unwrap();

        let stats = SessionStats {
            cards_studied: 5,
            reviews: 7,
            correct_answers: 4,
            xp_earned: 45,
            rounds: 2,
        };
        finish_study_session(first, day(1), &stats, &conn).unwrap();

        let logs = recent_study_sessions("alice", 10, &conn).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, second);
        assert_eq!(logs[0].ended_at, None);
        assert_eq!(logs[1].cards_studied, 5);
        assert_eq!(logs[1].correct_answers, 4);
        assert_eq!(logs[1].xp_earned, 45);
        assert_eq!(logs[1].ended_at, Some(day(1)));
    }
}

use clap::{Parser, Subcommand};
use kanji_srs::config::{Config, ConfigArgs};
use kanji_srs::database::db;
use kanji_srs::export::{export_json_to_path, import_json};
use kanji_srs::models::learning_session::due_cards;
use kanji_srs::{Deck, Kanji, ProgressStore, Quality, SqliteStore, StudySession, is_due};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kanji-srs")]
#[command(about = "Spaced repetition for Japanese kanji", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    config: ConfigArgs,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Import a deck from a JSON file
    Import { path: PathBuf },
    /// Export a deck to a JSON file
    Export { deck: String, path: PathBuf },
    /// List decks with due counts
    Decks,
    /// List kanji due for review in a deck
    Due { deck: String },
    /// Show mastery of every kanji in a deck
    Progress { deck: String },
    /// Study the due kanji of a deck
    Study { deck: String },
    /// Show recent study sessions
    Sessions {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Move the simulated date forward
    AdvanceDay {
        #[arg(long, default_value_t = 1)]
        days: u32,
    },
}

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::from(cli.config);
    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &Config) -> CliResult {
    let mut conn = db::init_database(&config.database_path)?;

    if db::get_all_decks(&conn)?.is_empty() {
        db::import_deck(&sample_deck(), &mut conn)?;
        println!("Sample data created!");
    }

    let store = Arc::new(SqliteStore::new(conn));

    match command {
        Command::Import { path } => {
            let deck = import_json(&path)?;
            let count = store.with_connection(|c| db::import_deck(&deck, c))?;
            println!("Deck '{}' imported successfully with {} kanji!", deck.name, count);
        }
        Command::Export { deck, path } => {
            let deck = store.with_connection(|c| db::load_deck(&deck, c))?;
            export_json_to_path(&deck, &path)?;
            println!("Deck '{}' exported to {}", deck.name, path.display());
        }
        Command::Decks => list_decks(&store, config)?,
        Command::Due { deck } => list_due(&store, config, &deck)?,
        Command::Progress { deck } => show_progress(&store, config, &deck)?,
        Command::Study { deck } => study(store, config, &deck)?,
        Command::Sessions { limit } => {
            let logs = store.with_connection(|c| {
                db::recent_study_sessions(&config.learner_id, limit, c)
            })?;
            for log in logs {
                let ended = log
                    .ended_at
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "unfinished".to_string());
                println!(
                    "{}  {:<20} {:>3} studied  {:>3} correct  +{} XP  ({ended})",
                    log.started_at.format("%Y-%m-%d %H:%M"),
                    log.deck_name,
                    log.cards_studied,
                    log.correct_answers,
                    log.xp_earned,
                );
            }
        }
        Command::AdvanceDay { days } => {
            let date = store.with_connection(|c| db::advance_days(days, c))?;
            println!("Current date: {}", date.format("%Y-%m-%d"));
        }
    }

    Ok(())
}

fn list_decks(store: &SqliteStore, config: &Config) -> CliResult {
    let (deck_set, now) =
        store.with_connection(|c| Ok((db::load_all_decks(c)?, db::get_current_date(c)?)))?;

    println!(
        "{} decks, {} kanji (today is {})",
        deck_set.decks.len(),
        deck_set.kanji_count(),
        now.format("%Y-%m-%d")
    );
    for deck in &deck_set.decks {
        let progress =
            store.with_connection(|c| db::deck_progress(&deck.name, &config.learner_id, c))?;
        let due = progress
            .iter()
            .filter(|(_, _, record)| is_due(record.as_ref(), now))
            .count();
        println!("  - {} ({} kanji, {} due)", deck.name, deck.kanjis.len(), due);
    }
    Ok(())
}

fn list_due(store: &SqliteStore, config: &Config, deck: &str) -> CliResult {
    let (progress, now) = store.with_connection(|c| {
        Ok((db::deck_progress(deck, &config.learner_id, c)?, db::get_current_date(c)?))
    })?;

    let queue = due_cards(progress, &config.plan, now);
    if queue.is_empty() {
        println!("Nothing due in '{deck}'.");
    }
    for card in queue {
        let status = match &card.record {
            Some(r) => format!("due since {}", r.next_review_date.format("%Y-%m-%d")),
            None => "new".to_string(),
        };
        println!("{}  {}  ({status})", card.kanji.character, card.kanji.meaning);
    }
    Ok(())
}

fn show_progress(store: &SqliteStore, config: &Config, deck: &str) -> CliResult {
    let progress = store.with_connection(|c| db::deck_progress(deck, &config.learner_id, c))?;

    for (_, kanji, record) in progress {
        match record {
            Some(r) => println!(
                "{}  reps {:>2}  ease {:.2}  every {:>4} d  next {}  accuracy {:.0}%",
                kanji.character,
                r.state.repetitions,
                r.state.ease_factor,
                r.state.interval_days,
                r.next_review_date.format("%Y-%m-%d"),
                r.accuracy().unwrap_or(0.0) * 100.0,
            ),
            None => println!("{}  not studied yet", kanji.character),
        }
    }
    Ok(())
}

fn study(store: Arc<SqliteStore>, config: &Config, deck_name: &str) -> CliResult {
    let (deck_xp, progress, now) = store.with_connection(|c| {
        Ok((
            db::load_deck(deck_name, c)?.xp_multiplier,
            db::deck_progress(deck_name, &config.learner_id, c)?,
            db::get_current_date(c)?,
        ))
    })?;

    let cards = due_cards(progress, &config.plan, now);
    if cards.is_empty() {
        println!("Nothing due in '{deck_name}'. Come back later!");
        return Ok(());
    }

    let session_id = store.with_connection(|c| {
        db::start_study_session(&config.learner_id, deck_name, now, c)
    })?;
    let mut session = StudySession::new(
        config.learner_id.clone(),
        deck_name,
        deck_xp,
        cards,
        Arc::clone(&store) as Arc<dyn ProgressStore>,
        config.session,
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut last_round = 0;

    while let Some(card) = session.current_card() {
        if session.round_number() != last_round {
            last_round = session.round_number();
            println!("\n== {} ==", session.phase_message());
        }
        let kanji = card.kanji.clone();

        println!("\n[{}/{}]  {}", session.position(), session.round_size(), kanji.character);
        prompt("Press Enter to reveal (q to quit) ")?;
        match lines.next().transpose()? {
            Some(line) if line.trim() != "q" => {}
            _ => break,
        }
        reveal(&kanji);

        let Some(quality) = read_quality(&mut lines)? else {
            break;
        };
        let outcome = session.grade_current_card(quality, now)?;
        println!(
            "Next review in {} day(s){}",
            outcome.record.state.interval_days,
            if outcome.xp > 0 { format!(", +{} XP", outcome.xp) } else { String::new() }
        );
    }

    let stats = session.stats();
    store.with_connection(|c| db::finish_study_session(session_id, now, &stats, c))?;

    println!(
        "\nSession finished: {}/{} correct ({}%), +{} XP over {} round(s)",
        stats.correct_answers,
        stats.reviews,
        stats.accuracy_percent(),
        stats.xp_earned,
        stats.rounds
    );
    Ok(())
}

fn reveal(kanji: &Kanji) {
    println!("    {}", kanji.meaning);
    if !kanji.onyomi.is_empty() || !kanji.kunyomi.is_empty() {
        println!("    {}", kanji.readings());
    }
}

fn prompt(text: &str) -> io::Result<()> {
    print!("{text}");
    io::stdout().flush()
}

/// Asks until a valid grade is typed. `None` means quit.
fn read_quality(
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> CliResult<Option<Quality>> {
    loop {
        prompt("Grade 0 (blackout) .. 5 (perfect), q to quit: ")?;
        let Some(line) = lines.next().transpose()? else {
            return Ok(None);
        };
        if line.trim() == "q" {
            return Ok(None);
        }
        match line.parse::<Quality>() {
            Ok(quality) => return Ok(Some(quality)),
            Err(e) => println!("{e}"),
        }
    }
}

fn sample_deck() -> Deck {
    fn kanji(character: &str, on: &[&str], kun: &[&str], meaning: &str, strokes: u8) -> Kanji {
        Kanji {
            character: character.to_string(),
            onyomi: on.iter().map(|s| s.to_string()).collect(),
            kunyomi: kun.iter().map(|s| s.to_string()).collect(),
            meaning: meaning.to_string(),
            jlpt_level: 5,
            stroke_count: Some(strokes),
        }
    }

    Deck {
        name: "JLPT N5 Basics".to_string(),
        xp_multiplier: 1.0,
        kanjis: vec![
            kanji("一", &["イチ", "イツ"], &["ひと"], "one", 1),
            kanji("二", &["ニ"], &["ふた"], "two", 2),
            kanji("三", &["サン"], &["み"], "three", 3),
            kanji("人", &["ジン", "ニン"], &["ひと"], "person", 2),
            kanji("日", &["ニチ", "ジツ"], &["ひ", "か"], "day, sun", 4),
            kanji("水", &["スイ"], &["みず"], "water", 4),
        ],
    }
}

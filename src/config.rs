//! Runtime configuration, read from command-line flags and environment.

use crate::models::{SessionOptions, SessionPlan};
use clap::Args;
use std::path::PathBuf;

pub const DEFAULT_DATABASE: &str = "kanji.sqlite3";
pub const DEFAULT_LEARNER: &str = "local";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub learner_id: String,
    pub plan: SessionPlan,
    pub session: SessionOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            learner_id: DEFAULT_LEARNER.to_string(),
            plan: SessionPlan::default(),
            session: SessionOptions::default(),
        }
    }
}

/// Flags shared by every subcommand.
#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// SQLite database file
    #[arg(long = "db", env = "KANJI_SRS_DB", default_value = DEFAULT_DATABASE, global = true)]
    pub database_path: PathBuf,

    /// Learner whose progress is read and written
    #[arg(long, env = "KANJI_SRS_LEARNER", default_value = DEFAULT_LEARNER, global = true)]
    pub learner: String,

    /// New kanji admitted per session
    #[arg(long, default_value_t = SessionPlan::default().max_new, global = true)]
    pub max_new: usize,

    /// Due reviews admitted per session
    #[arg(long, default_value_t = SessionPlan::default().max_reviews, global = true)]
    pub max_reviews: usize,

    /// Do not repeat failed kanji within a session
    #[arg(long, global = true)]
    pub no_retry: bool,
}

impl From<ConfigArgs> for Config {
    fn from(args: ConfigArgs) -> Self {
        Self {
            database_path: args.database_path,
            learner_id: args.learner,
            plan: SessionPlan {
                max_new: args.max_new,
                max_reviews: args.max_reviews,
            },
            session: SessionOptions {
                retry_failed: !args.no_retry,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["kanji-srs"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().config.into()
    }

    #[test]
    fn test_defaults_match_config_default() {
        // env overrides would make this flaky
        if std::env::var_os("KANJI_SRS_DB").is_some() || std::env::var_os("KANJI_SRS_LEARNER").is_some() {
            return;
        }
        assert_eq!(parse(&[]), Config::default());
    }

    #[test]
    fn test_flags() {
        let config = parse(&[
            "--db",
            "/tmp/x.sqlite3",
            "--learner",
            "yuki",
            "--max-new",
            "5",
            "--max-reviews",
            "40",
            "--no-retry",
        ]);
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.sqlite3"));
        assert_eq!(config.learner_id, "yuki");
        assert_eq!(config.plan, SessionPlan { max_new: 5, max_reviews: 40 });
        assert!(!config.session.retry_failed);
    }
}

//! Command-line interface definitions for pipeworks.
//!
//! One subcommand per tool. Options that have a config-file equivalent
//! fall back to the config when omitted; secrets come from the
//! environment.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::journal::{JournalFormat, parse_entry_date};
use crate::models::TaskStatus;
use crate::normalize::parse_date;
use crate::outputs::SaveFormat;

/// Command-line arguments for pipeworks.
///
/// # Examples
///
/// ```sh
/// # Load the beer catalogue into SQLite
/// pipeworks beer ingest
///
/// # Today's weather in Tokyo, saved as CSV
/// pipeworks weather --location Japan/Tokyo today --save csv
///
/// # Ingest every hour and run dbt after each successful load
/// pipeworks schedule --every-minutes 60 --transform-cmd "dbt run"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true, env = "PIPEWORKS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Punk API beer catalogue → SQLite
    Beer {
        #[command(subcommand)]
        action: BeerCommand,
    },
    /// weatherstack current conditions → SQLite
    WeatherDb {
        #[command(subcommand)]
        action: WeatherDbCommand,
    },
    /// Scrape timeanddate.com weather
    Weather(WeatherArgs),
    /// Scrape news headlines
    News(NewsArgs),
    /// To-do list (opens the menu when no action is given)
    Todo {
        #[command(subcommand)]
        action: Option<TodoCommand>,
    },
    /// Topic journals and the daily log
    Journal {
        #[command(subcommand)]
        action: JournalCommand,
    },
    /// Clean every CSV file in a directory in place
    Wrangle {
        /// Directory holding the CSV files
        dir: PathBuf,
    },
    /// Run beer ingestion on an interval, then a transform command
    Schedule(ScheduleArgs),
}

#[derive(Subcommand, Debug)]
pub enum BeerCommand {
    /// Fetch every page and insert new beers
    Ingest {
        /// Page size (defaults to the config value)
        #[arg(long)]
        per_page: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum WeatherDbCommand {
    /// Fetch current conditions and insert one row
    Ingest {
        /// Location query (defaults to the config value)
        #[arg(long)]
        city: Option<String>,

        /// weatherstack API key
        #[arg(long, env = "WEATHERSTACK_ACCESS_KEY", hide_env_values = true)]
        access_key: Option<String>,
    },
}

/// Location selection shared by the weather commands.
#[derive(Args, Debug, Clone, Default)]
pub struct LocationArgs {
    /// Country slug, e.g. `japan`
    #[arg(long, global = true)]
    pub country: Option<String>,

    /// City slug, e.g. `tokyo`
    #[arg(long, global = true)]
    pub city: Option<String>,

    /// Country/City in one value, e.g. `Japan/Tokyo`
    #[arg(long, global = true, conflicts_with_all = ["country", "city"])]
    pub location: Option<String>,
}

#[derive(Args, Debug)]
pub struct WeatherArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    #[command(subcommand)]
    pub action: WeatherCommand,
}

#[derive(Subcommand, Debug)]
pub enum WeatherCommand {
    /// Current conditions and hourly forecast
    Today {
        #[arg(long, value_enum)]
        save: Option<SaveFormat>,

        /// Also print the page's details table
        #[arg(long)]
        details: bool,
    },
    /// Current conditions for a Country/City
    Search {
        /// Location as Country/City
        query: String,

        #[arg(long, value_enum)]
        save: Option<SaveFormat>,
    },
    /// Observations for one past day
    Historic {
        /// Date (YYYY-MM-DD, YYYYMMDD, yesterday, ...)
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,

        /// Only keep observations from this time (HH:MM)
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Only keep observations up to this time (HH:MM)
        #[arg(long, requires = "from")]
        to: Option<String>,

        #[arg(long, value_enum)]
        save: Option<SaveFormat>,
    },
    /// Observations at 06:00, 12:00, 18:00 and 00:00 for each day of a range
    Range {
        #[arg(long, value_parser = parse_date_arg)]
        start: NaiveDate,

        #[arg(long, value_parser = parse_date_arg)]
        end: NaiveDate,

        #[arg(long, value_enum)]
        save: Option<SaveFormat>,
    },
    /// Chart of the last 24 hours of observations
    Plot24 {
        #[arg(long, value_enum)]
        save: Option<SaveFormat>,
    },
    /// Cities known for a country
    Cities {
        /// Fetch the list again instead of using the cache
        #[arg(long)]
        refresh: bool,
    },
    /// Saved JSON and CSV files in the data directory
    Files,
    /// Accepted location and date formats
    Formats,
    /// Menu-driven session
    Interactive,
}

#[derive(Args, Debug)]
pub struct NewsArgs {
    #[arg(long, value_enum)]
    pub save: Option<SaveFormat>,

    /// Keep at most this many headlines
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum TodoCommand {
    /// Add a pending task
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show pending and completed tasks
    List,
    /// Delete a task and renumber the rest
    Delete {
        key: u32,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,

        /// Leave the remaining keys as they are
        #[arg(long)]
        keep_keys: bool,
    },
    /// Set a task's status (toggles when omitted)
    Status {
        key: u32,

        /// pending or completed
        status: Option<TaskStatus>,
    },
    /// Reassign keys to 1..n
    Renumber,
    /// Interactive menu
    Menu,
}

#[derive(Subcommand, Debug)]
pub enum JournalCommand {
    /// Add an entry to a topic file
    Add {
        #[arg(long)]
        topic: String,

        #[arg(long)]
        message: String,

        #[arg(long, value_enum, default_value = "json")]
        format: JournalFormat,

        /// Entry date as DD/MM/YY (defaults to today)
        #[arg(long, value_parser = parse_entry_date_arg)]
        date: Option<NaiveDate>,
    },
    /// List indexed journal files
    List,
    /// Find journal files by date prefix or keyword
    #[command(group(ArgGroup::new("query").required(true).args(["date", "keyword"])))]
    Search {
        /// Filename prefix, e.g. 2025-05 or 2025-05-06
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        keyword: Option<String>,
    },
    /// Append a line to the plain-text journal
    Log {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Print the plain-text journal
    Show,
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Minutes between runs, at most one week
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=MAX_EVERY_MINUTES))]
    pub every_minutes: u64,

    /// Command run after each successful ingestion
    #[arg(long, env = "PIPEWORKS_TRANSFORM_CMD")]
    pub transform_cmd: Option<String>,

    /// Run once and exit
    #[arg(long)]
    pub once: bool,

    #[arg(long)]
    pub per_page: Option<u32>,
}

/// Longest schedule interval: one week.
pub const MAX_EVERY_MINUTES: u64 = 7 * 24 * 60;

fn parse_date_arg(input: &str) -> Result<NaiveDate, String> {
    parse_date(input).ok_or_else(|| format!("unrecognised date '{input}'"))
}

fn parse_entry_date_arg(input: &str) -> Result<NaiveDate, String> {
    parse_entry_date(input).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beer_ingest_parsing() {
        let cli = Cli::parse_from(["pipeworks", "beer", "ingest", "--per-page", "25"]);
        match cli.command {
            Command::Beer {
                action: BeerCommand::Ingest { per_page },
            } => assert_eq!(per_page, Some(25)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_weather_location_after_subcommand() {
        let cli = Cli::parse_from([
            "pipeworks",
            "--config",
            "/tmp/pw.yaml",
            "weather",
            "today",
            "--location",
            "Japan/Tokyo",
            "--save",
            "csv",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/pw.yaml")));
        let Command::Weather(args) = cli.command else {
            panic!("expected weather");
        };
        assert_eq!(args.location.location.as_deref(), Some("Japan/Tokyo"));
        assert!(matches!(
            args.action,
            WeatherCommand::Today {
                save: Some(SaveFormat::Csv),
                details: false
            }
        ));
    }

    #[test]
    fn test_weather_dates_are_validated() {
        let cli = Cli::parse_from(["pipeworks", "weather", "historic", "20250506"]);
        let Command::Weather(args) = cli.command else {
            panic!("expected weather");
        };
        match args.action {
            WeatherCommand::Historic { date, from, .. } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2025, 5, 6).unwrap());
                assert!(from.is_none());
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert!(Cli::try_parse_from(["pipeworks", "weather", "historic", "someday"]).is_err());
        assert!(
            Cli::try_parse_from(["pipeworks", "weather", "historic", "yesterday", "--from", "06:00"])
                .is_err()
        );
    }

    #[test]
    fn test_location_conflicts_with_country() {
        assert!(
            Cli::try_parse_from([
                "pipeworks", "weather", "--country", "japan", "--location", "Japan/Tokyo", "today"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_todo_defaults_to_menu() {
        let cli = Cli::parse_from(["pipeworks", "todo"]);
        assert!(matches!(cli.command, Command::Todo { action: None }));

        let cli = Cli::parse_from(["pipeworks", "todo", "status", "2", "completed"]);
        assert!(matches!(
            cli.command,
            Command::Todo {
                action: Some(TodoCommand::Status {
                    key: 2,
                    status: Some(TaskStatus::Completed)
                })
            }
        ));

        let cli = Cli::parse_from(["pipeworks", "todo", "add", "Buy", "milk"]);
        match cli.command {
            Command::Todo {
                action: Some(TodoCommand::Add { text }),
            } => assert_eq!(text.join(" "), "Buy milk"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_journal_parsing() {
        let cli = Cli::parse_from([
            "pipeworks", "journal", "add", "--topic", "work", "--message", "Standup", "--format",
            "csv", "--date", "06/05/25",
        ]);
        match cli.command {
            Command::Journal {
                action: JournalCommand::Add { format, date, .. },
            } => {
                assert_eq!(format, JournalFormat::Csv);
                assert_eq!(date, NaiveDate::from_ymd_opt(2025, 5, 6));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["pipeworks", "journal", "search"]).is_err());
    }

    #[test]
    fn test_schedule_defaults() {
        let cli = Cli::parse_from(["pipeworks", "schedule", "--once"]);
        let Command::Schedule(args) = cli.command else {
            panic!("expected schedule");
        };
        assert_eq!(args.every_minutes, 60);
        assert!(args.once);
        assert!(Cli::try_parse_from(["pipeworks", "schedule", "--every-minutes", "0"]).is_err());
        assert!(Cli::try_parse_from(["pipeworks", "schedule", "--every-minutes", "10080"]).is_ok());
        assert!(
            Cli::try_parse_from(["pipeworks", "schedule", "--every-minutes", "10081"]).is_err()
        );
        assert!(
            Cli::try_parse_from(["pipeworks", "schedule", "--every-minutes", "307445734561825861"])
                .is_err()
        );
    }
}

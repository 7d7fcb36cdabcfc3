//! # pipeworks
//!
//! Small fetch → parse → normalize → persist pipelines behind one CLI.
//!
//! ## Tools
//!
//! - **beer**: Punk API catalogue into SQLite, deduplicated by beer id
//! - **weather-db**: weatherstack current conditions into SQLite
//! - **weather**: timeanddate.com scraper (today, historic, ranges, last
//!   24 hours, city lists) with JSON/CSV snapshots
//! - **news**: headline scraper with an RSS fallback
//! - **todo**: JSON-backed task list
//! - **journal**: per-topic JSON/CSV journals and a plain-text log
//! - **wrangle**: in-place CSV clean-up
//! - **schedule**: interval ingestion followed by a transform command
//!
//! ## Usage
//!
//! ```sh
//! pipeworks beer ingest
//! pipeworks weather --location Japan/Tokyo today --save json
//! pipeworks todo add Water the plants
//! ```
//!
//! Logs go to stderr (`RUST_LOG` controls the level); tables and results go
//! to stdout.

use std::error::Error;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod display;
mod error;
mod extract;
mod fetch;
mod journal;
mod menu;
mod models;
mod normalize;
mod outputs;
mod pipelines;
mod prompt;
mod schedule;
mod scrapers;
mod session;
mod shutdown;
mod stats;
mod todo;
mod utils;
mod wrangle;

use cli::{
    BeerCommand, Cli, Command, JournalCommand, LocationArgs, NewsArgs, ScheduleArgs, TodoCommand,
    WeatherArgs, WeatherCommand, WeatherDbCommand,
};
use config::{AppConfig, WeatherConfig};
use error::PipelineError;
use fetch::build_client;
use journal::Journal;
use models::TaskStatus;
use normalize::{TimestampLayout, parse_location};
use outputs::SaveFormat;
use outputs::listing::list_saved_files;
use prompt::{Prompter, Reply};
use scrapers::weather::{WeatherScraper, filter_by_time_range};
use session::{LastResult, ObservationKind, WeatherSession};
use shutdown::Shutdown;
use todo::{TaskStore, describe_changes};
use utils::ensure_writable_dir;

type AppResult = Result<(), Box<dyn Error>>;

#[tokio::main]
async fn main() -> AppResult {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(config = ?args.config, "Parsed CLI arguments");

    let config = AppConfig::load(args.config.as_deref())?;
    let shutdown = Shutdown::install()?;
    let mut interrupted = shutdown.clone();

    tokio::select! {
        biased;
        outcome = dispatch(&config, args.command, shutdown) => outcome?,
        _ = interrupted.requested() => {
            println!("\nInterrupted.");
            warn!("Run interrupted before completion");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

async fn dispatch(config: &AppConfig, command: Command, shutdown: Shutdown) -> AppResult {
    match command {
        Command::Beer {
            action: BeerCommand::Ingest { per_page },
        } => run_beer(config, per_page).await?,
        Command::WeatherDb {
            action: WeatherDbCommand::Ingest { city, access_key },
        } => run_weather_db(config, city, access_key).await?,
        Command::Weather(weather) => run_weather(config, weather, shutdown).await?,
        Command::News(news) => run_news(config, news).await?,
        Command::Todo { action } => run_todo(config, action, shutdown).await?,
        Command::Journal { action } => run_journal(config, action).await?,
        Command::Wrangle { dir } => {
            for file in wrangle::wrangle_dir(&dir).await? {
                println!("Wrangled {}, rows: {}", file.path.display(), file.rows);
            }
        }
        Command::Schedule(schedule) => run_schedule(config, schedule, shutdown).await?,
    }
    Ok(())
}

#[instrument(level = "info", skip(config))]
async fn run_beer(config: &AppConfig, per_page: Option<u32>) -> AppResult {
    let client = build_client(&config.http)?;
    let per_page = per_page.unwrap_or(config.beer.per_page);
    let report = pipelines::ingest_beers(config, &client, per_page).await?;
    println!(
        "Inserted {} new beers ({} malts, {} hops, {} yeasts, {} pairings) into {}",
        report.beers,
        report.malts,
        report.hops,
        report.yeasts,
        report.pairings,
        config.db_path.display()
    );
    Ok(())
}

#[instrument(level = "info", skip(config, access_key))]
async fn run_weather_db(config: &AppConfig, city: Option<String>, access_key: Option<String>) -> AppResult {
    let access_key = access_key
        .or_else(|| config.weatherstack.access_key.clone())
        .ok_or_else(|| {
            PipelineError::invalid("No weatherstack key: set WEATHERSTACK_ACCESS_KEY or weatherstack.access_key")
        })?;
    let query = city.unwrap_or_else(|| config.weatherstack.query.clone());
    let client = build_client(&config.http)?;
    let conditions = pipelines::ingest_weather(config, &client, &access_key, &query).await?;
    println!(
        "Stored {}: {}°C, {} at {}",
        conditions.location.name,
        conditions.current.temperature,
        utils::or_na(conditions.description()),
        conditions.location.localtime
    );
    Ok(())
}

/// `(country, city)` from `--location` or `--country`/`--city`, with the
/// configured default country. The city may be absent.
fn resolve_location(args: &LocationArgs, config: &WeatherConfig) -> error::Result<(String, Option<String>)> {
    if let Some(location) = &args.location {
        let (country, city) = parse_location(location)?;
        return Ok((country, Some(city)));
    }
    let country = args
        .country
        .clone()
        .unwrap_or_else(|| config.default_country.clone());
    Ok((country, args.city.clone().filter(|c| !c.trim().is_empty())))
}

fn require_city(session: &WeatherSession) -> error::Result<()> {
    if session.city().is_empty() {
        return Err(PipelineError::invalid(
            "No city given; use --city or --location Country/City",
        ));
    }
    Ok(())
}

async fn save_last(session: &WeatherSession, format: Option<SaveFormat>) -> AppResult {
    if let Some(format) = format {
        ensure_writable_dir(session.data_dir()).await?;
        let path = session.save(format).await?;
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn print_last(session: &WeatherSession) {
    if let Some(text) = session.render_last() {
        println!("{text}");
    }
}

#[instrument(level = "info", skip_all)]
async fn run_weather(config: &AppConfig, args: WeatherArgs, shutdown: Shutdown) -> AppResult {
    match args.action {
        WeatherCommand::Formats => {
            println!("{}", display::formats());
            return Ok(());
        }
        WeatherCommand::Files => {
            let files = list_saved_files(&config.data_dir).await?;
            println!("{}", display::saved_files(&files));
            return Ok(());
        }
        _ => {}
    }

    let (country, city) = resolve_location(&args.location, &config.weather)?;
    let client = build_client(&config.http)?;
    let scraper = WeatherScraper::new(client, &config.weather, config.data_dir.clone());
    let mut session = WeatherSession::new(
        scraper,
        &config.data_dir,
        &country,
        city.as_deref().unwrap_or(""),
    );

    match args.action {
        WeatherCommand::Today { save, details } => {
            require_city(&session)?;
            let report = session.today().await?;
            println!("{}", display::weather_report(&report));
            if details {
                match session.scraper().fetch_details(session.country(), session.city()).await {
                    Ok(table) => println!("{}", display::details(&report.location, &table)),
                    Err(e) => warn!(error = %e, "Details table unavailable"),
                }
            }
            save_last(&session, save).await?;
        }
        WeatherCommand::Search { query, save } => {
            let (country, city) = parse_location(&query)?;
            session.set_location(&country, &city);
            let report = session.today().await?;
            println!("{}", display::weather_report(&report));
            save_last(&session, save).await?;
        }
        WeatherCommand::Historic { date, from, to, save } => {
            require_city(&session)?;
            let rows = session.historic(date).await.to_vec();
            if let (Some(from), Some(to)) = (from, to) {
                let rows = filter_by_time_range(&rows, &from, &to)?;
                session.remember(LastResult::Observations {
                    kind: ObservationKind::Historic,
                    date,
                    rows,
                });
            }
            print_last(&session);
            save_last(&session, save).await?;
        }
        WeatherCommand::Range { start, end, save } => {
            require_city(&session)?;
            session.range(start, end).await?;
            print_last(&session);
            save_last(&session, save).await?;
        }
        WeatherCommand::Plot24 { save } => {
            require_city(&session)?;
            let location = session.location();
            let rows = session.last_24h().await;
            println!("{}", display::plot_24h(&location, rows));
            save_last(&session, save).await?;
        }
        WeatherCommand::Cities { refresh } => {
            let cities = session.scraper().cities(&country, refresh).await?;
            println!("{}", display::cities(&country, &cities));
        }
        WeatherCommand::Interactive => menu::weather_menu(&mut session, shutdown).await?,
        WeatherCommand::Files | WeatherCommand::Formats => {}
    }
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_news(config: &AppConfig, args: NewsArgs) -> AppResult {
    let client = build_client(&config.http)?;
    let headlines = scrapers::news::fetch_headlines(&client, &config.news, args.limit).await?;
    println!("{}", display::headlines(&headlines));

    if let Some(format) = args.save {
        ensure_writable_dir(&config.data_dir).await?;
        let path = match format {
            SaveFormat::Json => {
                outputs::json::write_json_array(&config.data_dir, "bbc_headlines", &headlines).await?
            }
            SaveFormat::Csv => {
                outputs::csv::write_headlines_csv(&config.data_dir, "bbc_headlines", &headlines).await?
            }
        };
        session::record_saved(&config.data_dir, &path).await?;
        println!("Saved {}", path.display());
    }
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_todo(config: &AppConfig, action: Option<TodoCommand>, shutdown: Shutdown) -> AppResult {
    let path = config.todo.task_file.as_path();
    let Some(action) = action else {
        return Ok(menu::todo_menu(path, shutdown).await?);
    };

    let mut store = TaskStore::load(path).await;
    match action {
        TodoCommand::Add { text } => {
            let key = store.add(&text.join(" "))?;
            store.save().await?;
            println!("Added task {key}.");
        }
        TodoCommand::List => {
            debug!(
                pending = store.with_status(TaskStatus::Pending).count(),
                completed = store.with_status(TaskStatus::Completed).count(),
                "Loaded tasks"
            );
            if store.is_empty() {
                println!("No tasks yet.");
            } else {
                println!("{}", display::tasks(store.tasks().iter().map(|(k, t)| (*k, t))));
            }
        }
        TodoCommand::Delete {
            key,
            force,
            keep_keys,
        } => {
            let Some(task) = store.get(key) else {
                return Err(PipelineError::invalid(format!("Invalid task key {key}")).into());
            };
            if !force {
                let question = format!("Delete task {key} '{}'?", task.task);
                if Prompter::new(shutdown).confirm(&question).await? != Reply::Value(true) {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            let (_, changes) = store.delete(key, keep_keys)?;
            store.save().await?;
            println!("Deleted task {key}.");
            if let Some(warning) = describe_changes(&changes) {
                println!("{warning}");
            }
        }
        TodoCommand::Status { key, status } => {
            let current = store
                .get(key)
                .map(|t| t.status)
                .ok_or_else(|| PipelineError::invalid(format!("Invalid task key {key}")))?;
            let next = status.unwrap_or_else(|| current.toggled());
            store.set_status(key, next)?;
            store.save().await?;
            println!("Task {key} is now {next}.");
        }
        TodoCommand::Renumber => {
            let changes = store.renumber();
            store.save().await?;
            println!(
                "{}",
                describe_changes(&changes).unwrap_or_else(|| "Keys already contiguous.".to_string())
            );
        }
        TodoCommand::Menu => menu::todo_menu(path, shutdown).await?,
    }
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_journal(config: &AppConfig, action: JournalCommand) -> AppResult {
    let journal = Journal::new(&config.journal);
    let now = Local::now();
    match action {
        JournalCommand::Add {
            topic,
            message,
            format,
            date,
        } => {
            let added = journal.add(&topic, &message, format, date, &now).await?;
            println!("Entry added to {}", journal.dir().join(&added.filename).display());
        }
        JournalCommand::List => println!("{}", display::journal_files(&journal.list().await)),
        JournalCommand::Search { date, keyword } => {
            let matches = match (date, keyword) {
                (Some(date), _) => journal.search_by_date(&date).await,
                (None, Some(keyword)) => journal.search_by_keyword(&keyword).await,
                (None, None) => Vec::new(),
            };
            if matches.is_empty() {
                println!("No match found.");
            } else {
                println!("Matching files:");
                for name in matches {
                    println!(" - {name}");
                }
            }
        }
        JournalCommand::Log { message } => {
            let line = journal.log_line(&message.join(" "), &now).await?;
            println!("{line}");
        }
        JournalCommand::Show => {
            let text = journal.read_log().await?;
            if text.is_empty() {
                println!("The journal is empty.");
            } else {
                print!("{text}");
            }
        }
    }
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_schedule(config: &AppConfig, args: ScheduleArgs, shutdown: Shutdown) -> AppResult {
    let client = build_client(&config.http)?;
    let options = schedule::ScheduleOptions {
        every: Duration::from_secs(args.every_minutes * 60),
        transform_cmd: args.transform_cmd,
        once: args.once,
        per_page: args.per_page.unwrap_or(config.beer.per_page),
    };
    info!(
        every_minutes = args.every_minutes,
        started_at = %TimestampLayout::EventLog.format(&Local::now()),
        "Schedule starting"
    );
    schedule::run_schedule(config, &client, &options, shutdown).await?;
    Ok(())
}

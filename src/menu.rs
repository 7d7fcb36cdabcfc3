//! Interactive menu loops for the weather scraper and the to-do list.
//!
//! Both loops end on `0`, end of input or Ctrl-C (including one pressed
//! while an action was running). Errors from a single
//! action are printed and the loop continues.

use std::path::Path;

use tracing::{info, warn};

use crate::display;
use crate::error::Result;
use crate::models::TaskStatus;
use crate::normalize::parse_location;
use crate::outputs::SaveFormat;
use crate::outputs::listing::list_saved_files;
use crate::prompt::{Prompter, Reply};
use crate::session::WeatherSession;
use crate::shutdown::Shutdown;
use crate::todo::{TaskStore, describe_changes};

const FAREWELL: &str = "Goodbye!";

/// Menu choices, parsed from the typed number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WeatherChoice {
    Today,
    Historic,
    Range,
    Plot24,
    Save,
    Cities,
    Files,
    Stats,
    Location,
    Exit,
}

impl WeatherChoice {
    fn parse(input: &str) -> Option<Self> {
        Some(match input.trim() {
            "1" => Self::Today,
            "2" => Self::Historic,
            "3" => Self::Range,
            "4" => Self::Plot24,
            "5" => Self::Save,
            "6" => Self::Cities,
            "7" => Self::Files,
            "8" => Self::Stats,
            "9" => Self::Location,
            "0" | "q" | "exit" => Self::Exit,
            _ => return None,
        })
    }
}

/// Run the weather menu until the user exits.
pub async fn weather_menu(session: &mut WeatherSession, shutdown: Shutdown) -> Result<()> {
    let mut prompt = Prompter::new(shutdown);
    info!(location = %session.location(), "Interactive weather session started");
    if session.city().is_empty() {
        loop {
            match weather_action(session, &mut prompt, WeatherChoice::Location).await {
                Ok(true) if !session.city().is_empty() => break,
                Ok(true) => {}
                Ok(false) => {
                    println!("{FAREWELL}");
                    return Ok(());
                }
                Err(e) => println!("Error: {e}"),
            }
        }
    }
    loop {
        println!("\n{}\nLocation: {}", display::WEATHER_MENU, session.location());
        let choice = match prompt.line("Select an option").await? {
            Reply::Value(v) => v,
            _ => break,
        };
        let Some(choice) = WeatherChoice::parse(&choice) else {
            println!("Unknown option '{choice}'.");
            continue;
        };
        if choice == WeatherChoice::Exit {
            break;
        }
        match weather_action(session, &mut prompt, choice).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.is_transport() => {
                warn!(error = %e, "Request failed");
                println!("Network error: {e}. Check your connection and try again.");
            }
            Err(e) => {
                warn!(error = %e, "Menu action failed");
                println!("Error: {e}");
            }
        }
    }
    println!("{FAREWELL}");
    Ok(())
}

/// Perform one weather action. `Ok(false)` means the user interrupted.
async fn weather_action(
    session: &mut WeatherSession,
    prompt: &mut Prompter,
    choice: WeatherChoice,
) -> Result<bool> {
    match choice {
        WeatherChoice::Today => {
            let report = session.today().await?;
            println!("{}", display::weather_report(&report));
        }
        WeatherChoice::Historic => {
            let date = match prompt.date("Date").await? {
                Reply::Value(d) => d,
                Reply::Cancelled => return Ok(true),
                Reply::Interrupted => return Ok(false),
            };
            session.historic(date).await;
            print_last(session);
        }
        WeatherChoice::Range => {
            let start = match prompt.date("Start date").await? {
                Reply::Value(d) => d,
                Reply::Cancelled => return Ok(true),
                Reply::Interrupted => return Ok(false),
            };
            let end = match prompt.date("End date").await? {
                Reply::Value(d) => d,
                Reply::Cancelled => return Ok(true),
                Reply::Interrupted => return Ok(false),
            };
            session.range(start, end).await?;
            print_last(session);
        }
        WeatherChoice::Plot24 => {
            let location = session.location();
            let rows = session.last_24h().await;
            println!("{}", display::plot_24h(&location, rows));
        }
        WeatherChoice::Save => {
            let format = match prompt.line_or("Format (json/csv)", "json").await? {
                Reply::Value(v) if v.eq_ignore_ascii_case("csv") => SaveFormat::Csv,
                Reply::Value(_) => SaveFormat::Json,
                Reply::Cancelled => return Ok(true),
                Reply::Interrupted => return Ok(false),
            };
            let path = session.save(format).await?;
            println!("Saved {}", path.display());
        }
        WeatherChoice::Cities => {
            let refresh = match prompt.confirm("Refresh the city list from the web?").await? {
                Reply::Value(r) => r,
                Reply::Cancelled => false,
                Reply::Interrupted => return Ok(false),
            };
            let country = session.country().to_string();
            let cities = session.scraper().cities(&country, refresh).await?;
            println!("{}", display::cities(&country, &cities));
        }
        WeatherChoice::Files => {
            let files = list_saved_files(session.data_dir()).await?;
            println!("{}", display::saved_files(&files));
        }
        WeatherChoice::Stats => match session.stats() {
            Some(stats) => println!("{}", display::stats("Statistics", &stats)),
            None => println!("Nothing fetched yet."),
        },
        WeatherChoice::Location => {
            println!("{}", display::formats());
            let input = match prompt.line("Location (Country/City)").await? {
                Reply::Value(v) => v,
                Reply::Cancelled => return Ok(true),
                Reply::Interrupted => return Ok(false),
            };
            let (country, city) = parse_location(&input)?;
            session.set_location(&country, &city);
        }
        WeatherChoice::Exit => return Ok(false),
    }
    Ok(true)
}

fn print_last(session: &WeatherSession) {
    if let Some(text) = session.render_last() {
        println!("{text}");
    }
}

/// Run the to-do menu against the task file at `path`. The file is
/// reloaded and rewritten around every change.
pub async fn todo_menu(path: &Path, shutdown: Shutdown) -> Result<()> {
    let mut prompt = Prompter::new(shutdown);
    loop {
        println!("\n{}", display::TODO_MENU);
        let choice = match prompt.line("Select an option").await? {
            Reply::Value(v) => v,
            _ => break,
        };
        let outcome = match choice.as_str() {
            "1" => todo_add(path, &mut prompt).await,
            "2" => {
                let store = TaskStore::load(path).await;
                println!("{}", display::tasks(store.tasks().iter().map(|(k, t)| (*k, t))));
                Ok(true)
            }
            "3" => todo_delete(path, &mut prompt).await,
            "4" => todo_toggle(path, &mut prompt).await,
            "5" => {
                let mut store = TaskStore::load(path).await;
                let changes = store.renumber();
                store.save().await?;
                println!("{}", describe_changes(&changes).unwrap_or_else(|| "Keys already contiguous.".into()));
                Ok(true)
            }
            "0" | "q" | "exit" => break,
            other => {
                println!("Unknown option '{other}'.");
                Ok(true)
            }
        };
        match outcome {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("Error: {e}"),
        }
    }
    println!("{FAREWELL}");
    Ok(())
}

async fn read_key(prompt: &mut Prompter) -> Result<Reply<u32>> {
    Ok(match prompt.line("Task key").await? {
        Reply::Value(v) => match v.parse() {
            Ok(key) => Reply::Value(key),
            Err(_) => {
                println!("'{v}' is not a task key.");
                Reply::Cancelled
            }
        },
        Reply::Cancelled => Reply::Cancelled,
        Reply::Interrupted => Reply::Interrupted,
    })
}

async fn todo_add(path: &Path, prompt: &mut Prompter) -> Result<bool> {
    let text = match prompt.line("Task").await? {
        Reply::Value(v) => v,
        Reply::Cancelled => return Ok(true),
        Reply::Interrupted => return Ok(false),
    };
    let mut store = TaskStore::load(path).await;
    let key = store.add(&text)?;
    store.save().await?;
    println!("Added task {key}.");
    Ok(true)
}

async fn todo_delete(path: &Path, prompt: &mut Prompter) -> Result<bool> {
    let key = match read_key(prompt).await? {
        Reply::Value(k) => k,
        Reply::Cancelled => return Ok(true),
        Reply::Interrupted => return Ok(false),
    };
    let mut store = TaskStore::load(path).await;
    let Some(task) = store.get(key) else {
        println!("Invalid task key {key}.");
        return Ok(true);
    };
    match prompt.confirm(&format!("Delete '{}'?", task.task)).await? {
        Reply::Value(true) => {}
        Reply::Value(false) | Reply::Cancelled => return Ok(true),
        Reply::Interrupted => return Ok(false),
    }
    let (_, changes) = store.delete(key, false)?;
    store.save().await?;
    println!("Deleted task {key}.");
    if let Some(warning) = describe_changes(&changes) {
        println!("{warning}");
    }
    Ok(true)
}

async fn todo_toggle(path: &Path, prompt: &mut Prompter) -> Result<bool> {
    let key = match read_key(prompt).await? {
        Reply::Value(k) => k,
        Reply::Cancelled => return Ok(true),
        Reply::Interrupted => return Ok(false),
    };
    let mut store = TaskStore::load(path).await;
    let current = store.get(key).map(|t| t.status).unwrap_or(TaskStatus::Pending);
    store.set_status(key, current.toggled())?;
    store.save().await?;
    println!("Task {key} is now {}.", current.toggled());
    Ok(true)
}

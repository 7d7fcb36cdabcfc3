//! Database ingestion runs.
//!
//! Each run fetches first, then opens the database, creates its tables if
//! needed, inserts and closes the connection whatever the insert outcome.

use std::path::Path;

use reqwest::Client;
use tracing::{error, info, instrument};

use crate::config::AppConfig;
use crate::error::Result;
use crate::models::{Beer, CurrentConditions};
use crate::outputs::database::{BeerInsertReport, Database};
use crate::scrapers::{beer, weatherstack};

/// Open `db_path`, run `work`, then close the connection.
///
/// An insert error wins over a close error; both are logged.
fn with_database<T>(db_path: &Path, work: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
    let mut db = Database::open(db_path)?;
    let outcome = work(&mut db);
    let closed = db.close();
    if let Err(e) = &closed {
        error!(error = %e, "Failed to close database");
    }
    let value = outcome?;
    closed?;
    Ok(value)
}

/// Write fetched beers to the database at `db_path`.
pub fn store_beers(db_path: &Path, beers: &[Beer]) -> Result<BeerInsertReport> {
    with_database(db_path, |db| {
        db.create_beer_tables()?;
        db.insert_beers(beers)
    })
}

pub fn store_weather(db_path: &Path, conditions: &CurrentConditions) -> Result<()> {
    with_database(db_path, |db| {
        db.create_weather_table()?;
        db.insert_weather(conditions)
    })
}

/// Pull the whole beer catalogue into the database.
#[instrument(level = "info", skip_all, fields(per_page))]
pub async fn ingest_beers(config: &AppConfig, client: &Client, per_page: u32) -> Result<BeerInsertReport> {
    let beers = beer::fetch_all_beers(client, &config.beer.base_url, per_page).await?;
    let report = store_beers(&config.db_path, &beers)?;
    info!(
        fetched = beers.len(),
        new_beers = report.beers,
        malts = report.malts,
        hops = report.hops,
        yeasts = report.yeasts,
        pairings = report.pairings,
        "Beer ingestion finished"
    );
    Ok(report)
}

/// Record current conditions for `query` in the database.
#[instrument(level = "info", skip(config, client, access_key))]
pub async fn ingest_weather(
    config: &AppConfig,
    client: &Client,
    access_key: &str,
    query: &str,
) -> Result<CurrentConditions> {
    let conditions = weatherstack::fetch_current(client, &config.weatherstack, access_key, query).await?;
    store_weather(&config.db_path, &conditions)?;
    info!(city = %conditions.location.name, "Weather ingestion finished");
    Ok(conditions)
}

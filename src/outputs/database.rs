//! SQLite persistence for the ingestion pipelines.
//!
//! # Tables
//!
//! ```text
//! raw_beer_data      one row per beer_id (UNIQUE, duplicates skipped)
//! ├── malt_ingredients
//! ├── hop_ingredients
//! ├── yeast_ingredients
//! └── food_pairings    child rows, appended on every run
//! raw_weather_data   one row per weatherstack ingestion
//! ```
//!
//! Parent rows use `ON CONFLICT (beer_id) DO NOTHING`, so re-running an
//! ingestion never fails on known beers. Child rows have no natural key and
//! are inserted unconditionally: every re-run appends another copy of each
//! beer's ingredients and pairings.
//!
//! Each insert phase runs in its own transaction. A failed phase is rolled
//! back and its error returned; earlier phases stay committed.

use std::path::Path;

use rusqlite::{Connection, Transaction, params};
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::models::{Beer, CurrentConditions};

const BEER_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS raw_beer_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        beer_id INTEGER UNIQUE,
        name TEXT,
        tagline TEXT,
        first_brewed TEXT,
        description TEXT,
        image TEXT,
        abv REAL,
        ibu REAL,
        ebc REAL,
        ph REAL,
        brewers_tips TEXT,
        contributed_by TEXT,
        inserted_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS malt_ingredients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        beer_id INTEGER REFERENCES raw_beer_data(beer_id),
        malt_name TEXT,
        amount_value REAL,
        amount_unit TEXT
    );
    CREATE TABLE IF NOT EXISTS hop_ingredients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        beer_id INTEGER REFERENCES raw_beer_data(beer_id),
        hop_name TEXT,
        amount_value REAL,
        amount_unit TEXT,
        add_stage TEXT,
        attribute TEXT
    );
    CREATE TABLE IF NOT EXISTS yeast_ingredients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        beer_id INTEGER REFERENCES raw_beer_data(beer_id),
        yeast_name TEXT
    );
    CREATE TABLE IF NOT EXISTS food_pairings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        beer_id INTEGER REFERENCES raw_beer_data(beer_id),
        pairing TEXT
    );
";

const WEATHER_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS raw_weather_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        city TEXT,
        temperature REAL,
        weather_description TEXT,
        wind_speed REAL,
        time TIMESTAMP,
        inserted_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        utc_offset TEXT
    );
";

/// Rows written by one [`Database::insert_beers`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BeerInsertReport {
    /// New parent rows; already-known beers are not counted.
    pub beers: usize,
    pub malts: usize,
    pub hops: usize,
    pub yeasts: usize,
    pub pairings: usize,
}

/// An open SQLite connection. Close it with [`Database::close`].
pub struct Database {
    conn: Connection,
}

impl Database {
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        info!("Database connection opened");
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn create_beer_tables(&self) -> Result<()> {
        self.conn.execute_batch(BEER_SCHEMA)?;
        info!("Beer tables ready");
        Ok(())
    }

    pub fn create_weather_table(&self) -> Result<()> {
        self.conn.execute_batch(WEATHER_SCHEMA)?;
        info!("Weather table ready");
        Ok(())
    }

    /// Run `phase` in its own transaction, committing on success and rolling
    /// back on failure.
    fn in_transaction<F>(&mut self, phase: &'static str, work: F) -> Result<usize>
    where
        F: FnOnce(&Transaction<'_>) -> rusqlite::Result<usize>,
    {
        let tx = self.conn.transaction()?;
        match work(&tx) {
            Ok(rows) => {
                tx.commit()?;
                info!(phase, rows, "Inserted");
                Ok(rows)
            }
            Err(e) => {
                error!(phase, error = %e, "Insert failed; rolling back");
                if let Err(rollback) = tx.rollback() {
                    error!(phase, error = %rollback, "Rollback failed");
                }
                Err(e.into())
            }
        }
    }

    /// Insert beers and their ingredient and pairing rows.
    ///
    /// Phases run in order: parents, malts, hops, yeasts, pairings.
    #[instrument(level = "info", skip_all, fields(count = beers.len()))]
    pub fn insert_beers(&mut self, beers: &[Beer]) -> Result<BeerInsertReport> {
        let mut report = BeerInsertReport::default();

        report.beers = self.in_transaction("raw_beer_data", |tx| {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO raw_beer_data (
                    beer_id, name, tagline, first_brewed, description,
                    image, abv, ibu, ebc, ph, brewers_tips, contributed_by
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT (beer_id) DO NOTHING",
            )?;
            let mut inserted = 0;
            for b in beers {
                inserted += stmt.execute(params![
                    b.id,
                    b.name,
                    b.tagline,
                    b.first_brewed,
                    b.description,
                    b.image,
                    b.abv,
                    b.ibu,
                    b.ebc,
                    b.ph,
                    b.brewers_tips,
                    b.contributed_by,
                ])?;
            }
            Ok(inserted)
        })?;

        report.malts = self.in_transaction("malt_ingredients", |tx| {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO malt_ingredients (beer_id, malt_name, amount_value, amount_unit)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut n = 0;
            for b in beers {
                for malt in &b.ingredients.malt {
                    let amount = malt.amount.as_ref();
                    n += stmt.execute(params![
                        b.id,
                        malt.name,
                        amount.and_then(|a| a.value),
                        amount.and_then(|a| a.unit.as_deref()),
                    ])?;
                }
            }
            Ok(n)
        })?;

        report.hops = self.in_transaction("hop_ingredients", |tx| {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO hop_ingredients
                    (beer_id, hop_name, amount_value, amount_unit, add_stage, attribute)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            let mut n = 0;
            for b in beers {
                for hop in &b.ingredients.hops {
                    let amount = hop.amount.as_ref();
                    n += stmt.execute(params![
                        b.id,
                        hop.name,
                        amount.and_then(|a| a.value),
                        amount.and_then(|a| a.unit.as_deref()),
                        hop.add,
                        hop.attribute,
                    ])?;
                }
            }
            Ok(n)
        })?;

        report.yeasts = self.in_transaction("yeast_ingredients", |tx| {
            let mut stmt =
                tx.prepare_cached("INSERT INTO yeast_ingredients (beer_id, yeast_name) VALUES (?1, ?2)")?;
            let mut n = 0;
            for b in beers {
                if let Some(yeast) = b.ingredients.yeast.as_deref().filter(|y| !y.is_empty()) {
                    n += stmt.execute(params![b.id, yeast])?;
                }
            }
            Ok(n)
        })?;

        report.pairings = self.in_transaction("food_pairings", |tx| {
            let mut stmt =
                tx.prepare_cached("INSERT INTO food_pairings (beer_id, pairing) VALUES (?1, ?2)")?;
            let mut n = 0;
            for b in beers {
                for pairing in &b.food_pairing {
                    n += stmt.execute(params![b.id, pairing])?;
                }
            }
            Ok(n)
        })?;

        Ok(report)
    }

    /// Append one weatherstack observation.
    #[instrument(level = "info", skip_all, fields(city = %conditions.location.name))]
    pub fn insert_weather(&mut self, conditions: &CurrentConditions) -> Result<()> {
        self.in_transaction("raw_weather_data", |tx| {
            tx.execute(
                "INSERT INTO raw_weather_data
                    (city, temperature, weather_description, wind_speed, time, utc_offset)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    conditions.location.name,
                    conditions.current.temperature,
                    conditions.description(),
                    conditions.current.wind_speed,
                    conditions.location.localtime,
                    conditions.location.utc_offset,
                ],
            )
        })?;
        Ok(())
    }

    /// Number of rows in `table`.
    #[cfg(test)]
    pub fn count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', ""));
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Close the connection, reporting any error SQLite raises on close.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e)?;
        info!("Database connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, Hop, Ingredients, Malt, StackCurrent, StackLocation};

    fn beer(id: i64) -> Beer {
        Beer {
            id,
            name: format!("Beer {id}"),
            tagline: "Tag".into(),
            first_brewed: "09/2007".into(),
            description: "Hoppy".into(),
            image: None,
            abv: Some(4.5),
            ibu: None,
            ebc: None,
            ph: Some(4.4),
            brewers_tips: None,
            contributed_by: None,
            ingredients: Ingredients {
                malt: vec![Malt {
                    name: Some("Maris Otter".into()),
                    amount: Some(Amount {
                        value: Some(3.3),
                        unit: Some("kilograms".into()),
                    }),
                }],
                hops: vec![Hop {
                    name: Some("Fuggles".into()),
                    amount: None,
                    add: Some("start".into()),
                    attribute: Some("bitter".into()),
                }],
                yeast: Some("Wyeast 1056".into()),
            },
            food_pairing: vec!["Spicy chicken".into(), "Cheese".into()],
        }
    }

    fn beer_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_beer_tables().unwrap();
        db
    }

    #[test]
    fn insert_beers_writes_all_phases() {
        let mut db = beer_db();
        let report = db.insert_beers(&[beer(1), beer(2)]).unwrap();
        assert_eq!(
            report,
            BeerInsertReport {
                beers: 2,
                malts: 2,
                hops: 2,
                yeasts: 2,
                pairings: 4
            }
        );
        assert_eq!(db.count("food_pairings").unwrap(), 4);
    }

    #[test]
    fn duplicate_beer_id_is_skipped() {
        let mut db = beer_db();
        db.insert_beers(&[beer(1)]).unwrap();
        let second = db.insert_beers(&[beer(1)]).unwrap();
        assert_eq!(second.beers, 0);
        assert_eq!(db.count("raw_beer_data").unwrap(), 1);
    }

    #[test]
    fn rerun_appends_child_rows() {
        let mut db = beer_db();
        db.insert_beers(&[beer(7)]).unwrap();
        db.insert_beers(&[beer(7)]).unwrap();
        assert_eq!(db.count("malt_ingredients").unwrap(), 2);
        assert_eq!(db.count("yeast_ingredients").unwrap(), 2);
    }

    #[test]
    fn creating_tables_twice_is_harmless() {
        let db = beer_db();
        db.create_beer_tables().unwrap();
        db.create_weather_table().unwrap();
        db.create_weather_table().unwrap();
    }

    #[test]
    fn failed_phase_rolls_back() {
        let mut db = Database::open_in_memory().unwrap();
        // No tables: the first phase fails and nothing is committed.
        assert!(db.insert_beers(&[beer(1)]).is_err());
        db.create_beer_tables().unwrap();
        assert_eq!(db.count("raw_beer_data").unwrap(), 0);
    }

    #[test]
    fn insert_weather_row() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_weather_table().unwrap();
        let conditions = CurrentConditions {
            location: StackLocation {
                name: "Mumbai".into(),
                localtime: "2025-05-06 14:30".into(),
                utc_offset: "5.50".into(),
            },
            current: StackCurrent {
                temperature: 31.0,
                weather_descriptions: vec![],
                wind_speed: 15.0,
            },
        };
        db.insert_weather(&conditions).unwrap();
        assert_eq!(db.count("raw_weather_data").unwrap(), 1);
        db.close().unwrap();
    }
}

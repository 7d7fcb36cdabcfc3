//! Source-specific fetchers.
//!
//! Each module knows one upstream and turns it into typed records from
//! [`crate::models`]. They share the HTTP helpers in [`crate::fetch`] and the
//! fallback chains in [`crate::extract`].
//!
//! # Sources
//!
//! | Source | Module | Method | Records |
//! |--------|--------|--------|---------|
//! | Punk API | [`beer`] | Paginated JSON | `Beer` |
//! | weatherstack | [`weatherstack`] | JSON API, key required | `CurrentConditions` |
//! | timeanddate.com | [`weather`] | HTML scraping | `WeatherReport`, `HistoricObservation` |
//! | BBC News | [`news`] | HTML scraping, RSS fallback | `Headline` |
//!
//! Requests are always sequential. Multi-page work (date ranges) walks a
//! `futures::stream` with `.then`, one request in flight at a time.

pub mod beer;
pub mod news;
pub mod weather;
pub mod weatherstack;

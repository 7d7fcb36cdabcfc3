//! Punk API beer catalogue.
//!
//! The catalogue is served in pages of up to 80 beers at
//! `https://punkapi.online/v3/beers?page=N&per_page=M`. Everything is pulled
//! in one sequential pass through [`fetch_all_pages`].

use reqwest::Client;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::fetch::{HttpPageSource, fetch_all_pages};
use crate::models::Beer;

/// Fetch every beer in the catalogue, in server order.
///
/// # Errors
///
/// Only an invalid `base_url` is an error. Request failures end pagination
/// early and the beers gathered so far are returned.
#[instrument(level = "info", skip(client))]
pub async fn fetch_all_beers(client: &Client, base_url: &str, per_page: u32) -> Result<Vec<Beer>> {
    let source: HttpPageSource<'_, Beer> = HttpPageSource::new(client, base_url)?;
    let beers = fetch_all_pages(&source, per_page).await;
    info!(count = beers.len(), "Fetched beers");
    for beer in beers.iter().take(3) {
        debug!(id = beer.id, name = %beer.name, abv = ?beer.abv, "Sample beer");
    }
    Ok(beers)
}

//! HTTP fetching and pagination.
//!
//! Every pipeline starts here. Requests are issued one at a time and awaited
//! before the next one; nothing is retried.
//!
//! # Architecture
//!
//! - [`build_client`]: one `reqwest::Client` per run, with a browser-like
//!   `User-Agent` and the configured timeout
//! - [`fetch_text`] / [`fetch_json`]: single GETs that turn non-2xx statuses
//!   into [`PipelineError::Status`]
//! - [`PageSource`]: trait for anything that serves numbered pages
//! - [`HttpPageSource`]: `?page=N&per_page=M` implementation of [`PageSource`]
//! - [`fetch_all_pages`]: walks pages until an empty page or the first error
//!
//! # Truncation
//!
//! [`fetch_all_pages`] returns whatever it accumulated when a request fails.
//! Callers cannot tell a short run from a complete one except through the
//! `warn` log line.

use std::marker::PhantomData;
use std::time::{Duration, Instant};

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::HttpConfig;
use crate::error::{PipelineError, Result};
use crate::utils::truncate_for_log;

/// Build the HTTP client shared by a run.
///
/// # Errors
///
/// Returns [`PipelineError::Transport`] if the TLS backend cannot be
/// initialised.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// GET `url` and return the body as text.
///
/// # Errors
///
/// - [`PipelineError::Transport`] on connection, timeout or body errors
/// - [`PipelineError::Status`] when the server answers with a non-2xx status
#[instrument(level = "debug", skip(client))]
pub async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let t0 = Instant::now();
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        warn!(%url, status = status.as_u16(), "Request failed");
        return Err(PipelineError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.text().await?;
    debug!(
        %url,
        bytes = body.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Fetched"
    );
    Ok(body)
}

/// GET `url` and decode the body as JSON.
///
/// # Errors
///
/// Everything [`fetch_text`] returns, plus [`PipelineError::Json`] when the
/// body does not match `T`.
pub async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let body = fetch_text(client, url).await?;
    serde_json::from_str(&body).map_err(|e| {
        warn!(%url, error = %e, body = %truncate_for_log(&body, 300), "Response is not the expected JSON");
        PipelineError::Json(e)
    })
}

/// A source of numbered pages of items.
///
/// Pages are 1-based. An empty page means there is nothing further.
pub trait PageSource {
    /// The item type each page contains.
    type Item;

    /// Fetch a single page.
    ///
    /// # Arguments
    ///
    /// * `page` - 1-based page number
    /// * `per_page` - Requested page size
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<Self::Item>>;
}

/// A JSON API paginated through `page` and `per_page` query parameters.
pub struct HttpPageSource<'a, T> {
    client: &'a Client,
    base_url: Url,
    item: PhantomData<T>,
}

impl<'a, T> HttpPageSource<'a, T> {
    /// Create a page source for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] if `base_url` is not a valid URL.
    pub fn new(client: &'a Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PipelineError::invalid(format!("bad endpoint '{base_url}': {e}")))?;
        Ok(Self {
            client,
            base_url,
            item: PhantomData,
        })
    }

    /// The URL requested for a given page.
    pub fn page_url(&self, page: u32, per_page: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &per_page.to_string());
        url
    }
}

impl<T: DeserializeOwned> PageSource for HttpPageSource<'_, T> {
    type Item = T;

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<T>> {
        let url = self.page_url(page, per_page);
        fetch_json(self.client, url.as_str()).await
    }
}

/// Fetch every page from `source`, concatenating items in server order.
///
/// Stops at the first empty page; no page beyond it is requested. Any error
/// stops pagination and the items gathered so far are returned.
///
/// # Arguments
///
/// * `source` - The paginated endpoint
/// * `per_page` - Page size to request
#[instrument(level = "info", skip(source))]
pub async fn fetch_all_pages<S: PageSource>(source: &S, per_page: u32) -> Vec<S::Item> {
    let mut items = Vec::new();
    let mut page = 1u32;
    loop {
        match source.fetch_page(page, per_page).await {
            Ok(batch) if batch.is_empty() => {
                debug!(page, "Empty page; pagination complete");
                break;
            }
            Ok(batch) => {
                info!(page, count = batch.len(), "Retrieved page");
                items.extend(batch);
                page += 1;
            }
            Err(e) => {
                warn!(
                    page,
                    accumulated = items.len(),
                    error = %e,
                    "Page request failed; stopping pagination"
                );
                break;
            }
        }
    }
    info!(total = items.len(), pages = page - 1, "Pagination finished");
    items
}

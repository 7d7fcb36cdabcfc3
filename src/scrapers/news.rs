//! BBC News headline scraper.
//!
//! Headlines are read from the front page with a [`FallbackChain`]:
//!
//! 1. `h2-anchor`: links inside `h2` headings
//! 2. `news-anchor`: every link whose href contains `/news/`
//!
//! If the page cannot be fetched or neither strategy finds anything, the RSS
//! feed is used instead. Links are made absolute against the page URL and
//! deduplicated by link, first occurrence wins.

use chrono::Local;
use itertools::Itertools;
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use scraper::Selector;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::NewsConfig;
use crate::error::{PipelineError, Result};
use crate::extract::{FallbackChain, Page, element_text};
use crate::fetch::fetch_text;
use crate::models::Headline;
use crate::normalize::TimestampLayout;

static H2_ANCHOR_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("h2 a[href]").unwrap());
static ANCHOR_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// A headline link as found in the source, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub title: String,
    pub href: String,
}

fn collect_anchors(page: &Page, selector: &Selector, keep: fn(&str) -> bool) -> Option<Vec<Anchor>> {
    let anchors: Vec<Anchor> = page
        .document
        .select(selector)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            let title = element_text(&a);
            (!title.is_empty() && keep(href)).then(|| Anchor {
                title,
                href: href.to_string(),
            })
        })
        .collect();
    (!anchors.is_empty()).then_some(anchors)
}

/// Links inside `h2` headings that point at news stories or absolute URLs.
pub fn h2_anchors(page: &Page) -> Option<Vec<Anchor>> {
    collect_anchors(page, &H2_ANCHOR_SEL, |href| {
        href.contains("/news/") || href.starts_with("http")
    })
}

/// Every link on the page whose href contains `/news/`.
pub fn news_anchors(page: &Page) -> Option<Vec<Anchor>> {
    collect_anchors(page, &ANCHOR_SEL, |href| href.contains("/news/"))
}

pub fn headline_chain() -> FallbackChain<Vec<Anchor>> {
    FallbackChain::new("headlines")
        .then("h2-anchor", h2_anchors)
        .then("news-anchor", news_anchors)
}

/// Resolve anchors against `base`, dropping unparseable links and
/// duplicates.
pub fn resolve_headlines(anchors: Vec<Anchor>, base: &Url, scraped_at: &str) -> Vec<Headline> {
    anchors
        .into_iter()
        .filter_map(|a| {
            let link = base.join(&a.href).ok()?;
            Some(Headline {
                title: a.title,
                link: link.to_string(),
                scraped_at: scraped_at.to_string(),
            })
        })
        .unique_by(|h| h.link.clone())
        .collect()
}

fn predefined_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// `title`/`link` pairs of every `<item>` in an RSS document.
///
/// # Errors
///
/// Returns [`PipelineError::Xml`] when the document is not well-formed.
pub fn parse_rss(xml: &str) -> Result<Vec<Anchor>> {
    #[derive(PartialEq)]
    enum Field {
        Title,
        Link,
        Other,
    }

    let mut reader = Reader::from_str(xml);

    let mut items = Vec::new();
    let mut in_item = false;
    let mut field = Field::Other;
    let (mut title, mut link) = (String::new(), String::new());

    loop {
        let event = reader
            .read_event()
            .map_err(|e| PipelineError::Xml(e.to_string()))?;
        let text = match event {
            Event::Start(e) => {
                match e.name().as_ref() {
                    b"item" => {
                        in_item = true;
                        title.clear();
                        link.clear();
                    }
                    b"title" if in_item => field = Field::Title,
                    b"link" if in_item => field = Field::Link,
                    _ => field = Field::Other,
                }
                continue;
            }
            Event::End(e) => {
                if e.name().as_ref() == b"item" {
                    in_item = false;
                    if !title.trim().is_empty() && !link.trim().is_empty() {
                        items.push(Anchor {
                            title: title.trim().to_string(),
                            href: link.trim().to_string(),
                        });
                    }
                }
                field = Field::Other;
                continue;
            }
            Event::Text(e) => String::from_utf8_lossy(&e).into_owned(),
            Event::CData(e) => String::from_utf8_lossy(&e).into_owned(),
            Event::GeneralRef(e) => {
                let name = String::from_utf8_lossy(&e).into_owned();
                predefined_entity(&name).map(String::from).unwrap_or_default()
            }
            Event::Eof => break,
            _ => continue,
        };
        match field {
            Field::Title => title.push_str(&text),
            Field::Link => link.push_str(&text),
            Field::Other => {}
        }
    }
    Ok(items)
}

/// Fetch current headlines, newest layout first, RSS as the last resort.
///
/// # Errors
///
/// Fails only when the front page yields nothing and the feed cannot be
/// fetched or parsed.
#[instrument(level = "info", skip(client, config))]
pub async fn fetch_headlines(client: &Client, config: &NewsConfig, limit: Option<usize>) -> Result<Vec<Headline>> {
    let scraped_at = TimestampLayout::ScrapeStamp.format(&Local::now());
    let page_url = Url::parse(&config.url)
        .map_err(|e| PipelineError::invalid(format!("bad news URL '{}': {e}", config.url)))?;

    let from_page = match fetch_text(client, page_url.as_str()).await {
        Ok(html) => headline_chain().extract(&Page::parse(&html)),
        Err(e) => {
            warn!(url = %page_url, error = %e, "Front page unavailable");
            None
        }
    };

    let (anchors, base) = match from_page {
        Some(anchors) => (anchors, page_url),
        None => {
            info!(url = %config.feed_url, "Falling back to RSS feed");
            let feed_url = Url::parse(&config.feed_url)
                .map_err(|e| PipelineError::invalid(format!("bad feed URL '{}': {e}", config.feed_url)))?;
            let xml = fetch_text(client, feed_url.as_str()).await?;
            (parse_rss(&xml)?, feed_url)
        }
    };

    let mut headlines = resolve_headlines(anchors, &base, &scraped_at);
    if let Some(limit) = limit {
        headlines.truncate(limit);
    }
    info!(count = headlines.len(), "Headlines collected");
    Ok(headlines)
}

//! Listing metadata retrieval.
//!
//! The fetcher is an external collaborator: given an already-validated
//! listing URL it returns structured metadata or fails. Failures are not
//! retried here; the caller surfaces them and lets the user retry at the
//! request level.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Errors that can occur while fetching listing metadata.
///
/// A timed-out request surfaces as [`FetchError::Http`] and is treated
/// exactly like any other fetch failure.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Source site returned a non-success status.
    #[error("listing page returned status {0}")]
    Status(u16),

    /// The page was retrieved but its content could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Structured metadata scraped from a listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingMeta {
    pub title: Option<String>,
    /// Number of items in the listing; `None` when the page states no count.
    pub item_count: Option<i32>,
    pub zip_code: Option<String>,
    pub location: Option<String>,
    pub auctioneer: Option<String>,
    pub auction_name: Option<String>,
}

/// Retrieves metadata for a validated listing URL.
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    /// Fetch current metadata for the listing at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the page is unreachable, times out, returns
    /// a non-success status, or cannot be interpreted.
    async fn fetch(&self, url: &str) -> Result<ListingMeta, FetchError>;
}

/// Fetcher for hibid.com listing pages.
#[derive(Clone)]
pub struct HibidFetcher {
    client: reqwest::Client,
}

impl HibidFetcher {
    /// Create a fetcher with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client fails to build.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("claimstake/0.1")
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ListingFetcher for HibidFetcher {
    async fn fetch(&self, url: &str) -> Result<ListingMeta, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(parse_listing_page(&body))
    }
}

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"<title[^>]*>\s*(.*?)\s*</title>")
});

static ITEM_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"([0-9][0-9,]*)\s*(?:lots?|items?)\b")
});

// Case-sensitive: capitalized city words keep surrounding prose (e.g.
// "Pickup in") out of the city group.
static CITY_STATE_ZIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern =
        r"\b([A-Z][A-Za-z.'-]*(?:\s[A-Z][A-Za-z.'-]*)*),\s*([A-Z]{2})\s+(\d{5})(?:-\d{4})?\b";
    Regex::new(pattern).unwrap_or_else(|e| unreachable!("invalid listing pattern: {e}"))
});

static AUCTIONEER_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#""auctioneer"\s*:\s*\{[^}]*?"name"\s*:\s*"([^"]+)""#)
});

fn compile(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .unwrap_or_else(|e| unreachable!("invalid listing pattern: {e}"))
}

/// Extract listing metadata from a page body.
///
/// Extraction is best-effort per field; a page that yields no fields at all
/// still produces an empty [`ListingMeta`] with an unknown item count, which
/// prices at the base rate.
fn parse_listing_page(body: &str) -> ListingMeta {
    let title = TITLE_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty());

    let item_count = ITEM_COUNT_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<i32>().ok());

    let (location, zip_code) = CITY_STATE_ZIP_RE
        .captures(body)
        .map_or((None, None), |c| {
            let city = c.get(1).map(|m| m.as_str().trim().to_string());
            let state = c.get(2).map(|m| m.as_str().to_string());
            let zip = c.get(3).map(|m| m.as_str().to_string());
            let location = match (city, state) {
                (Some(city), Some(state)) => Some(format!("{city}, {state}")),
                _ => None,
            };
            (location, zip)
        });

    let auctioneer = AUCTIONEER_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    ListingMeta {
        auction_name: title.clone(),
        title,
        item_count,
        zip_code,
        location,
        auctioneer,
    }
}

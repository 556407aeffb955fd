//! Target page fetch.
//!
//! The page body and response headers feed the fingerprint matcher; the title
//! and meta generator go into the report's target intelligence.

use std::collections::HashMap;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Serialize;
use tokio_retry::RetryIf;
use url::Url;

use crate::config::{HTTP_STATUS_TOO_MANY_REQUESTS, MAX_RESPONSE_BODY_SIZE};
use crate::error_handling::get_retry_strategy;
use crate::probe::header_map_to_strings;

const TITLE_SELECTOR_STR: &str = "title";
const META_GENERATOR_SELECTOR_STR: &str = "meta[name][content]";

static TITLE_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| parse_selector(TITLE_SELECTOR_STR));
static META_GENERATOR_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| parse_selector(META_GENERATOR_SELECTOR_STR));

fn parse_selector(selector_str: &str) -> Option<Selector> {
    Selector::parse(selector_str)
        .map_err(|e| log::error!("Failed to parse CSS selector '{selector_str}': {e}"))
        .ok()
}

/// What the page fetch observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageSnapshot {
    /// URL after redirects
    pub final_url: String,
    /// HTTP status of the final response
    pub status: u16,
    /// Response headers, lowercase keys
    pub headers: HashMap<String, String>,
    /// Body, truncated to `MAX_RESPONSE_BODY_SIZE` bytes
    #[serde(skip)]
    pub body: String,
    /// `<title>` text
    pub title: Option<String>,
    /// `<meta name="generator">` content
    pub generator: Option<String>,
}

impl PageSnapshot {
    /// Builds a snapshot, extracting the title and generator from `body`.
    pub fn new(final_url: String, status: u16, headers: HashMap<String, String>, body: String) -> Self {
        let (title, generator) = extract_page_metadata(&body);
        Self {
            final_url,
            status,
            headers,
            body,
            title,
            generator,
        }
    }
}

/// Extracts the title and meta generator from an HTML document.
pub(crate) fn extract_page_metadata(body: &str) -> (Option<String>, Option<String>) {
    let document = Html::parse_document(body);

    let title = TITLE_SELECTOR.as_ref().and_then(|selector| {
        document
            .select(selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|title| !title.is_empty())
    });

    let generator = META_GENERATOR_SELECTOR.as_ref().and_then(|selector| {
        document
            .select(selector)
            .filter(|element| {
                element
                    .value()
                    .attr("name")
                    .is_some_and(|name| name.eq_ignore_ascii_case("generator"))
            })
            .filter_map(|element| element.value().attr("content"))
            .map(|content| content.trim().to_string())
            .find(|content| !content.is_empty())
    });

    (title, generator)
}

/// Source of the target page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches `url`. Any HTTP status is a successful fetch; only transport
    /// failures and exhausted retries are errors.
    async fn fetch(&self, url: &Url) -> Result<PageSnapshot>;
}

/// Fetches pages over HTTP, retrying transient failures.
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Transport failures, timeouts, 429 and 5xx responses are retried.
fn is_retriable(error: &reqwest::Error) -> bool {
    if let Some(status) = error.status() {
        return status.is_server_error() || status.as_u16() == HTTP_STATUS_TOO_MANY_REQUESTS;
    }
    error.is_timeout() || error.is_connect() || error.is_request()
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_RESPONSE_BODY_SIZE {
        let mut cut = MAX_RESPONSE_BODY_SIZE;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

async fn fetch_once(client: &reqwest::Client, url: &Url) -> Result<PageSnapshot, reqwest::Error> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if status.is_server_error() || status.as_u16() == HTTP_STATUS_TOO_MANY_REQUESTS {
        response.error_for_status_ref()?;
    }

    let final_url = response.url().to_string();
    let headers = header_map_to_strings(response.headers());
    let body = truncate_body(response.text().await?);

    Ok(PageSnapshot::new(final_url, status.as_u16(), headers, body))
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &Url) -> Result<PageSnapshot> {
        log::debug!("Fetching page {url}");
        let client = &self.client;
        let snapshot = RetryIf::spawn(
            get_retry_strategy(),
            move || fetch_once(client, url),
            is_retriable,
        )
        .await
        .with_context(|| format!("Failed to fetch {url}"))?;

        log::debug!(
            "Fetched {} (HTTP {}, {} bytes)",
            snapshot.final_url,
            snapshot.status,
            snapshot.body.len()
        );
        Ok(snapshot)
    }
}

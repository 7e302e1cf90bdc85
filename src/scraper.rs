use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, ClientBuilder};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::truncate_chars;

/// Returned in place of page text when none of the content tags carry any text.
pub const NO_CONTENT: &str = "No content found on the page.";

/// Upper bound on the combined text returned for one scrape request.
pub const MAX_OUTPUT_CHARS: usize = 50_000;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/110.0.0.0 Safari/537.36";

// Create static selectors to avoid recompiling them each time
static CONTENT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p, h1, h2, h3, h4, h5, h6, li, div")
        .expect("Failed to parse content selector")
});

static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a").expect("Failed to parse anchor selector")
});

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    /// Per-request timeout for every page fetch.
    pub fetch_timeout: Duration,
    /// Pause before following a "next" link.
    pub page_delay: Duration,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
            page_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    Http(String),

    #[error("HTTP {0} for url: {1}")]
    Status(u16, String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// What happened to a single page during a scrape.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub result: std::result::Result<String, FetchError>,
}

impl PageOutcome {
    fn scraped(url: &Url, text: String) -> Self {
        Self {
            url: url.to_string(),
            fetched_at: Utc::now(),
            result: Ok(text),
        }
    }

    fn failed(url: &Url, err: FetchError) -> Self {
        Self {
            url: url.to_string(),
            fetched_at: Utc::now(),
            result: Err(err),
        }
    }

    /// The page as it appears in the combined text.
    pub fn render(&self) -> String {
        match &self.result {
            Ok(text) => text.clone(),
            Err(err) => format!("Error: {}", err),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Combined output of scraping a batch of URLs.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub text: String,
    pub pages: Vec<PageOutcome>,
}

impl ScrapeReport {
    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|page| !page.is_ok()).count()
    }
}

/// Parses a user supplied URL, accepting it only when it has both a scheme and a host.
pub fn parse_target(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers
}

/// Fetches pages with a shared connection pool and follows pagination links.
pub struct Scraper {
    client: Client,
    settings: ScrapeSettings,
}

impl Scraper {
    pub fn new(settings: ScrapeSettings) -> Result<Self> {
        let client = ClientBuilder::new()
            .default_headers(browser_headers())
            .timeout(settings.fetch_timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    pub async fn fetch_html(&self, url: &Url) -> std::result::Result<String, FetchError> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16(), url.to_string()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))
    }

    /// Scrapes `start` and up to `depth - 1` pages reached through "next" links.
    ///
    /// The walk ends at the depth limit, when a page has no next link, when a fetch
    /// fails, or when the next link leads back to a page already scraped.
    pub async fn scrape(&self, start: &Url, depth: u32) -> Vec<PageOutcome> {
        let mut outcomes = Vec::new();
        let mut visited = HashSet::new();
        let mut current = start.clone();
        let mut remaining = depth.max(1);

        loop {
            visited.insert(visit_key(&current));
            tracing::debug!(url = %current, remaining, "fetching page");
            let started = Instant::now();

            let html = match self.fetch_html(&current).await {
                Ok(html) => html,
                Err(err) => {
                    tracing::warn!(url = %current, error = %err, "page fetch failed");
                    outcomes.push(PageOutcome::failed(&current, err));
                    break;
                }
            };

            // The parsed document must not live across an await point.
            let (text, next) = {
                let document = Html::parse_document(&html);
                let text = extract_from_document(&document);
                let next = if remaining > 1 {
                    find_next_page(&document, &current)
                } else {
                    None
                };
                (text, next)
            };

            tracing::info!(
                url = %current,
                chars = text.chars().count(),
                elapsed = ?started.elapsed(),
                "page scraped"
            );
            outcomes.push(PageOutcome::scraped(&current, text));

            let Some(next) = next else { break };
            if visited.contains(&visit_key(&next)) {
                tracing::info!(url = %next, "next link leads to a visited page, stopping");
                break;
            }

            tracing::debug!(next = %next, delay = ?self.settings.page_delay, "following next link");
            tokio::time::sleep(self.settings.page_delay).await;
            current = next;
            remaining -= 1;
        }

        outcomes
    }

    /// Scrapes every URL in order and joins the results with blank lines.
    pub async fn scrape_all(&self, urls: &[Url], depth: u32) -> ScrapeReport {
        let mut sections = Vec::with_capacity(urls.len());
        let mut pages = Vec::new();

        for url in urls {
            let outcomes = self.scrape(url, depth).await;
            let section = outcomes
                .iter()
                .map(PageOutcome::render)
                .collect::<Vec<_>>()
                .join("\n\n");
            sections.push(section);
            pages.extend(outcomes);
        }

        let text = truncate_chars(&sections.join("\n\n"), MAX_OUTPUT_CHARS);
        ScrapeReport { text, pages }
    }
}

fn visit_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.into()
}

/// Extracts the visible text of the content tags from raw HTML.
pub fn extract_content(html: &str) -> String {
    let document = Html::parse_document(html);
    extract_from_document(&document)
}

fn extract_from_document(document: &Html) -> String {
    let joined = document
        .select(&CONTENT_SELECTOR)
        .map(element_text)
        .collect::<Vec<_>>()
        .join(" ");

    let text = joined.trim();
    if text.is_empty() {
        NO_CONTENT.to_string()
    } else {
        text.to_string()
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Finds the first anchor whose text mentions "next" and resolves its target
/// against `base`.
pub fn find_next_page(document: &Html, base: &Url) -> Option<Url> {
    let anchor = document.select(&ANCHOR_SELECTOR).find(|anchor| {
        anchor
            .text()
            .collect::<String>()
            .to_lowercase()
            .contains("next")
    })?;

    let href = anchor.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok()
}

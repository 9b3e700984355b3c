//! Policy page fetcher - local HTTP + HTML cleanup
//!
//! This implementation:
//! - Uses reqwest for HTTP requests
//! - Uses scraper crate for HTML parsing
//! - Uses htmd for HTML to text conversion
//!
//! No JavaScript rendering; static HTML only.

use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;

use super::traits::BaseContentFetcher;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

/// Fetches policy pages and turns them into clean, chunked text.
pub struct PolicyFetcher {
    client: reqwest::Client,
}

impl PolicyFetcher {
    pub fn new() -> Result<Self> {
        // Browser-like User-Agent to avoid bot detection
        let user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    /// Fetch raw HTML from a URL.
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let url = normalize_url(url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status, url });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl BaseContentFetcher for PolicyFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        Ok(self.fetch_page(url).await?)
    }

    fn clean(&self, html: &str) -> String {
        let stripped = remove_boilerplate(html);
        let text = htmd::convert(&stripped).unwrap_or_else(|_| {
            // Fallback: strip tags and return plain text
            let document = Html::parse_document(&stripped);
            document.root_element().text().collect::<String>()
        });
        collapse_lines(&text)
    }

    fn chunk(&self, text: &str, size: usize) -> Vec<String> {
        chunk_text(text, size)
    }
}

/// Add https:// if no scheme is present.
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Remove script/style/nav/header/footer elements from an HTML string.
fn remove_boilerplate(html: &str) -> String {
    let document = Html::parse_document(html);
    let unwanted = ["script", "style", "nav", "header", "footer", "noscript", "iframe"];

    let mut result = html.to_string();
    for selector_str in unwanted {
        if let Ok(selector) = Selector::parse(selector_str) {
            for element in document.select(&selector) {
                let element_html = element.html();
                result = result.replace(&element_html, "");
            }
        }
    }

    result
}

/// Trim every line and drop the blank ones.
fn collapse_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split text into fixed-size chunks, counted in characters so multi-byte
/// content never splits mid-codepoint.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    if text.is_empty() || size == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

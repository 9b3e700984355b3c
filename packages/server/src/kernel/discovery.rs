//! Policy link discovery from a company's homepage.
//!
//! Heuristic anchor scan: the first link whose text or href mentions
//! privacy wins the privacy slot, and likewise for terms. Link quality
//! is deliberately simple; the pipeline only depends on the contract
//! "zero or more categorized URLs".

use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::traits::BaseLinkDiscoverer;
use crate::domains::companies::PageType;

pub struct HomepageLinkDiscoverer {
    client: reqwest::Client,
}

impl HomepageLinkDiscoverer {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_homepage(&self, base_url: &str) -> Option<String> {
        let response = self.client.get(base_url).send().await.ok()?;
        if !response.status().is_success() {
            debug!(url = %base_url, status = %response.status(), "homepage fetch rejected");
            return None;
        }
        response.text().await.ok()
    }
}

#[async_trait]
impl BaseLinkDiscoverer for HomepageLinkDiscoverer {
    async fn find(&self, domain: &str) -> Result<HashMap<PageType, String>> {
        // https first, plain http as fallback for older sites
        let mut base_url = format!("https://{}", domain);
        let mut html = self.fetch_homepage(&base_url).await;
        if html.is_none() {
            base_url = format!("http://{}", domain);
            html = self.fetch_homepage(&base_url).await;
        }

        let Some(html) = html else {
            debug!(domain = %domain, "homepage unreachable, no policy links");
            return Ok(HashMap::new());
        };

        Ok(extract_policy_links(&html, &base_url))
    }
}

/// Scan anchors for privacy/terms candidates. First match per type wins;
/// later candidates for an already-filled slot are ignored.
fn extract_policy_links(html: &str, base_url: &str) -> HashMap<PageType, String> {
    let mut discovered = HashMap::new();

    let Ok(base) = Url::parse(base_url) else {
        return discovered;
    };
    let Ok(anchor_selector) = Selector::parse("a[href]") else {
        return discovered;
    };

    let document = Html::parse_document(html);
    for anchor in document.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let text = anchor.text().collect::<String>().to_lowercase();
        let href_lower = href.to_lowercase();

        let Ok(full_url) = base.join(href) else {
            continue;
        };

        if !discovered.contains_key(&PageType::Privacy)
            && (text.contains("privacy") || href_lower.contains("privacy"))
        {
            discovered.insert(PageType::Privacy, full_url.to_string());
        }

        if !discovered.contains_key(&PageType::Terms)
            && (text.contains("terms") || text.contains("conditions") || href_lower.contains("tos"))
        {
            discovered.insert(PageType::Terms, full_url.to_string());
        }

        if discovered.len() == 2 {
            break;
        }
    }

    discovered
}

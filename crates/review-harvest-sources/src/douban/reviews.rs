//! Dynamic-render adapter for the client-rendered long-review feed.
//!
//! Review bodies are truncated behind an in-page "unfold" control, so
//! this source drives a real browser: navigate, wait for the item
//! container, expand each item, then read the revealed paragraphs.

use crate::browser::BrowserSession;
use crate::defense;
use crate::douban::BASE_URL;
use crate::error::SourceError;
use crate::extract::ExtractRules;
use crate::traits::ReviewSource;
use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::{Element, Page};
use review_harvest_config::HarvestOptions;
use review_harvest_models::{FetchedPage, ItemLink, ItemNode, Subject};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Extraction rules for the review feed. The listing is partitioned by
/// rating, so items without a usable DOM indicator take the bucket.
pub static REVIEW_RULES: ExtractRules = ExtractRules {
    star_class_prefix: "allstar",
    star_increment: 10,
    rating_range: (1, 4),
    url_template: Some("https://movie.douban.com/review/{id}/"),
};

const REVIEW_ITEM: &str = "div.main.review-item";
const REVIEW_CONTENT: &str = "div.review-content";
const INFO_LINKS: &str = "header.main-hd a";
const RATING_SPANS: &str = "span[class*='allstar']";
const TIME_LABEL: &str = "span.main-meta";

const CONTAINER_POLL: Duration = Duration::from_millis(500);
const EXPANSION_POLL: Duration = Duration::from_millis(250);

pub struct ReviewFeed {
    session: BrowserSession,
    page: Page,
    page_size: u32,
    buckets: Vec<u8>,
    page_timeout: Duration,
    item_timeout: Duration,
}

impl ReviewFeed {
    /// Take ownership of a browser session and open the render surface.
    /// The session is released again through [`ReviewSource::shutdown`].
    pub async fn open(
        session: BrowserSession,
        options: &HarvestOptions,
        buckets: Vec<u8>,
    ) -> Result<Self> {
        let page = session.new_page().await?;
        Ok(Self {
            session,
            page,
            page_size: options.page_size,
            buckets,
            page_timeout: Duration::from_secs(options.page_timeout_secs),
            item_timeout: Duration::from_secs(options.item_timeout_secs),
        })
    }

    /// Bounded wait for the review container; an empty vec after the
    /// deadline means the page rendered without items.
    async fn wait_for_items(&self) -> Vec<Element> {
        let deadline = Instant::now() + self.page_timeout;
        loop {
            if let Ok(elements) = self.page.find_elements(REVIEW_ITEM).await {
                if !elements.is_empty() {
                    return elements;
                }
            }
            if Instant::now() >= deadline {
                return Vec::new();
            }
            sleep(CONTAINER_POLL).await;
        }
    }

    /// Expand and flatten one review element. None skips the item only;
    /// the page carries on with the rest.
    async fn read_item(&self, element: &Element) -> Option<ItemNode> {
        let item_id = element
            .attribute("id")
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        // Truncated reviews keep their full text hidden until the unfold
        // control is clicked; the paragraphs only exist afterwards.
        let unfold_selector = format!("a.unfold#toggle-{}-copy", item_id);
        if let Ok(button) = element.find_element(&unfold_selector).await {
            let _ = button.scroll_into_view().await;
            if button.click().await.is_err() {
                debug!(item = %item_id, "unfold click failed, skipping item");
                return None;
            }
            if !self.wait_for_expansion(element).await {
                debug!(item = %item_id, "content expansion timed out, skipping item");
                return None;
            }
        }

        let content = element.find_element(REVIEW_CONTENT).await.ok()?;

        let mut node = ItemNode::with_id(item_id);
        if let Ok(paragraphs) = content.find_elements("p").await {
            for paragraph in paragraphs {
                if let Ok(Some(text)) = paragraph.inner_text().await {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        node.paragraphs.push(trimmed.to_string());
                    }
                }
            }
        }
        node.content_text = content
            .inner_text()
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
            .trim()
            .to_string();
        node.content_url = content.attribute("data-url").await.ok().flatten();
        node.info_links = collect_links(element, INFO_LINKS).await;
        node.links = collect_links(element, "a").await;
        if let Ok(spans) = element.find_elements(RATING_SPANS).await {
            for span in spans {
                if let Ok(Some(class_attr)) = span.attribute("class").await {
                    node.rating_classes
                        .extend(class_attr.split_whitespace().map(str::to_string));
                }
            }
        }
        node.time_label = match element.find_element(TIME_LABEL).await {
            Ok(label) => label
                .inner_text()
                .await
                .ok()
                .flatten()
                .map(|text| text.trim().to_string()),
            Err(_) => None,
        };
        Some(node)
    }

    /// Bounded wait for the expanded paragraphs to appear after a click.
    async fn wait_for_expansion(&self, element: &Element) -> bool {
        let deadline = Instant::now() + self.item_timeout;
        loop {
            if let Ok(content) = element.find_element(REVIEW_CONTENT).await {
                let has_paragraphs = content
                    .find_elements("p")
                    .await
                    .map(|paragraphs| !paragraphs.is_empty())
                    .unwrap_or(false);
                if has_paragraphs {
                    return true;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(EXPANSION_POLL).await;
        }
    }
}

fn review_page_url(subject_id: &str, bucket: Option<u8>, offset: u32) -> String {
    match bucket {
        Some(rating) => format!(
            "{}/subject/{}/reviews?sort=hotest&rating={}&start={}",
            BASE_URL, subject_id, rating, offset
        ),
        None => format!(
            "{}/subject/{}/reviews?sort=hotest&start={}",
            BASE_URL, subject_id, offset
        ),
    }
}

async fn collect_links(element: &Element, selector: &str) -> Vec<ItemLink> {
    let mut links = Vec::new();
    let Ok(elements) = element.find_elements(selector).await else {
        return links;
    };
    for el in elements {
        let href = el.attribute("href").await.ok().flatten().unwrap_or_default();
        let text = el.inner_text().await.ok().flatten().unwrap_or_default();
        let classes = el
            .attribute("class")
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        links.push(ItemLink { href, text, classes });
    }
    links
}

#[async_trait]
impl ReviewSource for ReviewFeed {
    fn source_name(&self) -> &str {
        "douban-reviews"
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn rating_buckets(&self) -> Vec<Option<u8>> {
        self.buckets.iter().map(|bucket| Some(*bucket)).collect()
    }

    fn extract_rules(&self) -> &ExtractRules {
        &REVIEW_RULES
    }

    async fn fetch_page(
        &self,
        subject: &Subject,
        bucket: Option<u8>,
        offset: u32,
    ) -> Result<FetchedPage, SourceError> {
        let url = review_page_url(&subject.id, bucket, offset);
        debug!(url = %url, "rendering review page");

        if let Err(e) = self.page.goto(url.as_str()).await {
            warn!(subject = %subject.id, error = %e, "navigation failed");
            return Ok(FetchedPage::transport_error());
        }

        let elements = self.wait_for_items().await;

        // A challenge interstitial renders no items; classify it before
        // concluding the listing is exhausted.
        match self.page.content().await {
            Ok(content) if defense::is_challenge_page(&content) => {
                return Ok(FetchedPage::blocked());
            }
            Ok(_) => {}
            Err(e) => {
                warn!(subject = %subject.id, error = %e, "could not read rendered page");
                return Ok(FetchedPage::transport_error());
            }
        }

        if elements.is_empty() {
            return Ok(FetchedPage::empty());
        }

        let raw_item_count = elements.len();
        let mut items = Vec::with_capacity(raw_item_count);
        for element in &elements {
            if let Some(node) = self.read_item(element).await {
                items.push(node);
            }
        }
        Ok(FetchedPage::success_with_raw_count(items, raw_item_count))
    }

    async fn shutdown(&mut self) -> Result<(), SourceError> {
        self.session
            .close()
            .await
            .map_err(|e| SourceError::new(format!("failed to close browser session: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_page_url_with_bucket() {
        let url = review_page_url("4811774", Some(2), 40);
        assert_eq!(
            url,
            "https://movie.douban.com/subject/4811774/reviews?sort=hotest&rating=2&start=40"
        );
    }

    #[test]
    fn test_review_page_url_without_bucket() {
        let url = review_page_url("4811774", None, 0);
        assert_eq!(
            url,
            "https://movie.douban.com/subject/4811774/reviews?sort=hotest&start=0"
        );
    }
}

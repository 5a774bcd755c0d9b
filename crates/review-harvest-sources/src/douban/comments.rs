//! Static-fetch adapter for the server-rendered short-comment feed.
//!
//! One HTTP request per page; the listing is fully server-rendered, so a
//! plain fetch plus HTML parse yields every item.

use crate::defense;
use crate::douban::BASE_URL;
use crate::error::SourceError;
use crate::extract::ExtractRules;
use crate::traits::ReviewSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use review_harvest_config::HarvestOptions;
use review_harvest_models::{FetchedPage, ItemLink, ItemNode, Subject};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Extraction rules for the comment feed: `allstar` indicators resolve to
/// 0-5 stars; comments have no per-item URL to reconstruct.
pub static COMMENT_RULES: ExtractRules = ExtractRules {
    star_class_prefix: "allstar",
    star_increment: 10,
    rating_range: (0, 5),
    url_template: None,
};

static COMMENT_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.comment-item").unwrap());
static COMMENT_INFO_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.comment-info a").unwrap());
static ANY_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static RATING_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span[class*='allstar']").unwrap());
static COMMENT_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.comment-content").unwrap());
static COMMENT_TIME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.comment-time").unwrap());

pub struct CommentFeed {
    client: reqwest::Client,
    page_size: u32,
}

impl CommentFeed {
    pub fn new(options: &HarvestOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.page_timeout_secs))
            .default_headers(default_headers())
            .build()
            .context("building http client for the comment feed")?;
        Ok(Self {
            client,
            page_size: options.page_size,
        })
    }

    fn page_url(&self, subject: &Subject, offset: u32) -> String {
        comment_page_url(&subject.id, self.page_size, offset)
    }
}

fn comment_page_url(subject_id: &str, page_size: u32, offset: u32) -> String {
    format!(
        "{}/subject/{}/comments?percent_type=l&limit={}&status=P&sort=new_score&start={}",
        BASE_URL, subject_id, page_size, offset
    )
}

/// Browser-like header set; the bare default client gets served an
/// interstitial far more often.
fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn link_from(el: ElementRef) -> ItemLink {
    ItemLink {
        href: el.value().attr("href").unwrap_or_default().to_string(),
        text: element_text(el),
        classes: el.value().classes().map(str::to_string).collect(),
    }
}

/// Flatten every comment item in a listing page into an `ItemNode`.
pub fn parse_comment_page(html: &str) -> Vec<ItemNode> {
    let document = Html::parse_document(html);
    document
        .select(&COMMENT_ITEM)
        .map(|item| {
            let mut node =
                ItemNode::with_id(item.value().attr("data-cid").unwrap_or_default());
            node.info_links = item.select(&COMMENT_INFO_LINK).map(link_from).collect();
            node.links = item.select(&ANY_LINK).map(link_from).collect();
            node.rating_classes = item
                .select(&RATING_SPAN)
                .flat_map(|span| span.value().classes().map(str::to_string))
                .collect();
            node.paragraphs = item
                .select(&COMMENT_CONTENT)
                .map(element_text)
                .filter(|text| !text.is_empty())
                .collect();
            node.content_text = node.paragraphs.join("\n");
            node.time_label = item.select(&COMMENT_TIME).next().map(element_text);
            node
        })
        .collect()
}

#[async_trait]
impl ReviewSource for CommentFeed {
    fn source_name(&self) -> &str {
        "douban-comments"
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn rating_buckets(&self) -> Vec<Option<u8>> {
        vec![None]
    }

    fn extract_rules(&self) -> &ExtractRules {
        &COMMENT_RULES
    }

    async fn fetch_page(
        &self,
        subject: &Subject,
        _bucket: Option<u8>,
        offset: u32,
    ) -> Result<FetchedPage, SourceError> {
        let url = self.page_url(subject, offset);
        debug!(url = %url, "fetching comment page");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(subject = %subject.id, error = %e, "comment page request failed");
                return Ok(FetchedPage::transport_error());
            }
        };

        if !response.status().is_success() {
            warn!(
                subject = %subject.id,
                status = %response.status(),
                "non-success status for comment page"
            );
            return Ok(FetchedPage::transport_error());
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(subject = %subject.id, error = %e, "failed to read comment page body");
                return Ok(FetchedPage::transport_error());
            }
        };

        if defense::is_challenge_page(&body) {
            return Ok(FetchedPage::blocked());
        }

        Ok(FetchedPage::success(parse_comment_page(&body)))
    }
}

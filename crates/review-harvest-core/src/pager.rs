//! Pagination controller: drives the page-offset loop for one
//! (subject, bucket) pair and decides when the sequence has ended.
//!
//! The sources expose no reliable "next page" metadata, so termination is
//! derived purely from response shape: an empty page or a transport
//! failure is taken as end-of-data, a short page is a definitive last
//! page, and a safety ceiling bounds the loop either way.

use crate::events::{EventSink, HarvestEvent};
use rand::Rng;
use review_harvest_config::HarvestOptions;
use review_harvest_models::{PageStatus, ReviewRecord, Subject};
use review_harvest_sources::extract::{extract, ExtractContext};
use review_harvest_sources::ReviewSource;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Terminal state of one (subject, bucket) pagination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// Empty or short page, or a transport failure standing in for one.
    /// A transient network error is indistinguishable from true
    /// end-of-data here; no retry is attempted.
    LastPage,
    /// The defense detector tripped. Accumulated records are kept.
    Blocked,
    /// The safety ceiling fired before any natural end.
    MaxPagesReached,
}

impl std::fmt::Display for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Terminal::LastPage => write!(f, "last-page"),
            Terminal::Blocked => write!(f, "blocked"),
            Terminal::MaxPagesReached => write!(f, "max-pages-reached"),
        }
    }
}

/// Everything one bucket run produced. Every terminal path returns the
/// records accumulated so far; nothing is discarded.
#[derive(Debug)]
pub struct BucketHarvest {
    pub records: Vec<ReviewRecord>,
    pub terminal: Terminal,
    pub pages_fetched: u32,
}

/// Cursor over one paginated sequence.
struct Cursor {
    offset: u32,
    pages: u32,
}

/// Walk one (subject, bucket) sequence to a terminal state.
pub async fn harvest_bucket(
    source: &dyn ReviewSource,
    subject: &Subject,
    bucket: Option<u8>,
    options: &HarvestOptions,
    events: &dyn EventSink,
) -> BucketHarvest {
    let page_size = source.page_size();
    let ctx = ExtractContext {
        subject,
        bucket,
        rules: source.extract_rules(),
    };
    let mut cursor = Cursor { offset: 0, pages: 0 };
    let mut records: Vec<ReviewRecord> = Vec::new();

    let terminal = loop {
        events.on_event(&HarvestEvent::PageStarted {
            source: source.source_name().to_string(),
            subject_id: subject.id.clone(),
            bucket,
            offset: cursor.offset,
        });

        let page = match source.fetch_page(subject, bucket, cursor.offset).await {
            Ok(page) => page,
            Err(e) => {
                // An adapter fault looks like end-of-data from here; keep
                // what was collected and move on.
                warn!(
                    subject = %subject.id,
                    error = %e,
                    "source adapter failed, ending bucket"
                );
                break Terminal::LastPage;
            }
        };
        cursor.pages += 1;

        events.on_event(&HarvestEvent::PageFinished {
            source: source.source_name().to_string(),
            subject_id: subject.id.clone(),
            bucket,
            offset: cursor.offset,
            status: page.status,
            item_count: page.raw_item_count,
        });

        match page.status {
            PageStatus::Blocked => break Terminal::Blocked,
            PageStatus::TransportError | PageStatus::Empty => break Terminal::LastPage,
            PageStatus::Success => {}
        }

        for item in &page.items {
            match extract(item, &ctx) {
                Some(record) => {
                    events.on_event(&HarvestEvent::RecordProduced {
                        source: source.source_name().to_string(),
                        subject_id: subject.id.clone(),
                        author: record.author.clone(),
                    });
                    records.push(record);
                }
                None => {
                    events.on_event(&HarvestEvent::ItemDropped {
                        source: source.source_name().to_string(),
                        subject_id: subject.id.clone(),
                        item_id: item.item_id.clone(),
                        reason: "empty body after every fallback",
                    });
                }
            }
        }

        // A short page is a definitive last page; extraction drops do not
        // count toward this comparison.
        if (page.raw_item_count as u32) < page_size {
            debug!(
                subject = %subject.id,
                items = page.raw_item_count,
                page_size,
                "short page, treating as last"
            );
            break Terminal::LastPage;
        }

        if cursor.pages >= options.max_pages {
            break Terminal::MaxPagesReached;
        }

        cursor.offset += page_size;
        let delay = draw_delay(options.delay_min_secs, options.delay_max_secs);
        debug!(delay_ms = delay.as_millis() as u64, "inter-page delay");
        sleep(delay).await;
    };

    events.on_event(&HarvestEvent::BucketFinished {
        source: source.source_name().to_string(),
        subject_id: subject.id.clone(),
        bucket,
        terminal,
        records: records.len(),
        pages: cursor.pages,
    });

    BucketHarvest {
        records,
        terminal,
        pages_fetched: cursor.pages,
    }
}

/// Uniform draw from the configured delay range; a degenerate range
/// sleeps its floor.
fn draw_delay(min_secs: u64, max_secs: u64) -> Duration {
    if max_secs <= min_secs {
        return Duration::from_secs(min_secs);
    }
    let millis = rand::rng().random_range(min_secs * 1000..=max_secs * 1000);
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use async_trait::async_trait;
    use review_harvest_models::{FetchedPage, ItemNode};
    use review_harvest_sources::{ExtractRules, SourceError};
    use std::sync::Mutex;

    static TEST_RULES: ExtractRules = ExtractRules {
        star_class_prefix: "allstar",
        star_increment: 10,
        rating_range: (0, 5),
        url_template: None,
    };

    enum Scripted {
        Page(FetchedPage),
        Fail,
    }

    struct ScriptedSource {
        script: Mutex<Vec<Scripted>>,
        calls: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ReviewSource for ScriptedSource {
        fn source_name(&self) -> &str {
            "scripted"
        }

        fn page_size(&self) -> u32 {
            20
        }

        fn rating_buckets(&self) -> Vec<Option<u8>> {
            vec![None]
        }

        fn extract_rules(&self) -> &ExtractRules {
            &TEST_RULES
        }

        async fn fetch_page(
            &self,
            _subject: &Subject,
            _bucket: Option<u8>,
            _offset: u32,
        ) -> Result<FetchedPage, SourceError> {
            *self.calls.lock().unwrap() += 1;
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Ok(FetchedPage::empty());
            }
            match script.remove(0) {
                Scripted::Page(page) => Ok(page),
                Scripted::Fail => Err(SourceError::new("scripted adapter fault")),
            }
        }
    }

    fn item(body: &str) -> ItemNode {
        let mut node = ItemNode::with_id("item");
        node.content_text = body.to_string();
        node
    }

    fn full_page(count: usize) -> FetchedPage {
        FetchedPage::success((0..count).map(|i| item(&format!("body {}", i))).collect())
    }

    fn subject() -> Subject {
        Subject::new("1652587", "Avatar")
    }

    fn fast_options() -> HarvestOptions {
        HarvestOptions {
            delay_min_secs: 0,
            delay_max_secs: 0,
            ..HarvestOptions::default()
        }
    }

    #[tokio::test]
    async fn test_short_page_is_terminal_without_further_fetch() {
        let source = ScriptedSource::new(vec![
            Scripted::Page(full_page(20)),
            Scripted::Page(full_page(5)),
        ]);
        let result =
            harvest_bucket(&source, &subject(), None, &fast_options(), &NullSink).await;

        assert_eq!(result.terminal, Terminal::LastPage);
        assert_eq!(result.records.len(), 25);
        assert_eq!(result.pages_fetched, 2);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_first_page_is_last_page() {
        let source = ScriptedSource::new(vec![]);
        let result =
            harvest_bucket(&source, &subject(), None, &fast_options(), &NullSink).await;

        assert_eq!(result.terminal, Terminal::LastPage);
        assert!(result.records.is_empty());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_last_page() {
        let source = ScriptedSource::new(vec![
            Scripted::Page(full_page(20)),
            Scripted::Page(FetchedPage::transport_error()),
        ]);
        let result =
            harvest_bucket(&source, &subject(), None, &fast_options(), &NullSink).await;

        assert_eq!(result.terminal, Terminal::LastPage);
        assert_eq!(result.records.len(), 20);
    }

    #[tokio::test]
    async fn test_blocked_page_keeps_prior_records() {
        let source = ScriptedSource::new(vec![
            Scripted::Page(full_page(20)),
            Scripted::Page(FetchedPage::blocked()),
        ]);
        let result =
            harvest_bucket(&source, &subject(), None, &fast_options(), &NullSink).await;

        assert_eq!(result.terminal, Terminal::Blocked);
        assert_eq!(result.records.len(), 20);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_max_pages_ceiling() {
        let source = ScriptedSource::new(vec![
            Scripted::Page(full_page(20)),
            Scripted::Page(full_page(20)),
            Scripted::Page(full_page(20)),
            Scripted::Page(full_page(20)),
        ]);
        let options = HarvestOptions {
            max_pages: 3,
            ..fast_options()
        };
        let result = harvest_bucket(&source, &subject(), None, &options, &NullSink).await;

        assert_eq!(result.terminal, Terminal::MaxPagesReached);
        assert_eq!(result.records.len(), 60);
        assert_eq!(result.pages_fetched, 3);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_drops_do_not_count_toward_page_size() {
        // 20 raw items, half with empty bodies: the page is still full,
        // so pagination continues to the short second page.
        let mut items: Vec<ItemNode> = (0..10).map(|i| item(&format!("kept {}", i))).collect();
        items.extend((0..10).map(|_| item("")));
        let source = ScriptedSource::new(vec![
            Scripted::Page(FetchedPage::success(items)),
            Scripted::Page(full_page(3)),
        ]);
        let result =
            harvest_bucket(&source, &subject(), None, &fast_options(), &NullSink).await;

        assert_eq!(result.terminal, Terminal::LastPage);
        assert_eq!(result.records.len(), 13);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_skipped_items_still_count_as_raw() {
        // A page that presented 20 items but only yielded 12 nodes (the
        // rest failed expansion) is not short.
        let nodes = (0..12).map(|i| item(&format!("body {}", i))).collect();
        let source = ScriptedSource::new(vec![
            Scripted::Page(FetchedPage::success_with_raw_count(nodes, 20)),
            Scripted::Page(full_page(1)),
        ]);
        let result =
            harvest_bucket(&source, &subject(), None, &fast_options(), &NullSink).await;

        assert_eq!(result.terminal, Terminal::LastPage);
        assert_eq!(result.records.len(), 13);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_adapter_fault_keeps_records() {
        let source = ScriptedSource::new(vec![
            Scripted::Page(full_page(20)),
            Scripted::Fail,
        ]);
        let result =
            harvest_bucket(&source, &subject(), None, &fast_options(), &NullSink).await;

        assert_eq!(result.terminal, Terminal::LastPage);
        assert_eq!(result.records.len(), 20);
    }

    #[test]
    fn test_draw_delay_degenerate_range() {
        assert_eq!(draw_delay(5, 5), Duration::from_secs(5));
        assert_eq!(draw_delay(0, 0), Duration::ZERO);
    }

    #[test]
    fn test_draw_delay_within_range() {
        for _ in 0..50 {
            let delay = draw_delay(5, 10);
            assert!(delay >= Duration::from_secs(5));
            assert!(delay <= Duration::from_secs(10));
        }
    }
}

//! Field extraction over normalized item nodes.
//!
//! Each field resolves through an ordered list of pure strategies; the
//! first non-empty result wins. Strategies only ever look at the
//! `ItemNode`, so all of them can be exercised with synthetic nodes.

use review_harvest_models::{ItemLink, ItemNode, ReviewRecord, Subject};

/// Class token some layouts put on author links.
const AUTHOR_MARKER_CLASS: &str = "u";
/// Profile URLs carry this path segment.
const PROFILE_PATH_MARKER: &str = "/people/";

/// Per-source extraction rules.
#[derive(Debug, Clone)]
pub struct ExtractRules {
    /// Class-name prefix of the star-count indicator, e.g. `allstar`.
    pub star_class_prefix: &'static str,
    /// Per-star increment of the indicator suffix: suffix 40 with
    /// increment 10 resolves to 4 stars.
    pub star_increment: u32,
    /// Inclusive (min, max) rating range the source considers valid.
    pub rating_range: (u8, u8),
    /// Template reconstructing a review URL from the item id; `{id}` is
    /// substituted. None when the source has no per-item URLs.
    pub url_template: Option<&'static str>,
}

/// Everything extraction needs beyond the node itself.
pub struct ExtractContext<'a> {
    pub subject: &'a Subject,
    /// Rating partition being iterated. Sources without a per-item
    /// indicator in the DOM take the rating from here instead.
    pub bucket: Option<u8>,
    pub rules: &'a ExtractRules,
}

/// Ordered author strategies; first non-empty result wins.
const AUTHOR_STRATEGIES: &[fn(&ItemNode) -> Option<String>] = &[
    author_from_info_region,
    author_from_any_profile_link,
    author_from_marker_class,
];

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn is_profile_link(link: &ItemLink) -> bool {
    link.href.contains(PROFILE_PATH_MARKER)
}

fn author_from_info_region(item: &ItemNode) -> Option<String> {
    item.info_links
        .iter()
        .filter(|link| is_profile_link(link))
        .find_map(|link| non_empty(&link.text))
}

fn author_from_any_profile_link(item: &ItemNode) -> Option<String> {
    item.links
        .iter()
        .filter(|link| is_profile_link(link))
        .find_map(|link| non_empty(&link.text))
}

fn author_from_marker_class(item: &ItemNode) -> Option<String> {
    item.links
        .iter()
        .filter(|link| link.classes.iter().any(|class| class == AUTHOR_MARKER_CLASS))
        .find_map(|link| non_empty(&link.text))
}

pub fn resolve_author(item: &ItemNode) -> String {
    AUTHOR_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(item))
        .unwrap_or_default()
}

/// Star-count suffix of the first rating indicator class token matching
/// the prefix, e.g. `allstar40` -> 40.
fn star_class_suffix(item: &ItemNode, prefix: &str) -> Option<u32> {
    item.rating_classes.iter().find_map(|class| {
        class
            .strip_prefix(prefix)
            .and_then(|suffix| suffix.parse::<u32>().ok())
    })
}

/// Resolve the rating: the DOM indicator divided by the per-star
/// increment when it lands inside the valid range, else the request
/// bucket, else absent. Never zero-filled.
pub fn resolve_rating(item: &ItemNode, ctx: &ExtractContext) -> Option<u8> {
    let (min, max) = ctx.rules.rating_range;
    star_class_suffix(item, ctx.rules.star_class_prefix)
        .map(|suffix| suffix / ctx.rules.star_increment)
        .and_then(|stars| u8::try_from(stars).ok())
        .filter(|stars| (min..=max).contains(stars))
        .or(ctx.bucket)
}

/// Join non-empty paragraphs in document order, falling back to the
/// content region's full text. None means the item produces no record.
pub fn resolve_body(item: &ItemNode) -> Option<String> {
    let joined = item
        .paragraphs
        .iter()
        .filter_map(|paragraph| non_empty(paragraph))
        .collect::<Vec<_>>()
        .join("\n");
    if !joined.is_empty() {
        return Some(joined);
    }
    non_empty(&item.content_text)
}

/// The time label's display text, verbatim. Sources disagree on formats,
/// so no date parsing is attempted.
pub fn resolve_timestamp(item: &ItemNode) -> String {
    item.time_label
        .as_deref()
        .and_then(non_empty)
        .unwrap_or_default()
}

pub fn resolve_url(item: &ItemNode, ctx: &ExtractContext) -> Option<String> {
    if let Some(url) = item.content_url.as_deref().and_then(non_empty) {
        return Some(url);
    }
    let template = ctx.rules.url_template?;
    let id = non_empty(&item.item_id)?;
    Some(template.replace("{id}", &id))
}

/// Build a record from one raw item, or None for the single unconditional
/// drop rule: a body that stays empty after every fallback.
pub fn extract(item: &ItemNode, ctx: &ExtractContext) -> Option<ReviewRecord> {
    let body = resolve_body(item)?;
    Some(ReviewRecord {
        subject_id: ctx.subject.id.clone(),
        subject_title: ctx.subject.title.clone(),
        author: resolve_author(item),
        rating: resolve_rating(item, ctx),
        timestamp: resolve_timestamp(item),
        body,
        url: resolve_url(item, ctx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: ExtractRules = ExtractRules {
        star_class_prefix: "allstar",
        star_increment: 10,
        rating_range: (0, 5),
        url_template: Some("https://example.com/review/{id}/"),
    };

    fn subject() -> Subject {
        Subject::new("1652587", "Avatar")
    }

    fn context<'a>(subject: &'a Subject, bucket: Option<u8>) -> ExtractContext<'a> {
        ExtractContext {
            subject,
            bucket,
            rules: &RULES,
        }
    }

    fn profile_link(text: &str) -> ItemLink {
        ItemLink {
            href: "https://www.douban.com/people/someone/".to_string(),
            text: text.to_string(),
            classes: Vec::new(),
        }
    }

    fn plain_link(text: &str) -> ItemLink {
        ItemLink {
            href: "https://example.com/elsewhere".to_string(),
            text: text.to_string(),
            classes: Vec::new(),
        }
    }

    #[test]
    fn test_author_prefers_info_region() {
        let mut item = ItemNode::with_id("r1");
        item.info_links = vec![profile_link("info author")];
        item.links = vec![profile_link("other author")];
        assert_eq!(resolve_author(&item), "info author");
    }

    #[test]
    fn test_author_falls_back_to_any_profile_link() {
        let mut item = ItemNode::with_id("r1");
        item.info_links = vec![plain_link("not a profile")];
        item.links = vec![plain_link("nope"), profile_link("  deep author  ")];
        assert_eq!(resolve_author(&item), "deep author");
    }

    #[test]
    fn test_author_falls_back_to_marker_class() {
        let mut item = ItemNode::with_id("r1");
        item.links = vec![ItemLink {
            href: "/u/12345".to_string(),
            text: "classy author".to_string(),
            classes: vec!["u".to_string()],
        }];
        assert_eq!(resolve_author(&item), "classy author");
    }

    #[test]
    fn test_author_unrecoverable_is_empty() {
        let item = ItemNode::with_id("r1");
        assert_eq!(resolve_author(&item), "");
    }

    #[test]
    fn test_rating_from_class_suffix() {
        let subject = subject();
        let mut item = ItemNode::with_id("r1");
        item.rating_classes = vec!["allstar40".to_string(), "rating".to_string()];
        assert_eq!(resolve_rating(&item, &context(&subject, None)), Some(4));
    }

    #[test]
    fn test_rating_absent_without_indicator() {
        let subject = subject();
        let item = ItemNode::with_id("r1");
        assert_eq!(resolve_rating(&item, &context(&subject, None)), None);
    }

    #[test]
    fn test_rating_falls_back_to_bucket() {
        let subject = subject();
        let item = ItemNode::with_id("r1");
        assert_eq!(resolve_rating(&item, &context(&subject, Some(2))), Some(2));
    }

    #[test]
    fn test_rating_out_of_range_falls_back_to_bucket() {
        let subject = subject();
        let mut item = ItemNode::with_id("r1");
        item.rating_classes = vec!["allstar90".to_string()];
        assert_eq!(resolve_rating(&item, &context(&subject, Some(1))), Some(1));
    }

    #[test]
    fn test_rating_ignores_non_numeric_suffix() {
        let subject = subject();
        let mut item = ItemNode::with_id("r1");
        item.rating_classes = vec!["allstar".to_string()];
        assert_eq!(resolve_rating(&item, &context(&subject, None)), None);
    }

    #[test]
    fn test_body_joins_paragraphs_in_order() {
        let mut item = ItemNode::with_id("r1");
        item.paragraphs = vec![
            "first".to_string(),
            "   ".to_string(),
            "second".to_string(),
        ];
        assert_eq!(resolve_body(&item), Some("first\nsecond".to_string()));
    }

    #[test]
    fn test_body_falls_back_to_content_text() {
        let mut item = ItemNode::with_id("r1");
        item.content_text = "  whole region text  ".to_string();
        assert_eq!(resolve_body(&item), Some("whole region text".to_string()));
    }

    #[test]
    fn test_empty_body_drops_item() {
        let subject = subject();
        let mut item = ItemNode::with_id("r1");
        item.paragraphs = vec!["   ".to_string()];
        item.content_text = " ".to_string();
        assert!(extract(&item, &context(&subject, None)).is_none());
    }

    #[test]
    fn test_url_prefers_content_attribute() {
        let subject = subject();
        let mut item = ItemNode::with_id("r1");
        item.content_url = Some("https://example.com/review/999/".to_string());
        assert_eq!(
            resolve_url(&item, &context(&subject, None)),
            Some("https://example.com/review/999/".to_string())
        );
    }

    #[test]
    fn test_url_synthesized_from_item_id() {
        let subject = subject();
        let item = ItemNode::with_id("12345");
        assert_eq!(
            resolve_url(&item, &context(&subject, None)),
            Some("https://example.com/review/12345/".to_string())
        );
    }

    #[test]
    fn test_url_absent_without_id_or_attribute() {
        let subject = subject();
        let item = ItemNode::with_id("");
        assert_eq!(resolve_url(&item, &context(&subject, None)), None);
    }

    #[test]
    fn test_extract_builds_full_record() {
        let subject = subject();
        let mut item = ItemNode::with_id("7");
        item.info_links = vec![profile_link("reviewer")];
        item.rating_classes = vec!["allstar30".to_string()];
        item.paragraphs = vec!["part one".to_string(), "part two".to_string()];
        item.time_label = Some(" 2023-05-01 12:00:00 ".to_string());

        let record = extract(&item, &context(&subject, None)).unwrap();
        assert_eq!(record.subject_id, "1652587");
        assert_eq!(record.subject_title, "Avatar");
        assert_eq!(record.author, "reviewer");
        assert_eq!(record.rating, Some(3));
        assert_eq!(record.timestamp, "2023-05-01 12:00:00");
        assert_eq!(record.body, "part one\npart two");
        assert_eq!(record.url, Some("https://example.com/review/7/".to_string()));
    }

    #[test]
    fn test_extract_is_idempotent() {
        let subject = subject();
        let mut item = ItemNode::with_id("7");
        item.info_links = vec![profile_link("reviewer")];
        item.rating_classes = vec!["allstar50".to_string()];
        item.paragraphs = vec!["body".to_string()];

        let ctx = context(&subject, None);
        let first = extract(&item, &ctx).unwrap();
        let second = extract(&item, &ctx).unwrap();
        assert_eq!(first, second);
    }
}

use crate::item::ItemNode;
use serde::{Deserialize, Serialize};

/// Classification of a single page fetch.
///
/// Request-level failures are classified here rather than surfaced as
/// errors: the pagination controller decides what each status means for
/// the page sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PageStatus {
    /// Page rendered and yielded review items.
    Success,
    /// The defense detector recognized an anti-automation challenge.
    Blocked,
    /// Page loaded but contained no review items.
    Empty,
    /// Non-2xx response, timeout, or navigation failure. Indistinguishable
    /// from true end-of-data; the controller treats it as such.
    TransportError,
}

/// Result of fetching one page for a (subject, bucket, offset) triple.
///
/// Transient: owned by the adapter during the fetch, consumed by the
/// pagination controller, never persisted. `raw_item_count` is the number
/// of item nodes the page presented; items an adapter had to skip (failed
/// content expansion) are missing from `items` but still counted, since
/// termination decisions compare the raw count against the page size.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: PageStatus,
    pub items: Vec<ItemNode>,
    pub raw_item_count: usize,
}

impl FetchedPage {
    /// A successful page where every presented item was read.
    pub fn success(items: Vec<ItemNode>) -> Self {
        let raw_item_count = items.len();
        Self::success_with_raw_count(items, raw_item_count)
    }

    /// A successful page where some presented items could not be read.
    pub fn success_with_raw_count(items: Vec<ItemNode>, raw_item_count: usize) -> Self {
        if raw_item_count == 0 {
            Self::empty()
        } else {
            Self {
                status: PageStatus::Success,
                items,
                raw_item_count,
            }
        }
    }

    pub fn blocked() -> Self {
        Self {
            status: PageStatus::Blocked,
            items: Vec::new(),
            raw_item_count: 0,
        }
    }

    pub fn empty() -> Self {
        Self {
            status: PageStatus::Empty,
            items: Vec::new(),
            raw_item_count: 0,
        }
    }

    pub fn transport_error() -> Self {
        Self {
            status: PageStatus::TransportError,
            items: Vec::new(),
            raw_item_count: 0,
        }
    }
}

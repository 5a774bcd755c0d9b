use async_trait::async_trait;
use review_harvest_models::{FetchedPage, Subject};

use crate::error::SourceError;
use crate::extract::ExtractRules;

/// Contract every review source implements.
///
/// The pagination controller drives any source through this interface;
/// the source decides how a page is obtained (a plain HTTP fetch, a
/// rendered browser page) and flattens its items into `ItemNode`s.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    fn source_name(&self) -> &str;

    /// Number of items a non-final page is expected to return.
    fn page_size(&self) -> u32;

    /// Rating partitions to iterate, in order. Sources with mixed-rating
    /// listings return `[None]`.
    fn rating_buckets(&self) -> Vec<Option<u8>>;

    /// Field extraction rules for items produced by this source.
    fn extract_rules(&self) -> &ExtractRules;

    /// Fetch one page for the subject. `offset` is a non-negative
    /// multiple of `page_size`; `bucket` is `Some` only for
    /// rating-partitioned sources.
    ///
    /// Non-2xx responses, timeouts and navigation failures come back as
    /// `PageStatus::TransportError`; a recognized challenge page as
    /// `PageStatus::Blocked`. `Err` means the adapter is unusable.
    async fn fetch_page(
        &self,
        subject: &Subject,
        bucket: Option<u8>,
        offset: u32,
    ) -> Result<FetchedPage, SourceError>;

    /// Release external resources. Called once when the harvest run ends,
    /// regardless of outcome.
    async fn shutdown(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

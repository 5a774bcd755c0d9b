use serde::{Deserialize, Serialize};

/// One harvested review or short comment, normalized across sources.
///
/// Records are constructed once by the field extractor and never mutated
/// afterwards; the pagination controller owns them until the subject is
/// flushed to persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewRecord {
    /// Opaque platform id of the media item this review belongs to.
    pub subject_id: String,
    /// Human-readable label for the subject, from configuration.
    pub subject_title: String,
    /// Reviewer display name; empty when no strategy could recover it.
    pub author: String,
    /// Star rating. None when the source exposes no usable indicator --
    /// never coerced to zero. Serializes to an empty CSV field.
    pub rating: Option<u8>,
    /// Source-provided display string, kept verbatim. Formats vary per
    /// source, so no date parsing is attempted.
    pub timestamp: String,
    /// Review body. Invariant: never empty -- empty-body items are dropped
    /// during extraction instead of producing a record.
    pub body: String,
    /// Canonical or reconstructed link to the original review.
    pub url: Option<String>,
}

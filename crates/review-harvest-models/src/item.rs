use serde::{Deserialize, Serialize};

/// A link found inside a review item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemLink {
    pub href: String,
    pub text: String,
    pub classes: Vec<String>,
}

/// Source-agnostic projection of one raw review/comment DOM node.
///
/// Both adapters flatten their native representation (a parsed HTML
/// fragment for the static feed, live element handles for the rendered
/// feed) into this shape before extraction, so every field strategy is a
/// pure function that can be exercised with synthetic nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemNode {
    /// The item's own identifier (DOM id or data attribute), used to
    /// reconstruct a review URL when the source omits one.
    pub item_id: String,
    /// Links within the designated reviewer-info region.
    pub info_links: Vec<ItemLink>,
    /// Every link anywhere in the item.
    pub links: Vec<ItemLink>,
    /// Class attribute values of rating indicator elements, e.g.
    /// `["allstar40", "rating"]`.
    pub rating_classes: Vec<String>,
    /// Non-empty paragraph texts of the content region, in document order.
    pub paragraphs: Vec<String>,
    /// Full text of the content region; fallback when no paragraphs exist.
    pub content_text: String,
    /// Designated data attribute on the content node, when present.
    pub content_url: Option<String>,
    /// Display text of the time-label node, when present.
    pub time_label: Option<String>,
}

impl ItemNode {
    pub fn with_id(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            ..Default::default()
        }
    }
}

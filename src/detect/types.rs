//! Item descriptors and detection results

use serde::{Deserialize, Serialize};

use crate::dom::NodeId;
use crate::extract::{extract, strip_price_prefix};

use super::PageShape;

/// One purchasable item found on the page
///
/// Only built once a price was extracted, so it is never partially valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDescriptor {
    /// Display name with the leading price token stripped
    pub title: String,
    /// Native price
    pub price: f64,
    pub vendor_name: String,
    /// Absolute URL or inline image, empty if undetectable
    pub thumbnail_ref: String,
    pub canonical_url: String,
    /// Marketplace link from the detail subtitle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_link_ref: Option<String>,
}

impl ItemDescriptor {
    /// Build a descriptor from raw listing text, `None` when no price is found
    pub fn from_text(
        raw_title: &str,
        vendor_name: &str,
        thumbnail_ref: String,
        canonical_url: String,
    ) -> Option<Self> {
        let price = extract(raw_title)?;
        Some(Self {
            title: strip_price_prefix(raw_title),
            price,
            vendor_name: vendor_name.to_string(),
            thumbnail_ref,
            canonical_url,
            source_link_ref: None,
        })
    }
}

/// Control size, chosen per page shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeVariant {
    /// Grid card
    Compact,
    /// Index row
    Inline,
    /// Detail purchase bar
    Bar,
    /// Lightbox
    Overlay,
}

impl SizeVariant {
    /// CSS class carried by controls of this size
    pub fn class_name(self) -> &'static str {
        match self {
            SizeVariant::Compact => "pa-compact",
            SizeVariant::Inline => "pa-inline",
            SizeVariant::Bar => "pa-bar",
            SizeVariant::Overlay => "pa-overlay",
        }
    }
}

/// An element eligible for a control, with its descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub shape: PageShape,
    pub element: NodeId,
    pub descriptor: ItemDescriptor,
}

/// Inputs a detector needs beyond the document
#[derive(Debug, Clone, Copy)]
pub struct DetectContext<'a> {
    /// Smallest inline image accepted as a thumbnail
    pub min_inline_image_bytes: usize,
    /// Last detail-page descriptor, reused by the overlay shape
    pub cached_detail: Option<&'a ItemDescriptor>,
}

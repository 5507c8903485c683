//! # Page-shape detection
//!
//! Locates elements that should carry a purchase control and derives an
//! `ItemDescriptor` for each. Four shapes are supported:
//!
//! - **Listing**: grid cards, scoped to the scanned subtree
//! - **IndexGrid**: index rows (one anchor per item), scoped
//! - **Detail**: the single-item header, page-level singleton
//! - **Overlay**: the lightbox panel, reusing the cached detail descriptor
//!
//! Detection only reads the document. Marked elements are skipped and a
//! candidate without a price is never returned.
//!
//! ## Module structure
//! - `selectors`: host markup selectors and the injection marker
//! - `types`: `ItemDescriptor`, `Detection`, `SizeVariant`, `DetectContext`
//! - `listing`, `detail`, `overlay`: the per-shape recognizers

pub mod selectors;
pub mod types;
mod listing;
mod detail;
pub mod overlay;


use crate::dom::{Document, NodeId};
use crate::extract::vendor_from_host;

pub use selectors::{is_engine_owned, is_marked, INJECTION_MARKER};
pub use types::{DetectContext, Detection, ItemDescriptor, SizeVariant};

/// Supported page shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageShape {
    Listing,
    IndexGrid,
    Detail,
    Overlay,
}

impl PageShape {
    /// Every shape, in flush order; detail runs before overlay so the cache is fresh
    pub const ALL: [PageShape; 4] = [
        PageShape::Listing,
        PageShape::IndexGrid,
        PageShape::Detail,
        PageShape::Overlay,
    ];

    /// Shapes that only look at the dirty subtree they are given
    pub const SCOPED: [PageShape; 2] = [PageShape::Listing, PageShape::IndexGrid];

    /// Shapes evaluated against page-level singletons on every flush
    pub const UNSCOPED: [PageShape; 2] = [PageShape::Detail, PageShape::Overlay];

    /// Whether detection honors the scan root
    pub fn is_root_scoped(self) -> bool {
        matches!(self, PageShape::Listing | PageShape::IndexGrid)
    }

    /// Control size for this shape
    pub fn variant(self) -> SizeVariant {
        match self {
            PageShape::Listing => SizeVariant::Compact,
            PageShape::IndexGrid => SizeVariant::Inline,
            PageShape::Detail => SizeVariant::Bar,
            PageShape::Overlay => SizeVariant::Overlay,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PageShape::Listing => "listing",
            PageShape::IndexGrid => "index",
            PageShape::Detail => "detail",
            PageShape::Overlay => "overlay",
        }
    }

    /// Find eligible elements; unscoped shapes ignore `root`
    pub fn detect(self, doc: &Document, root: NodeId, ctx: &DetectContext<'_>) -> Vec<Detection> {
        match self {
            PageShape::Listing => listing::detect_cards(doc, root, ctx),
            PageShape::IndexGrid => listing::detect_index_rows(doc, root, ctx),
            PageShape::Detail => detail::detect_detail(doc, ctx),
            PageShape::Overlay => overlay::detect_overlay(doc, ctx),
        }
    }
}

/// Vendor name from the store header, else from the host name
pub fn vendor_name(doc: &Document) -> String {
    doc.query(doc.document_node(), &selectors::VENDOR_NAME)
        .map(|node| doc.text_content(node))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| vendor_from_host(doc.url()))
}

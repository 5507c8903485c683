//! Lightbox overlay detection
//!
//! Overlay text does not reliably carry price, title or vendor, so the
//! overlay reuses the cached detail descriptor and only swaps in the image
//! currently shown.

use crate::dom::{Document, NodeId};
use crate::extract::resolve_thumbnail;

use super::selectors::{is_marked, overlay};
use super::types::{DetectContext, Detection};
use super::PageShape;

pub(crate) fn detect_overlay(doc: &Document, ctx: &DetectContext<'_>) -> Vec<Detection> {
    let Some(cached) = ctx.cached_detail else {
        return Vec::new();
    };
    let Some(panel) = find_panel(doc) else {
        return Vec::new();
    };
    if doc.is_hidden(panel) || is_marked(doc, panel) {
        return Vec::new();
    }

    let mut descriptor = cached.clone();
    let thumbnail = visible_thumbnail(doc, panel, ctx.min_inline_image_bytes);
    if !thumbnail.is_empty() {
        descriptor.thumbnail_ref = thumbnail;
    }

    vec![Detection {
        shape: PageShape::Overlay,
        element: panel,
        descriptor,
    }]
}

/// The overlay panel, if the host has created it
pub fn find_panel(doc: &Document) -> Option<NodeId> {
    doc.query(doc.document_node(), &overlay::PANEL)
}

/// Reference of the first visible image in the panel, or empty
pub fn visible_thumbnail(doc: &Document, panel: NodeId, min_inline_bytes: usize) -> String {
    doc.query_all(panel, &overlay::IMAGE)
        .into_iter()
        .filter(|&img| !doc.is_hidden(img))
        .map(|img| resolve_thumbnail(doc, img, min_inline_bytes))
        .find(|reference| !reference.is_empty())
        .unwrap_or_default()
}

/// Whether the host has locked page scrolling
pub fn is_scroll_locked(doc: &Document) -> bool {
    let body = doc.body();
    doc.has_class(body, overlay::SCROLL_LOCK_CLASS)
        || doc
            .style_property(body, "overflow")
            .is_some_and(|d| d.value == "hidden")
}

/// Visible when scrolling is locked or the panel exists and is not hidden
pub fn is_overlay_visible(doc: &Document) -> bool {
    is_scroll_locked(doc) || find_panel(doc).is_some_and(|panel| !doc.is_hidden(panel))
}

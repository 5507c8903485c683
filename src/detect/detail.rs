//! Single-item detail page detection
//!
//! The detail header is a page-level singleton, so this shape ignores the
//! scan root and runs at most once per navigation: a purchase bar anywhere
//! in the document means the page was already handled.

use tracing::debug;

use crate::dom::Document;
use crate::extract::{resolve_thumbnail, unwrap_redirect};

use super::selectors::{controls, detail, is_marked};
use super::types::{DetectContext, Detection, ItemDescriptor};
use super::{vendor_name, PageShape};

pub(crate) fn detect_detail(doc: &Document, ctx: &DetectContext<'_>) -> Vec<Detection> {
    let root = doc.document_node();
    if doc.query(root, &controls::PURCHASE_BAR).is_some() {
        return Vec::new();
    }
    let Some(header) = doc.query(root, &detail::HEADER) else {
        return Vec::new();
    };
    if is_marked(doc, header) {
        return Vec::new();
    }

    let raw_title = doc
        .query(header, &detail::TITLE)
        .map(|h1| doc.text_content(h1))
        .filter(|t| !t.is_empty())
        .or_else(|| doc.attribute(header, "title").map(str::to_string))
        .unwrap_or_default();

    let thumbnail = doc
        .query(root, &detail::IMAGE)
        .map(|img| resolve_thumbnail(doc, img, ctx.min_inline_image_bytes))
        .unwrap_or_default();

    let Some(mut descriptor) = ItemDescriptor::from_text(
        &raw_title,
        &vendor_name(doc),
        thumbnail,
        doc.url().to_string(),
    ) else {
        debug!("Detail header has no price: {:?}", raw_title);
        return Vec::new();
    };

    descriptor.source_link_ref = doc
        .query(root, &detail::SOURCE_LINK)
        .and_then(|link| doc.attribute(link, "href"))
        .map(|href| unwrap_redirect(href.trim()))
        .filter(|href| !href.is_empty());

    vec![Detection {
        shape: PageShape::Detail,
        element: header,
        descriptor,
    }]
}

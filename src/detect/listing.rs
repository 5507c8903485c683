//! Grid card and index row detection
//!
//! Both shapes are scoped: they only look at the subtree they are given.

use tracing::trace;

use crate::dom::{Document, NodeId};
use crate::extract::{resolve, resolve_thumbnail};

use super::selectors::{index, is_marked, listing};
use super::types::{DetectContext, Detection, ItemDescriptor};
use super::{vendor_name, PageShape};

/// Grid cards under `root`, `root` included
pub(crate) fn detect_cards(doc: &Document, root: NodeId, ctx: &DetectContext<'_>) -> Vec<Detection> {
    let cards = doc.query_all(root, &listing::CARD);
    if cards.is_empty() {
        return Vec::new();
    }

    let vendor = vendor_name(doc);
    cards
        .into_iter()
        .filter(|&card| !is_marked(doc, card))
        .filter_map(|card| {
            let raw_title = card_title(doc, card)?;
            let thumbnail = doc
                .query(card, &listing::IMAGE)
                .map(|img| resolve_thumbnail(doc, img, ctx.min_inline_image_bytes))
                .unwrap_or_default();
            let canonical = doc
                .query(card, &listing::LINK)
                .and_then(|link| doc.attribute(link, "href"))
                .map(|href| resolve(doc.url(), href))
                .unwrap_or_else(|| doc.url().to_string());

            let Some(descriptor) = ItemDescriptor::from_text(&raw_title, &vendor, thumbnail, canonical)
            else {
                trace!("No price in card {}: {:?}", card, raw_title);
                return None;
            };
            Some(Detection {
                shape: PageShape::Listing,
                element: card,
                descriptor,
            })
        })
        .collect()
}

/// Index rows under `root`, `root` included
pub(crate) fn detect_index_rows(
    doc: &Document,
    root: NodeId,
    ctx: &DetectContext<'_>,
) -> Vec<Detection> {
    let anchors = doc.query_all(root, &index::ANCHOR);
    if anchors.is_empty() {
        return Vec::new();
    }

    let vendor = vendor_name(doc);
    anchors
        .into_iter()
        .filter(|&anchor| !is_marked(doc, anchor))
        .filter_map(|anchor| {
            let raw_title = non_empty(doc.text_content(anchor))
                .or_else(|| doc.attribute(anchor, "title").map(str::to_string).and_then(non_empty))?;
            let thumbnail = doc
                .query(anchor, &index::IMAGE)
                .map(|img| resolve_thumbnail(doc, img, ctx.min_inline_image_bytes))
                .unwrap_or_default();
            let canonical = doc
                .attribute(anchor, "href")
                .map(|href| resolve(doc.url(), href))
                .unwrap_or_else(|| doc.url().to_string());

            let descriptor = ItemDescriptor::from_text(&raw_title, &vendor, thumbnail, canonical)?;
            Some(Detection {
                shape: PageShape::IndexGrid,
                element: anchor,
                descriptor,
            })
        })
        .collect()
}

/// Title element text, then the card's `title` attribute, then all card text
fn card_title(doc: &Document, card: NodeId) -> Option<String> {
    doc.query(card, &listing::TITLE)
        .map(|title| doc.text_content(title))
        .and_then(non_empty)
        .or_else(|| doc.attribute(card, "title").map(str::to_string).and_then(non_empty))
        .or_else(|| non_empty(doc.text_content(card)))
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

//! Common test utilities
//!
//! Page fixtures and engine setup shared by the integration tests.

#![allow(dead_code)]

use listing_augmenter::{
    config::Config,
    detect::selectors::controls,
    dom::{el, shared, Document, NodeId, Selector, SharedDocument},
    runtime::{mock::MockInliner, mock::MockRuntimeChannel, RuntimeBridge},
    Engine, EngineHandle,
};
use std::sync::Arc;
use std::time::Duration;

pub const LISTING_URL: &str = "https://acme.shop.example.com/category/phones";
pub const DETAIL_URL: &str = "https://acme.shop.example.com/item/42";

/// Append one grid card
pub fn add_card(doc: &mut Document, parent: NodeId, title: &str, id: usize) -> NodeId {
    el("div")
        .class("grid-item")
        .child(
            el("a")
                .attr("href", &format!("/item/{}", id))
                .child(el("img").attr("data-src", &format!("https://img.example.com/{}.jpg", id))),
        )
        .child(el("div").class("item-title").text(title))
        .append_to(doc, parent)
}

/// Append one index row
pub fn add_index_row(doc: &mut Document, parent: NodeId, title: &str, id: usize) -> NodeId {
    el("a")
        .class("index-item")
        .attr("href", &format!("/item/{}", id))
        .text(title)
        .append_to(doc, parent)
}

/// Listing page with an empty grid under a store header
pub fn listing_page() -> (Document, NodeId) {
    let mut doc = Document::new(LISTING_URL);
    let body = doc.body();
    el("div")
        .class("store-header")
        .child(el("span").class("store-name").text("Acme Finds"))
        .append_to(&mut doc, body);
    let grid = el("div").class("grid").append_to(&mut doc, body);
    (doc, grid)
}

/// Detail page with a hidden lightbox panel
pub fn detail_page(title: &str) -> (Document, NodeId) {
    let mut doc = Document::new(DETAIL_URL);
    let body = doc.body();
    el("div")
        .class("detail-header")
        .child(el("h1").text(title))
        .append_to(&mut doc, body);
    el("div")
        .class("detail-subtitle")
        .child(el("a").attr(
            "href",
            "https://agent.example.com/external?url=https%253A%252F%252Fweidian.com%252Fitem",
        ))
        .append_to(&mut doc, body);
    el("div")
        .class("detail-gallery")
        .child(el("img").attr("src", "https://img.example.com/detail.jpg"))
        .append_to(&mut doc, body);
    let panel = el("div")
        .class("lightbox-panel")
        .attr("style", "display: none")
        .child(el("img").attr("src", "https://img.example.com/full.jpg"))
        .append_to(&mut doc, body);
    (doc, panel)
}

/// Running engine with its mock channel
pub struct Harness {
    pub doc: SharedDocument,
    pub channel: Arc<MockRuntimeChannel>,
    pub handle: EngineHandle,
}

/// Start an engine on `doc` with default configuration
pub fn start(doc: Document) -> Harness {
    let doc = shared(doc);
    let channel = Arc::new(MockRuntimeChannel::new());
    let handle = Engine::new(
        doc.clone(),
        Arc::new(RuntimeBridge::new(channel.clone())),
        Arc::new(MockInliner::new()),
        Config::default(),
    )
    .expect("default config is valid")
    .start();
    Harness { doc, channel, handle }
}

/// Let the paused clock run forward
pub async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Matches for `selector` anywhere in the document
pub async fn count(doc: &SharedDocument, selector: &Selector) -> usize {
    let doc = doc.read().await;
    doc.query_all(doc.document_node(), selector).len()
}

/// Number of injected controls
pub async fn controls(doc: &SharedDocument) -> usize {
    count(doc, &controls::CONTROL).await
}

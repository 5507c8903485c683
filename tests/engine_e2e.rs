//! End-to-end engine tests
//!
//! Drive a host page through typical sessions (infinite scroll, lightbox,
//! purchase) and check the augmented document.

mod common;

use common::*;
use listing_augmenter::detect::selectors::controls;
use listing_augmenter::inject::{button_state, ButtonState};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn test_infinite_scroll_session() {
    let (mut doc, grid) = listing_page();
    for (i, title) in ["160Y iPhone case", "¥99.50 headphones", "Mystery box"].iter().enumerate() {
        add_card(&mut doc, grid, title, i);
    }
    let h = start(doc);
    settle(10).await;
    assert_eq!(controls(&h.doc).await, 2);

    // Three scroll pages, each arriving inside the debounce window of the last
    for page in 1..=3 {
        {
            let mut doc = h.doc.write().await;
            for i in 0..5 {
                add_card(&mut doc, grid, &format!("P{} sneakers", 100 + i), page * 10 + i);
            }
        }
        settle(100).await;
    }
    settle(300).await;
    assert_eq!(controls(&h.doc).await, 17);

    // Every priced card carries exactly one control and the marker
    {
        let doc = h.doc.read().await;
        for card in doc.children(grid).to_vec() {
            let count = doc.query_all(card, &controls::CONTROL).len();
            let marked = doc.has_attribute(card, "data-pa-injected");
            assert!(count <= 1);
            assert_eq!(count == 1, marked);
        }
    }

    let stats = h.handle.stop().await.unwrap();
    assert_eq!(stats.flushes, 2);
    assert_eq!(stats.controls_injected, 17);
}

#[tokio::test(start_paused = true)]
async fn test_large_batch_collapses_to_full_rescan() {
    let (doc, grid) = listing_page();
    let h = start(doc);
    settle(10).await;

    {
        let mut doc = h.doc.write().await;
        for i in 0..100 {
            add_card(&mut doc, grid, &format!("{}Y item", i + 1), i);
        }
    }
    settle(300).await;
    assert_eq!(controls(&h.doc).await, 100);

    let stats = h.handle.stop().await.unwrap();
    assert_eq!(stats.full_rescans, 2);
    assert_eq!(stats.targeted_roots, 0);
}

#[tokio::test(start_paused = true)]
async fn test_index_rows_are_augmented() {
    let (mut doc, _) = listing_page();
    let body = doc.body();
    let list = listing_augmenter::dom::el("div").class("index").append_to(&mut doc, body);
    add_index_row(&mut doc, list, "45 yuan | charging cable", 1);
    add_index_row(&mut doc, list, "cable organizer", 2);
    let h = start(doc);
    settle(10).await;

    assert_eq!(controls(&h.doc).await, 1);
    assert_eq!(
        count(&h.doc, &listing_augmenter::dom::Selector::parse(".pa-inline").unwrap()).await,
        1
    );
    h.handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_detail_lightbox_and_purchase() {
    let (doc, panel) = detail_page("¥99.50 headphones");
    let h = start(doc);
    settle(100).await;
    assert_eq!(count(&h.doc, &controls::PURCHASE_BAR).await, 1);

    // Open the lightbox: the bar is force-hidden and the overlay gets a control
    {
        let mut doc = h.doc.write().await;
        doc.set_attribute(panel, "style", "display: flex");
        let body = doc.body();
        doc.add_class(body, "scroll-locked");
    }
    settle(100).await;
    let (bar, overlay_button) = {
        let doc = h.doc.read().await;
        let bar = doc.query(doc.document_node(), &controls::PURCHASE_BAR).unwrap();
        let decl = doc.style_property(bar, "display").unwrap();
        assert!(decl.important);
        (bar, doc.query(panel, &controls::BUTTON).unwrap())
    };

    h.handle.activate(overlay_button).unwrap();
    settle(10).await;
    assert_eq!(
        button_state(&*h.doc.read().await, overlay_button),
        Some(ButtonState::Added)
    );

    let calls = h.channel.calls().await;
    let (_, payload) = calls.iter().find(|(action, _)| action == "addToCart").unwrap();
    assert_eq!(payload["item"]["price"], 99.5);
    assert_eq!(payload["item"]["canonicalUrl"], DETAIL_URL);
    assert_eq!(payload["item"]["sourceLinkRef"], "https://weidian.com/item");

    // Close it again: the override is lifted
    {
        let mut doc = h.doc.write().await;
        doc.set_attribute(panel, "style", "display: none");
        let body = doc.body();
        doc.remove_class(body, "scroll-locked");
    }
    // Long enough for the added flash to finish as well
    settle(1600).await;
    assert!(h.doc.read().await.style_property(bar, "display").is_none());

    let stats = h.handle.stop().await.unwrap();
    assert_eq!(stats.items_added, 1);
    assert_eq!(stats.controls_injected, 2);
}

#[tokio::test(start_paused = true)]
async fn test_cart_rejection_shows_failure() {
    let (mut doc, grid) = listing_page();
    add_card(&mut doc, grid, "160Y iPhone case", 1);
    let h = start(doc);
    h.channel.respond("addToCart", json!({ "success": false })).await;
    settle(10).await;

    let button = {
        let doc = h.doc.read().await;
        doc.query(doc.document_node(), &controls::BUTTON).unwrap()
    };
    h.handle.activate(button).unwrap();
    settle(10).await;
    assert_eq!(button_state(&*h.doc.read().await, button), Some(ButtonState::Failed));

    settle(1600).await;
    assert_eq!(button_state(&*h.doc.read().await, button), Some(ButtonState::Idle));

    let stats = h.handle.stop().await.unwrap();
    assert_eq!(stats.items_added, 0);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_leaves_page_inert() {
    let (mut doc, grid) = listing_page();
    add_card(&mut doc, grid, "160Y iPhone case", 1);
    let h = start(doc);
    settle(10).await;

    h.channel.fail_with("Extension context invalidated.").await;
    h.handle.config_changed().unwrap();
    settle(10).await;

    assert!(h.handle.is_finished());
    assert_eq!(h.doc.read().await.observer_count(), 0);

    add_card(&mut *h.doc.write().await, grid, "P250 sneakers", 2);
    settle(2000).await;
    assert_eq!(controls(&h.doc).await, 1);

    h.handle.stop().await.unwrap();
}

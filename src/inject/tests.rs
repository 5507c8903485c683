//! Injection and activation tests

use super::*;
use crate::detect::selectors::controls;
use crate::detect::{ItemDescriptor, SizeVariant, INJECTION_MARKER};
use crate::dom::{el, shared, Document, NodeId};
use crate::runtime::mock::{MockInliner, MockRuntimeChannel};
use crate::runtime::{Rate, RuntimeBridge, Settings};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn descriptor() -> ItemDescriptor {
    ItemDescriptor::from_text(
        "160Y iPhone case",
        "acme",
        "https://img.example.com/a.jpg".to_string(),
        "https://acme.shop.example.com/item/1".to_string(),
    )
    .unwrap()
}

fn converting() -> PriceFormatter {
    PriceFormatter::new(
        &Settings {
            target_currency: "USD".to_string(),
            dark_mode_enabled: false,
        },
        Some(&Rate {
            rate: 0.14,
            fetched_at: 0,
        }),
    )
}

fn page_with_card() -> (Document, NodeId) {
    let mut doc = Document::new("https://acme.shop.example.com/");
    let body = doc.body();
    let card = el("div").class("grid-item").text("160Y iPhone case").append_to(&mut doc, body);
    (doc, card)
}

// ============================================================================
// Injection
// ============================================================================

#[test]
fn test_inject_builds_control() {
    let (mut doc, card) = page_with_card();
    let button = inject(&mut doc, card, &descriptor(), SizeVariant::Compact, &converting()).unwrap();

    assert_eq!(doc.attribute(card, INJECTION_MARKER), Some("1"));
    let control = doc.query(card, &controls::CONTROL).unwrap();
    assert!(doc.has_class(control, "pa-compact"));
    assert!(!doc.has_class(control, "pa-purchase-bar"));
    assert!(doc.contains(control, button));

    let price = doc.query(control, &controls::PRICE).unwrap();
    assert_eq!(doc.text_content(price), "¥160.00");
    let converted = doc.query(control, &controls::CONVERTED).unwrap();
    assert_eq!(doc.text_content(converted), "≈ $22.40");
    assert_eq!(button_state(&doc, button), Some(ButtonState::Idle));
    assert_eq!(doc.text_content(button), "Add to cart");
}

#[test]
fn test_inject_is_idempotent() {
    let (mut doc, card) = page_with_card();
    let formatter = PriceFormatter::native_only();

    assert!(inject(&mut doc, card, &descriptor(), SizeVariant::Compact, &formatter).is_some());
    assert!(inject(&mut doc, card, &descriptor(), SizeVariant::Compact, &formatter).is_none());
    assert_eq!(doc.query_all(card, &controls::CONTROL).len(), 1);
}

#[test]
fn test_native_only_has_no_converted_label() {
    let (mut doc, card) = page_with_card();
    inject(&mut doc, card, &descriptor(), SizeVariant::Compact, &PriceFormatter::native_only()).unwrap();
    assert!(doc.query(card, &controls::CONVERTED).is_none());
}

#[test]
fn test_bar_variant_is_purchase_bar() {
    let (mut doc, card) = page_with_card();
    inject(&mut doc, card, &descriptor(), SizeVariant::Bar, &PriceFormatter::native_only()).unwrap();
    assert!(doc.query(doc.document_node(), &controls::PURCHASE_BAR).is_some());
}

#[test]
fn test_refresh_prices() {
    let (mut doc, card) = page_with_card();
    inject(&mut doc, card, &descriptor(), SizeVariant::Compact, &PriceFormatter::native_only()).unwrap();

    assert_eq!(refresh_prices(&mut doc, &converting()), 1);
    let control = doc.query(card, &controls::CONTROL).unwrap();
    let converted = doc.query(control, &controls::CONVERTED).unwrap();
    assert_eq!(doc.text_content(converted), "≈ $22.40");
    // Converted label sits between the price and the button
    assert_eq!(doc.children(control)[1], converted);

    let dark = PriceFormatter::new(
        &Settings {
            target_currency: "CNY".to_string(),
            dark_mode_enabled: true,
        },
        None,
    );
    refresh_prices(&mut doc, &dark);
    assert!(doc.query(control, &controls::CONVERTED).is_none());
    assert!(doc.has_class(control, "pa-dark"));
}

#[test]
fn test_button_states() {
    let (mut doc, card) = page_with_card();
    let button = inject(&mut doc, card, &descriptor(), SizeVariant::Compact, &PriceFormatter::native_only()).unwrap();

    set_button_state(&mut doc, button, ButtonState::Busy);
    assert!(doc.has_attribute(button, "disabled"));
    assert_eq!(doc.text_content(button), "Adding…");

    set_button_state(&mut doc, button, ButtonState::Idle);
    assert!(!doc.has_attribute(button, "disabled"));
}

// ============================================================================
// Activation
// ============================================================================

#[test]
fn test_claim_blocks_reactivation() {
    let (mut doc, card) = page_with_card();
    let button = inject(&mut doc, card, &descriptor(), SizeVariant::Compact, &PriceFormatter::native_only()).unwrap();

    assert!(claim(&mut doc, button));
    assert_eq!(button_state(&doc, button), Some(ButtonState::Busy));
    assert!(!claim(&mut doc, button));

    doc.remove(card);
    set_button_state(&mut doc, button, ButtonState::Idle);
    assert!(!claim(&mut doc, button));
}

async fn activation_fixture(
    channel: Arc<MockRuntimeChannel>,
) -> (ActivationContext, NodeId, Arc<MockInliner>) {
    let (mut doc, card) = page_with_card();
    let button = inject(&mut doc, card, &descriptor(), SizeVariant::Compact, &PriceFormatter::native_only()).unwrap();
    assert!(claim(&mut doc, button));

    let inliner = Arc::new(MockInliner::new());
    let ctx = ActivationContext {
        doc: shared(doc),
        collaborators: Arc::new(RuntimeBridge::new(channel)),
        inliner: inliner.clone(),
        flash: Duration::from_millis(1500),
    };
    (ctx, button, inliner)
}

#[tokio::test(start_paused = true)]
async fn test_complete_success_flashes_then_reverts() {
    let channel = Arc::new(MockRuntimeChannel::new());
    let (ctx, button, inliner) = activation_fixture(channel.clone()).await;
    let doc = ctx.doc.clone();

    let task = tokio::spawn(complete(ctx, button, descriptor()));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(button_state(&*doc.read().await, button), Some(ButtonState::Added));
    assert!(doc.read().await.has_attribute(button, "disabled"));

    assert!(task.await.unwrap().unwrap());
    let guard = doc.read().await;
    assert_eq!(button_state(&guard, button), Some(ButtonState::Idle));
    assert!(!guard.has_attribute(button, "disabled"));

    assert_eq!(inliner.call_count(), 1);
    let calls = channel.calls().await;
    assert_eq!(calls[0].1["item"]["thumbnailRef"], MockInliner::INLINE_IMAGE);
}

#[tokio::test(start_paused = true)]
async fn test_complete_rejected_shows_failure() {
    let channel = Arc::new(MockRuntimeChannel::new());
    channel.respond("addToCart", json!({ "success": false })).await;
    let (ctx, button, _) = activation_fixture(channel).await;
    let doc = ctx.doc.clone();

    let task = tokio::spawn(complete(ctx, button, descriptor()));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(button_state(&*doc.read().await, button), Some(ButtonState::Failed));

    assert!(!task.await.unwrap().unwrap());
    assert_eq!(button_state(&*doc.read().await, button), Some(ButtonState::Idle));
}

#[tokio::test(start_paused = true)]
async fn test_complete_invalidation_is_error() {
    let channel = Arc::new(MockRuntimeChannel::new());
    channel.invalidate();
    let (ctx, button, _) = activation_fixture(channel).await;
    let doc = ctx.doc.clone();

    let err = complete(ctx, button, descriptor()).await.unwrap_err();
    assert!(err.is_context_invalidated());
    assert_eq!(button_state(&*doc.read().await, button), Some(ButtonState::Idle));
}

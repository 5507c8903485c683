//! # Listing-Augmenter demo
//!
//! Runs the engine against a simulated listing page: an initial grid, two
//! rounds of infinite scroll and a click on the first control. Settings and
//! the cart are served by the in-memory runtime channel; thumbnails are
//! fetched over HTTP.
//!
//! ## Environment variables
//! - `RUST_LOG`: log level (default: info)
//! - `AUGMENT_CONFIG`: optional TOML configuration file
//! - `AUGMENT_*`: configuration overrides, see `Config::from_env`

use listing_augmenter::{
    config::Config,
    detect::selectors::controls,
    dom::{el, shared, Document, NodeId},
    runtime::{mock::MockRuntimeChannel, HttpThumbnailInliner, RuntimeBridge},
    Engine,
};

use anyhow::Context;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const PAGE_URL: &str = "https://acme.shop.example.com/category/phones";

const TITLES: [&str; 8] = [
    "160Y iPhone case",
    "¥99.50 headphones",
    "P250 sneakers",
    "88元 wool scarf",
    "Mystery box",
    "45 yuan | charging cable",
    "￥1,299 mechanical keyboard",
    "Sold out",
];

fn append_cards(doc: &mut Document, grid: NodeId, page: usize) {
    for (i, title) in TITLES.iter().enumerate() {
        let id = page * TITLES.len() + i;
        el("div")
            .class("grid-item")
            .child(
                el("a")
                    .attr("href", &format!("/item/{}", id))
                    .child(el("img").attr("data-src", &format!("https://img.example.com/{}.jpg", id))),
            )
            .child(el("div").class("item-title").text(title))
            .append_to(doc, grid);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing - respect RUST_LOG environment variable
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    info!("Listing-Augmenter v{}", listing_augmenter::VERSION);

    // Load configuration
    let config = match std::env::var("AUGMENT_CONFIG") {
        Ok(path) => Config::from_file(&path)?,
        Err(_) => Config::from_env()?,
    };
    info!(
        "Configuration loaded: scan_debounce={}ms, max_dirty_roots={}",
        config.scan_debounce_ms, config.max_dirty_roots
    );

    // Host page with a first page of results
    let mut doc = Document::new(PAGE_URL);
    let body = doc.body();
    el("div")
        .class("store-header")
        .child(el("span").class("store-name").text("Acme Finds"))
        .append_to(&mut doc, body);
    let grid = el("div").class("grid").append_to(&mut doc, body);
    append_cards(&mut doc, grid, 0);
    let doc = shared(doc);

    // Collaborators
    let channel = Arc::new(MockRuntimeChannel::new());
    channel
        .respond("getSettings", json!({ "targetCurrency": "EUR", "darkModeEnabled": false }))
        .await;
    channel
        .respond("getRate", json!({ "rate": 0.13, "fetchedAt": chrono::Utc::now().timestamp_millis() }))
        .await;
    let collaborators = Arc::new(RuntimeBridge::new(channel.clone()));
    let inliner = Arc::new(HttpThumbnailInliner::new(config.fetch_timeout())?);

    let settle = config.scan_debounce() * 2;
    let flash = config.success_flash();
    let handle = Engine::new(doc.clone(), collaborators, inliner, config)?.start();
    tokio::time::sleep(settle).await;

    // Infinite scroll
    for page in 1..=2 {
        append_cards(&mut *doc.write().await, grid, page);
        info!("Host appended page {}", page);
        tokio::time::sleep(settle).await;
    }

    let button = {
        let doc = doc.read().await;
        let root = doc.document_node();
        info!(
            "{} controls on {} cards",
            doc.query_all(root, &controls::CONTROL).len(),
            TITLES.len() * 3
        );
        doc.query(root, &controls::BUTTON)
            .context("no control was injected")?
    };

    handle.activate(button)?;
    tokio::time::sleep(flash + Duration::from_millis(500)).await;

    let stats = handle.stop().await?;
    info!(
        "Done: {} flushes ({} full), {} controls, {} items added, {} cart calls",
        stats.flushes,
        stats.full_rescans,
        stats.controls_injected,
        stats.items_added,
        channel.call_count("addToCart").await
    );
    Ok(())
}

//! Selectors for the supported host page shapes.
//!
//! Update this file when the host changes its markup.

use std::sync::LazyLock;

use crate::dom::{Document, NodeId, Selector};

/// Attribute set on a host element once a control has been attached to it
pub const INJECTION_MARKER: &str = "data-pa-injected";

fn selector(source: &str) -> Selector {
    Selector::parse(source).expect("static selector")
}

/// Grid listing pages.
pub mod listing {
    use super::*;

    /// Product card container.
    pub static CARD: LazyLock<Selector> = LazyLock::new(|| selector(".grid-item"));

    /// Card title text.
    pub static TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".item-title"));

    /// Product link inside a card.
    pub static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

    /// Card image.
    pub static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img"));
}

/// Index (list) pages: every row is a single anchor.
pub mod index {
    use super::*;

    pub static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a.index-item"));

    pub static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img"));
}

/// Single-item detail pages.
pub mod detail {
    use super::*;

    /// Header block holding the item name.
    pub static HEADER: LazyLock<Selector> = LazyLock::new(|| selector(".detail-header"));

    pub static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h1"));

    /// Main gallery image.
    pub static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector(".detail-gallery img"));

    /// Subtitle link to the original marketplace listing.
    pub static SOURCE_LINK: LazyLock<Selector> =
        LazyLock::new(|| selector(".detail-subtitle a[href]"));
}

/// Full-view image overlay (lightbox).
pub mod overlay {
    use super::*;

    pub static PANEL: LazyLock<Selector> = LazyLock::new(|| selector(".lightbox-panel"));

    pub static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector(".lightbox-panel img"));

    /// Class the host puts on `body` while scrolling is locked.
    pub const SCROLL_LOCK_CLASS: &str = "scroll-locked";
}

/// Store header naming the vendor.
pub static VENDOR_NAME: LazyLock<Selector> =
    LazyLock::new(|| selector(".store-header .store-name"));

/// Elements created by the injector.
pub mod controls {
    use super::*;

    pub const CONTROL_CLASS: &str = "pa-control";

    pub const PURCHASE_BAR_CLASS: &str = "pa-purchase-bar";

    pub static CONTROL: LazyLock<Selector> = LazyLock::new(|| selector(".pa-control"));

    pub static PURCHASE_BAR: LazyLock<Selector> = LazyLock::new(|| selector(".pa-purchase-bar"));

    pub static BUTTON: LazyLock<Selector> = LazyLock::new(|| selector("button.pa-add"));

    pub static CONVERTED: LazyLock<Selector> = LazyLock::new(|| selector(".pa-converted"));

    pub static PRICE: LazyLock<Selector> = LazyLock::new(|| selector(".pa-price"));
}

/// Whether a host element already carries a control
pub fn is_marked(doc: &Document, node: NodeId) -> bool {
    doc.has_attribute(node, INJECTION_MARKER)
}

/// Whether `node` is one of the injector's own elements or inside one
pub fn is_engine_owned(doc: &Document, node: NodeId) -> bool {
    doc.nearest_element(node)
        .and_then(|element| doc.closest(element, &controls::CONTROL))
        .is_some()
}

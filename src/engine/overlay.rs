//! Lightbox state synchronization
//!
//! Watches the scroll-lock signal on `body` and, once the host has created
//! it, the lightbox panel itself. Reconciling hides the detail purchase bar
//! with an important-priority override while the lightbox is open and
//! removes that override when it closes.

use tracing::{debug, trace};

use crate::detect::overlay::{find_panel, is_overlay_visible};
use crate::detect::selectors::controls;
use crate::detect::is_engine_owned;
use crate::dom::{Document, MutationObserver, MutationRecord, ObserveOptions};

/// Body attributes that carry the scroll lock
const BODY_ATTRIBUTES: [&str; 2] = ["class", "style"];

/// Panel attributes that change its visibility or the image it shows
const PANEL_ATTRIBUTES: [&str; 6] = ["style", "class", "hidden", "src", "data-src", "data-origin"];

/// Outcome of a panel lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelPoll {
    /// Panel found and observed from now on
    Attached,
    /// Panel already observed
    Watching,
    /// Host has not created the panel yet
    Missing,
}

/// Observers feeding the overlay reconcile
#[derive(Debug, Default)]
pub struct OverlaySync {
    pub(crate) body: Option<MutationObserver>,
    pub(crate) panel: Option<MutationObserver>,
}

impl OverlaySync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start observing the scroll-lock container
    pub fn attach_body(&mut self, doc: &mut Document) {
        if self.body.is_none() {
            let body = doc.body();
            self.body = Some(doc.observe(body, ObserveOptions::attributes(BODY_ATTRIBUTES)));
        }
    }

    /// Look for the panel and observe it once found
    pub fn poll_panel(&mut self, doc: &mut Document) -> PanelPoll {
        if self.release_if_detached(doc) {
            trace!("Observed lightbox panel was detached");
        } else if self.panel.is_some() {
            return PanelPoll::Watching;
        }

        match find_panel(doc) {
            Some(panel) => {
                let options = ObserveOptions {
                    subtree: true,
                    ..ObserveOptions::attributes(PANEL_ATTRIBUTES)
                };
                self.panel = Some(doc.observe(panel, options));
                debug!("Observing lightbox panel {}", panel);
                PanelPoll::Attached
            }
            None => PanelPoll::Missing,
        }
    }

    /// Drop the panel observer when its panel left the document
    pub fn release_if_detached(&mut self, doc: &mut Document) -> bool {
        let detached = self
            .panel
            .as_ref()
            .is_some_and(|observer| !doc.is_connected(observer.target()));
        if detached {
            if let Some(observer) = self.panel.take() {
                doc.disconnect(observer.id());
            }
        }
        detached
    }

    pub fn is_watching_panel(&self) -> bool {
        self.panel.is_some()
    }

    /// Disconnect both observers
    pub fn detach(&mut self, doc: &mut Document) {
        for observer in [self.body.take(), self.panel.take()].into_iter().flatten() {
            doc.disconnect(observer.id());
        }
    }
}

/// Whether an observed change can affect the lightbox state
pub fn is_signal(doc: &Document, record: &MutationRecord) -> bool {
    !is_engine_owned(doc, record.target)
}

/// Apply or lift the purchase-bar override; returns whether the lightbox is open
pub fn reconcile_purchase_bar(doc: &mut Document) -> bool {
    let visible = is_overlay_visible(doc);

    for bar in doc.query_all(doc.document_node(), &controls::PURCHASE_BAR) {
        let forced = doc
            .style_property(bar, "display")
            .is_some_and(|decl| decl.important && decl.value == "none");
        if visible && !forced {
            doc.set_style_property(bar, "display", "none", true);
            debug!("Lightbox open, hiding purchase bar {}", bar);
        } else if !visible && forced {
            doc.remove_style_property(bar, "display");
            debug!("Lightbox closed, restoring purchase bar {}", bar);
        }
    }

    visible
}

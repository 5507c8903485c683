//! Control injection
//!
//! A control is appended to a host element exactly once. The injection
//! marker is checked before anything is touched and set in the same call
//! that attaches the control.

use tracing::debug;

use crate::detect::selectors::controls;
use crate::detect::{is_marked, ItemDescriptor, SizeVariant, INJECTION_MARKER};
use crate::dom::{el, Document, NodeId};

use super::formatter::PriceFormatter;

/// Attribute holding the native price on a control, for later relabeling
pub const PRICE_ATTR: &str = "data-pa-price";

/// Attribute holding the button state
pub const STATE_ATTR: &str = "data-state";

/// Button state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Idle,
    Busy,
    Added,
    Failed,
}

impl ButtonState {
    pub fn as_str(self) -> &'static str {
        match self {
            ButtonState::Idle => "idle",
            ButtonState::Busy => "busy",
            ButtonState::Added => "added",
            ButtonState::Failed => "failed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ButtonState::Idle => "Add to cart",
            ButtonState::Busy => "Adding…",
            ButtonState::Added => "Added ✓",
            ButtonState::Failed => "Failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "idle" => Some(ButtonState::Idle),
            "busy" => Some(ButtonState::Busy),
            "added" => Some(ButtonState::Added),
            "failed" => Some(ButtonState::Failed),
            _ => None,
        }
    }
}

/// Attach a purchase control to `element`
///
/// Returns the control's button, or `None` when `element` was already handled.
pub fn inject(
    doc: &mut Document,
    element: NodeId,
    descriptor: &ItemDescriptor,
    variant: SizeVariant,
    formatter: &PriceFormatter,
) -> Option<NodeId> {
    if is_marked(doc, element) {
        return None;
    }

    let mut control = el("div")
        .class(controls::CONTROL_CLASS)
        .class(variant.class_name())
        .attr(PRICE_ATTR, &descriptor.price.to_string());
    if variant == SizeVariant::Bar {
        control = control.class(controls::PURCHASE_BAR_CLASS);
    }
    if formatter.dark_mode() {
        control = control.class("pa-dark");
    }

    control = control.child(el("span").class("pa-price").text(&formatter.native_label(descriptor.price)));
    if let Some(converted) = formatter.converted_label(descriptor.price) {
        control = control.child(el("span").class("pa-converted").text(&converted));
    }
    control = control.child(
        el("button")
            .class("pa-add")
            .attr("type", "button")
            .attr(STATE_ATTR, ButtonState::Idle.as_str())
            .text(ButtonState::Idle.label()),
    );

    let control = control.build(doc);
    let button = doc.query(control, &controls::BUTTON)?;

    doc.set_attribute(element, INJECTION_MARKER, "1");
    doc.append_child(element, control);

    debug!(
        "Injected {} control on {} for {:?} at {}",
        variant.class_name(),
        element,
        descriptor.title,
        descriptor.price
    );
    Some(button)
}

/// Current state of a control button
pub fn button_state(doc: &Document, button: NodeId) -> Option<ButtonState> {
    doc.attribute(button, STATE_ATTR).and_then(ButtonState::parse)
}

/// Move a button to `state`; every state but idle keeps it disabled
pub fn set_button_state(doc: &mut Document, button: NodeId, state: ButtonState) {
    doc.set_attribute(button, STATE_ATTR, state.as_str());
    doc.set_text(button, state.label());
    if state == ButtonState::Idle {
        doc.remove_attribute(button, "disabled");
    } else {
        doc.set_attribute(button, "disabled", "");
    }
}

/// Relabel every live control after settings or rates changed
///
/// Returns the number of controls updated.
pub fn refresh_prices(doc: &mut Document, formatter: &PriceFormatter) -> usize {
    let controls_found = doc.query_all(doc.document_node(), &controls::CONTROL);
    let mut updated = 0;

    for control in controls_found {
        let Some(price) = doc
            .attribute(control, PRICE_ATTR)
            .and_then(|p| p.parse::<f64>().ok())
        else {
            continue;
        };

        if formatter.dark_mode() {
            doc.add_class(control, "pa-dark");
        } else {
            doc.remove_class(control, "pa-dark");
        }

        let existing = doc.query(control, &controls::CONVERTED);
        match (existing, formatter.converted_label(price)) {
            (Some(span), Some(label)) => doc.set_text(span, &label),
            (Some(span), None) => doc.remove(span),
            (None, Some(label)) => {
                let span = el("span").class("pa-converted").text(&label).build(doc);
                match doc.query(control, &controls::PRICE) {
                    Some(price_span) => insert_after(doc, control, price_span, span),
                    None => doc.append_child(control, span),
                }
            }
            (None, None) => {}
        }
        updated += 1;
    }

    updated
}

/// Keep the converted label right after the native price
fn insert_after(doc: &mut Document, parent: NodeId, reference: NodeId, node: NodeId) {
    let following: Vec<NodeId> = doc
        .children(parent)
        .iter()
        .copied()
        .skip_while(|&c| c != reference)
        .skip(1)
        .collect();
    doc.append_child(parent, node);
    for sibling in following {
        doc.append_child(parent, sibling);
    }
}

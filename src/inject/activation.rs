//! Control activation handling
//!
//! `claim` runs synchronously inside the engine loop and disables the button,
//! so a second activation during the busy window finds it disabled and is
//! dropped. `complete` runs as its own task and owns every await.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::detect::ItemDescriptor;
use crate::dom::{Document, NodeId, SharedDocument};
use crate::error::Result;
use crate::runtime::{Collaborators, ThumbnailInliner};

use super::injector::{set_button_state, ButtonState};

/// Dependencies an activation needs once it leaves the engine loop
#[derive(Clone)]
pub struct ActivationContext {
    pub doc: SharedDocument,
    pub collaborators: Arc<dyn Collaborators>,
    pub inliner: Arc<dyn ThumbnailInliner>,
    /// How long the added/failed state stays visible
    pub flash: Duration,
}

/// Mark `button` busy; `false` when it is already disabled or gone
pub fn claim(doc: &mut Document, button: NodeId) -> bool {
    if !doc.is_connected(button) || doc.has_attribute(button, "disabled") {
        return false;
    }
    set_button_state(doc, button, ButtonState::Busy);
    true
}

/// Inline the thumbnail, add the item to the cart, flash the outcome, revert
///
/// Resolves to whether the cart accepted the item. Host invalidation is
/// returned as an error after the button is reset.
pub async fn complete(
    ctx: ActivationContext,
    button: NodeId,
    mut descriptor: ItemDescriptor,
) -> Result<bool> {
    if !descriptor.thumbnail_ref.is_empty() {
        descriptor.thumbnail_ref = ctx.inliner.inline(&descriptor.thumbnail_ref).await;
    }

    let response = match ctx.collaborators.add_to_cart(&descriptor).await {
        Ok(response) => Some(response),
        Err(e) if e.is_context_invalidated() => {
            set_button_state(&mut *ctx.doc.write().await, button, ButtonState::Idle);
            return Err(e);
        }
        Err(e) => {
            warn!("Add to cart failed for {:?}: {}", descriptor.title, e);
            None
        }
    };

    let state = match response {
        Some(response) if response.success => {
            info!("Added {:?} ({}) to cart", descriptor.title, descriptor.price);
            ButtonState::Added
        }
        Some(_) => {
            debug!("Cart rejected {:?}", descriptor.title);
            ButtonState::Failed
        }
        None => ButtonState::Failed,
    };

    set_button_state(&mut *ctx.doc.write().await, button, state);
    tokio::time::sleep(ctx.flash).await;
    set_button_state(&mut *ctx.doc.write().await, button, ButtonState::Idle);

    Ok(state == ButtonState::Added)
}

//! # Document model
//!
//! A small arena-backed document tree standing in for the hosted page. The
//! host mutates it, the engine observes it through mutation observers and
//! augments it in place.
//!
//! ## Module structure
//! - `tree`: nodes, attributes, inline styles, visibility and queries
//! - `selector`: the selector subset used to describe page shapes
//! - `observer`: mutation records and observer registrations
//! - `builder`: declarative subtree construction

pub mod tree;
pub mod selector;
pub mod observer;
pub mod builder;


use std::sync::Arc;
use tokio::sync::RwLock;

pub use builder::{el, ElementSpec};
pub use observer::{MutationKind, MutationObserver, MutationRecord, ObserveOptions, ObserverId};
pub use selector::Selector;
pub use tree::{Document, NodeId, StyleDecl};

/// Document shared between the host and the engine
pub type SharedDocument = Arc<RwLock<Document>>;

/// Wrap a document for sharing
pub fn shared(doc: Document) -> SharedDocument {
    Arc::new(RwLock::new(doc))
}

//! Listing-Augmenter: incremental purchase-control injection for product listing pages
//!
//! This library detects priced items in a host page's document tree, attaches
//! purchase controls to them, and keeps those controls consistent while the
//! host keeps rewriting the page.

pub mod error;
pub mod config;

pub mod dom;
pub mod extract;
pub mod detect;
pub mod inject;
pub mod runtime;
pub mod engine;

// Re-exports
pub use config::Config;
pub use engine::{Engine, EngineEvent, EngineHandle, EngineStats};
pub use error::{Error, Result};

/// Listing-Augmenter library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

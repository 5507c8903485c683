//! # Runtime collaborators
//!
//! Everything the engine talks to outside the page: user settings, cached
//! exchange rates and the cart, all reached through one request/response
//! message channel, plus thumbnail inlining for cart entries.
//!
//! ## Module structure
//! - `traits`: `RuntimeChannel`, `Collaborators`, `ThumbnailInliner` and payload types
//! - `bridge`: typed collaborator calls over a channel, with invalidation detection
//! - `inliner`: HTTP thumbnail fetch into `data:` URIs
//! - `mock`: in-memory channel and inliner for tests and demos

pub mod traits;
pub mod bridge;
pub mod inliner;
pub mod mock;

pub use bridge::RuntimeBridge;
pub use inliner::HttpThumbnailInliner;
pub use traits::{CartResponse, Collaborators, Rate, RuntimeChannel, Settings, ThumbnailInliner};

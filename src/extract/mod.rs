//! # Text and reference extraction
//!
//! Pure helpers the page-shape detectors build item descriptors from.
//!
//! ## Module structure
//! - `price`: ordered price patterns and title stripping
//! - `link`: redirect unwrapping, URL resolution, vendor names
//! - `thumbnail`: image reference probing with placeholder rejection

pub mod price;
pub mod link;
pub mod thumbnail;

pub use link::{resolve, unwrap_redirect, vendor_from_host};
pub use price::{extract, find_price, strip_price_prefix, PriceMatch, MAX_PRICE};
pub use thumbnail::resolve_thumbnail;

//! # Purchase control injection
//!
//! Builds the purchase control for a detected item, attaches it once per
//! host element and drives its activation.
//!
//! ## Control layout
//! ```text
//! div.pa-control.pa-<size>[.pa-purchase-bar][.pa-dark][data-pa-price]
//!   span.pa-price        ¥160.00
//!   span.pa-converted    ≈ $22.40      (only with a known rate)
//!   button.pa-add        Add to cart   (data-state = idle | busy | added | failed)
//! ```
//!
//! ## Module structure
//! - `injector`: idempotent control construction and relabeling
//! - `formatter`: native and converted price labels
//! - `activation`: busy claim, cart submission and state flash

pub mod injector;
pub mod formatter;
pub mod activation;

#[cfg(test)]
mod tests;

pub use activation::{claim, complete, ActivationContext};
pub use formatter::{PriceFormatter, NATIVE_CURRENCY};
pub use injector::{button_state, inject, refresh_prices, set_button_state, ButtonState};

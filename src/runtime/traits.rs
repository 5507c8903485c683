//! External collaborator traits
//!
//! This module defines the interfaces the engine consumes: the host runtime
//! message channel, the typed collaborator calls built on top of it, and
//! thumbnail inlining.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::detect::ItemDescriptor;

// ============================================================================
// Runtime Channel
// ============================================================================

/// Runtime channel trait
///
/// One request/response round trip per message, addressed by action name.
#[async_trait]
pub trait RuntimeChannel: Send + Sync + std::fmt::Debug {
    /// Send a message and wait for the response payload
    async fn send_message(&self, action: &str, payload: Value) -> Result<Value, crate::Error>;

    /// Whether the channel can still be used
    fn is_connected(&self) -> bool;
}

// ============================================================================
// Collaborators
// ============================================================================

/// Collaborators trait
///
/// Settings, exchange rates and the cart live outside the engine.
#[async_trait]
pub trait Collaborators: Send + Sync {
    /// Current user settings
    async fn get_settings(&self) -> Result<Settings, crate::Error>;

    /// Cached exchange rate from the native currency to `currency`
    async fn get_rate(&self, currency: &str) -> Result<Option<Rate>, crate::Error>;

    /// Add an item to the cart
    async fn add_to_cart(&self, item: &ItemDescriptor) -> Result<CartResponse, crate::Error>;
}

/// User settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Currency converted prices are shown in
    pub target_currency: String,
    pub dark_mode_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_currency: "USD".to_string(),
            dark_mode_enabled: false,
        }
    }
}

/// Exchange rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    /// Units of the target currency per native unit
    pub rate: f64,
    /// Fetch time, milliseconds since the Unix epoch
    pub fetched_at: i64,
}

impl Rate {
    /// Fetch time as a timestamp
    pub fn fetched_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.fetched_at)
    }
}

/// Cart response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartResponse {
    pub success: bool,
}

// ============================================================================
// Thumbnail Inliner
// ============================================================================

/// Thumbnail inliner trait
///
/// Converts a thumbnail reference to an inline `data:` image before it is
/// sent with an add-to-cart request. Failures resolve to an empty reference.
#[async_trait]
pub trait ThumbnailInliner: Send + Sync {
    async fn inline(&self, reference: &str) -> String;
}

//! Typed collaborator calls over a runtime channel

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::detect::ItemDescriptor;
use crate::error::{Error, Result};

use super::traits::{CartResponse, Collaborators, Rate, RuntimeChannel, Settings};

/// Message text the host runtime uses once the hosting context is gone
const INVALIDATED_MARKERS: [&str; 2] = ["context invalidated", "receiving end does not exist"];

/// Collaborators backed by a runtime message channel
#[derive(Debug, Clone)]
pub struct RuntimeBridge {
    channel: Arc<dyn RuntimeChannel>,
}

impl RuntimeBridge {
    /// Create a new bridge
    pub fn new(channel: Arc<dyn RuntimeChannel>) -> Self {
        Self { channel }
    }

    /// Send one message, mapping host invalidation to `Error::ContextInvalidated`
    async fn call(&self, action: &str, payload: Value) -> Result<Value> {
        if !self.channel.is_connected() {
            return Err(Error::context_invalidated(format!("channel closed before {}", action)));
        }

        match self.channel.send_message(action, payload).await {
            Ok(value) => Ok(value),
            Err(Error::Channel(msg)) if is_invalidation(&msg) => {
                warn!("Runtime channel invalidated during {}: {}", action, msg);
                Err(Error::context_invalidated(msg))
            }
            Err(e) => Err(e),
        }
    }
}

fn is_invalidation(message: &str) -> bool {
    let lower = message.to_lowercase();
    INVALIDATED_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[async_trait]
impl Collaborators for RuntimeBridge {
    #[instrument(skip(self))]
    async fn get_settings(&self) -> Result<Settings> {
        let value = self.call("getSettings", json!({})).await?;
        if value.is_null() {
            return Ok(Settings::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    #[instrument(skip(self))]
    async fn get_rate(&self, currency: &str) -> Result<Option<Rate>> {
        let value = self.call("getRate", json!({ "currency": currency })).await?;
        if value.is_null() {
            debug!("No cached rate for {}", currency);
            return Ok(None);
        }
        let rate: Rate = serde_json::from_value(value)?;
        Ok((rate.rate.is_finite() && rate.rate > 0.0).then_some(rate))
    }

    #[instrument(skip(self, item), fields(title = %item.title, price = item.price))]
    async fn add_to_cart(&self, item: &ItemDescriptor) -> Result<CartResponse> {
        let payload = json!({
            "requestId": Uuid::new_v4().to_string(),
            "item": item,
        });
        let value = self.call("addToCart", payload).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::mock::MockRuntimeChannel;

    fn item() -> ItemDescriptor {
        ItemDescriptor::from_text(
            "160Y iPhone case",
            "acme",
            String::new(),
            "https://acme.shop.example.com/item/1".to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let channel = Arc::new(MockRuntimeChannel::new());
        channel
            .respond("getSettings", json!({ "targetCurrency": "EUR", "darkModeEnabled": true }))
            .await;
        let bridge = RuntimeBridge::new(channel.clone());

        let settings = bridge.get_settings().await.unwrap();
        assert_eq!(settings.target_currency, "EUR");
        assert!(settings.dark_mode_enabled);
    }

    #[tokio::test]
    async fn test_missing_rate_is_none() {
        let channel = Arc::new(MockRuntimeChannel::new());
        let bridge = RuntimeBridge::new(channel.clone());
        assert_eq!(bridge.get_rate("USD").await.unwrap(), None);

        channel.respond("getRate", json!({ "rate": 0.0, "fetchedAt": 0 })).await;
        assert_eq!(bridge.get_rate("USD").await.unwrap(), None);

        channel
            .respond("getRate", json!({ "rate": 0.14, "fetchedAt": 1_700_000_000_000i64 }))
            .await;
        let rate = bridge.get_rate("USD").await.unwrap().unwrap();
        assert_eq!(rate.rate, 0.14);
        assert!(rate.fetched_at_utc().is_some());
    }

    #[tokio::test]
    async fn test_add_to_cart_payload() {
        let channel = Arc::new(MockRuntimeChannel::new());
        let bridge = RuntimeBridge::new(channel.clone());

        let response = bridge.add_to_cart(&item()).await.unwrap();
        assert!(response.success);

        let calls = channel.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "addToCart");
        assert_eq!(calls[0].1["item"]["title"], "iPhone case");
        assert_eq!(calls[0].1["item"]["price"], 160.0);
        assert!(calls[0].1["item"].get("sourceLinkRef").is_none());
        assert!(calls[0].1["requestId"].is_string());
    }

    #[tokio::test]
    async fn test_invalidation_detected() {
        let channel = Arc::new(MockRuntimeChannel::new());
        let bridge = RuntimeBridge::new(channel.clone());

        channel.fail_with("Extension context invalidated.").await;
        let err = bridge.get_settings().await.unwrap_err();
        assert!(err.is_context_invalidated());

        channel.invalidate();
        let err = bridge.add_to_cart(&item()).await.unwrap_err();
        assert!(err.is_context_invalidated());
    }

    #[tokio::test]
    async fn test_other_channel_errors_pass_through() {
        let channel = Arc::new(MockRuntimeChannel::new());
        let bridge = RuntimeBridge::new(channel.clone());

        channel.fail_with("quota exceeded").await;
        let err = bridge.get_settings().await.unwrap_err();
        assert!(matches!(err, Error::Channel(_)));
    }
}

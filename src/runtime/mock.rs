//! Mock runtime implementation for testing
//!
//! This module provides mock implementations of the runtime traits for
//! development and testing.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::traits::{RuntimeChannel, ThumbnailInliner};
use crate::Error;

/// Mock runtime channel
///
/// Answers `getSettings` and `getRate` with `null` and `addToCart` with
/// success unless told otherwise, and records every message.
#[derive(Debug)]
pub struct MockRuntimeChannel {
    responses: Mutex<HashMap<String, Value>>,
    failure: Mutex<Option<String>>,
    calls: Mutex<Vec<(String, Value)>>,
    delay: Mutex<Option<Duration>>,
    connected: Arc<AtomicBool>,
}

impl MockRuntimeChannel {
    /// Create a new mock channel
    pub fn new() -> Self {
        let mut responses = HashMap::new();
        responses.insert("addToCart".to_string(), json!({ "success": true }));
        Self {
            responses: Mutex::new(responses),
            failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Set the response payload for an action
    pub async fn respond(&self, action: &str, payload: Value) {
        self.responses.lock().await.insert(action.to_string(), payload);
    }

    /// Fail every following message with a channel error
    pub async fn fail_with(&self, message: &str) {
        *self.failure.lock().await = Some(message.to_string());
    }

    /// Delay every following response
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.lock().await = Some(delay);
    }

    /// Simulate the hosting context going away
    pub fn invalidate(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Messages received so far
    pub async fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().await.clone()
    }

    /// Number of messages received for `action`
    pub async fn call_count(&self, action: &str) -> usize {
        self.calls.lock().await.iter().filter(|(a, _)| a == action).count()
    }
}

impl Default for MockRuntimeChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuntimeChannel for MockRuntimeChannel {
    async fn send_message(&self, action: &str, payload: Value) -> Result<Value, Error> {
        self.calls.lock().await.push((action.to_string(), payload));

        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.failure.lock().await.clone() {
            return Err(Error::channel(message));
        }

        Ok(self
            .responses
            .lock()
            .await
            .get(action)
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Mock thumbnail inliner
///
/// Returns a fixed inline image for network references and counts calls.
#[derive(Debug, Default)]
pub struct MockInliner {
    calls: AtomicU64,
}

impl MockInliner {
    pub const INLINE_IMAGE: &'static str = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ThumbnailInliner for MockInliner {
    async fn inline(&self, reference: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if reference.starts_with("http") {
            Self::INLINE_IMAGE.to_string()
        } else {
            reference.to_string()
        }
    }
}

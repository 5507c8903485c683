//! HTTP thumbnail inliner
//!
//! Fetches a network thumbnail and re-encodes it as a `data:` URI so the
//! cart keeps a copy that does not depend on the host's image CDN.

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::extract::link::is_network_url;

use super::traits::ThumbnailInliner;

const DEFAULT_MIME: &str = "image/jpeg";

/// Thumbnail inliner over reqwest
#[derive(Debug, Clone)]
pub struct HttpThumbnailInliner {
    client: reqwest::Client,
}

impl HttpThumbnailInliner {
    /// Create a new inliner with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(DEFAULT_MIME).trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| DEFAULT_MIME.to_string());
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::internal(format!("Empty image body from {}", url)));
        }
        Ok(to_data_uri(&mime, &bytes))
    }
}

/// Encode raw image bytes as a `data:` URI
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[async_trait]
impl ThumbnailInliner for HttpThumbnailInliner {
    async fn inline(&self, reference: &str) -> String {
        if reference.starts_with("data:") {
            return reference.to_string();
        }
        if !is_network_url(reference) {
            return String::new();
        }
        match self.fetch(reference).await {
            Ok(data_uri) => data_uri,
            Err(e) => {
                debug!("Thumbnail fetch failed for {}: {}", reference, e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_data_uri() {
        assert_eq!(to_data_uri("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_inline_passthrough_and_rejects() {
        let inliner = HttpThumbnailInliner::new(Duration::from_millis(100)).unwrap();
        assert_eq!(inliner.inline("data:image/png;base64,YWJj").await, "data:image/png;base64,YWJj");
        assert_eq!(inliner.inline("").await, "");
        assert_eq!(inliner.inline("/relative.jpg").await, "");
    }

    #[tokio::test]
    async fn test_inline_unreachable_is_empty() {
        let inliner = HttpThumbnailInliner::new(Duration::from_millis(200)).unwrap();
        assert_eq!(inliner.inline("http://127.0.0.1:9/missing.jpg").await, "");
    }
}

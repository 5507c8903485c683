//! Thumbnail reference resolution

use base64::Engine as _;

use crate::dom::{Document, NodeId};

use super::link::{is_network_url, resolve};

/// Attributes probed for an image reference, highest priority first
pub const THUMBNAIL_ATTRIBUTES: [&str; 3] = ["data-origin", "data-src", "src"];

/// Best usable thumbnail reference of an image element, or empty
///
/// Relative references are resolved against the page URL. Inline images
/// smaller than `min_inline_bytes` are lazy-loading placeholders and are
/// skipped in favor of the next candidate attribute.
pub fn resolve_thumbnail(doc: &Document, image: NodeId, min_inline_bytes: usize) -> String {
    THUMBNAIL_ATTRIBUTES
        .iter()
        .filter_map(|attr| doc.attribute(image, attr))
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .find_map(|raw| accept_reference(doc.url(), raw, min_inline_bytes))
        .unwrap_or_default()
}

/// Normalize one candidate, rejecting placeholders and unusable schemes
pub fn accept_reference(page_url: &str, raw: &str, min_inline_bytes: usize) -> Option<String> {
    if raw.starts_with("data:") {
        return (inline_payload_len(raw)? >= min_inline_bytes).then(|| raw.to_string());
    }
    let absolute = resolve(page_url, raw);
    is_network_url(&absolute).then_some(absolute)
}

/// Decoded byte length of a `data:` URI payload
pub fn inline_payload_len(data_uri: &str) -> Option<usize> {
    let (meta, payload) = data_uri.strip_prefix("data:")?.split_once(',')?;
    if meta.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .ok()
            .map(|bytes| bytes.len())
    } else {
        Some(urlencoding::decode_binary(payload.as_bytes()).len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::el;

    fn inline_png(len: usize) -> String {
        let bytes = vec![0u8; len];
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    #[test]
    fn test_payload_len() {
        assert_eq!(inline_payload_len(&inline_png(10)), Some(10));
        assert_eq!(inline_payload_len("data:image/svg+xml,%3Csvg%3E"), Some(5));
        assert_eq!(inline_payload_len("data:image/png;base64,!!!"), None);
        assert_eq!(inline_payload_len("https://x"), None);
    }

    #[test]
    fn test_probe_order() {
        let mut doc = Document::new("https://acme.shop.example.com/");
        let body = doc.body();
        let img = el("img")
            .attr("src", "https://img.example.com/small.jpg")
            .attr("data-src", "https://img.example.com/lazy.jpg")
            .attr("data-origin", "https://img.example.com/origin.jpg")
            .append_to(&mut doc, body);

        assert_eq!(resolve_thumbnail(&doc, img, 1024), "https://img.example.com/origin.jpg");
    }

    #[test]
    fn test_placeholder_pixel_skipped() {
        let mut doc = Document::new("https://acme.shop.example.com/");
        let body = doc.body();
        let pixel = inline_png(43);
        let img = el("img")
            .attr("data-src", &pixel)
            .attr("src", "/images/real.jpg")
            .append_to(&mut doc, body);

        assert_eq!(
            resolve_thumbnail(&doc, img, 1024),
            "https://acme.shop.example.com/images/real.jpg"
        );
    }

    #[test]
    fn test_large_inline_image_accepted() {
        let mut doc = Document::new("https://acme.shop.example.com/");
        let body = doc.body();
        let data = inline_png(4096);
        let img = el("img").attr("src", &data).append_to(&mut doc, body);

        assert_eq!(resolve_thumbnail(&doc, img, 1024), data);
    }

    #[test]
    fn test_unusable_reference_is_empty() {
        let mut doc = Document::new("about:blank");
        let body = doc.body();
        let img = el("img").attr("src", "blob:abc").append_to(&mut doc, body);
        let bare = el("img").append_to(&mut doc, body);

        assert_eq!(resolve_thumbnail(&doc, img, 1024), "");
        assert_eq!(resolve_thumbnail(&doc, bare, 1024), "");
    }
}

//! Link helpers: redirect unwrapping, URL resolution and vendor names

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static WRAPPED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]url=([^&#]+)").expect("static redirect pattern"));

/// Recover the real product link from a redirect wrapper
///
/// Wrapped targets are usually encoded twice. Decoding falls back to a
/// single pass, then to the raw href; this never fails.
pub fn unwrap_redirect(href: &str) -> String {
    let Some(encoded) = WRAPPED_URL.captures(href).and_then(|c| c.get(1)) else {
        return href.to_string();
    };
    let encoded = encoded.as_str();

    match urlencoding::decode(encoded) {
        Ok(once) => match urlencoding::decode(&once) {
            Ok(twice) => twice.into_owned(),
            Err(e) => {
                debug!("Second decode of wrapped link failed: {}", e);
                once.into_owned()
            }
        },
        Err(e) => {
            debug!("Wrapped link is not decodable, keeping raw href: {}", e);
            href.to_string()
        }
    }
}

/// Resolve `href` against the page URL; the raw href is kept if either does not parse
pub fn resolve(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

/// Vendor name from the first meaningful host-name label
///
/// `acme.shop.example.com` gives `acme`; a leading `www` is skipped.
pub fn vendor_from_host(page_url: &str) -> String {
    let Ok(url) = Url::parse(page_url) else {
        return String::new();
    };
    let Some(host) = url.host_str() else {
        return String::new();
    };
    host.split('.')
        .find(|label| !label.is_empty() && *label != "www")
        .unwrap_or_default()
        .to_string()
}

/// Whether `reference` is an absolute http(s) URL
pub fn is_network_url(reference: &str) -> bool {
    Url::parse(reference)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_double_encoded() {
        let href = "https://agent.example.com/external?url=https%253A%252F%252Fweidian.com%252Fitem";
        assert_eq!(unwrap_redirect(href), "https://weidian.com/item");
    }

    #[test]
    fn test_unwrap_single_encoded() {
        let href = "https://agent.example.com/go?ref=x&url=https%3A%2F%2Fweidian.com%2Fitem%3Fid%3D7&src=list";
        // A second pass over already-plain text is a no-op
        assert_eq!(unwrap_redirect(href), "https://weidian.com/item?id=7");
    }

    #[test]
    fn test_unwrap_without_wrapper() {
        let href = "https://item.taobao.com/item.htm?id=123";
        assert_eq!(unwrap_redirect(href), href);
    }

    #[test]
    fn test_unwrap_malformed_falls_back() {
        // %FF is not valid UTF-8 once decoded
        let href = "https://agent.example.com/external?url=%FF%FE";
        assert_eq!(unwrap_redirect(href), href);

        // First pass fine, second pass invalid
        let href = "https://agent.example.com/external?url=https%253A%25FF";
        assert_eq!(unwrap_redirect(href), "https%3A%FF");
    }

    #[test]
    fn test_resolve() {
        assert_eq!(
            resolve("https://acme.shop.example.com/list?page=2", "/item/7"),
            "https://acme.shop.example.com/item/7"
        );
        assert_eq!(
            resolve("https://acme.shop.example.com/", "https://other.example.com/x"),
            "https://other.example.com/x"
        );
        assert_eq!(resolve("not a url", "/item/7"), "/item/7");
    }

    #[test]
    fn test_vendor_from_host() {
        assert_eq!(vendor_from_host("https://acme.shop.example.com/list"), "acme");
        assert_eq!(vendor_from_host("https://www.bobsfinds.com/"), "bobsfinds");
        assert_eq!(vendor_from_host("file:///tmp/page.html"), "");
        assert_eq!(vendor_from_host("garbage"), "");
    }

    #[test]
    fn test_is_network_url() {
        assert!(is_network_url("https://img.example.com/a.jpg"));
        assert!(is_network_url("http://img.example.com/a.jpg"));
        assert!(!is_network_url("/a.jpg"));
        assert!(!is_network_url("data:image/png;base64,AAAA"));
        assert!(!is_network_url("blob:https://x.example.com/1"));
    }
}

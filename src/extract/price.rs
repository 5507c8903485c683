//! Price extraction from free-form listing text
//!
//! Patterns are tried in priority order and the first one producing a price
//! inside the accepted range wins. The order is what lets a trailing
//! `¥88` beat a SKU number earlier in the text.

use regex::Regex;
use std::sync::LazyLock;

/// Exclusive upper bound for an accepted price
pub const MAX_PRICE: f64 = 999_999.0;

const NUMBER: &str = r"(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)";

/// One price pattern; group 1 is always the number
struct PricePattern {
    name: &'static str,
    regex: Regex,
}

static PATTERNS: LazyLock<Vec<PricePattern>> = LazyLock::new(|| {
    let build = |name: &'static str, source: String| PricePattern {
        name,
        regex: Regex::new(&source).expect("static price pattern"),
    };
    vec![
        // 160Y, 88 yuan, 120 RMB: ...
        build(
            "unit-suffix",
            format!(r"(?i)(?:^|\s){NUMBER}\s?(?:cny|rmb|yuan|y|元)(?:[\s:|/)\-]|$)"),
        ),
        // ¥99.50, $12
        build("symbol-prefix", format!(r"[¥￥$€£]{NUMBER}")),
        // 99元, 45¥
        build("symbol-suffix", format!(r"{NUMBER}[¥￥元円]")),
        // P250
        build("letter-prefix", format!(r"(?:^|\s)[Pp]{NUMBER}")),
    ]
});

/// Separators dropped together with a leading price token
static LEADING_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s:|/\-–—]+").expect("static separator pattern"));

/// A price found in text
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatch {
    /// Parsed value
    pub value: f64,
    /// Byte range of the whole matched token
    pub start: usize,
    pub end: usize,
    /// Name of the pattern that matched
    pub pattern: &'static str,
}

/// Extract the price from `text`, if any
pub fn extract(text: &str) -> Option<f64> {
    find_price(text).map(|m| m.value)
}

/// Locate the first acceptable price token
pub fn find_price(text: &str) -> Option<PriceMatch> {
    PATTERNS.iter().find_map(|pattern| {
        let captures = pattern.regex.captures(text)?;
        let whole = captures.get(0)?;
        let value = parse_number(captures.get(1)?.as_str())?;
        is_acceptable(value).then_some(PriceMatch {
            value,
            start: whole.start(),
            end: whole.end(),
            pattern: pattern.name,
        })
    })
}

/// Display title: `text` without its leading price token
///
/// Returns the original text when the price token is not at the start or
/// when stripping would leave nothing.
pub fn strip_price_prefix(text: &str) -> String {
    let trimmed = text.trim();
    let Some(found) = find_price(trimmed) else {
        return trimmed.to_string();
    };
    if !trimmed[..found.start].trim().is_empty() {
        return trimmed.to_string();
    }
    let rest = LEADING_SEPARATORS.replace(&trimmed[found.end..], "");
    let rest = rest.trim();
    if rest.is_empty() {
        trimmed.to_string()
    } else {
        rest.to_string()
    }
}

/// Whether a parsed value is a plausible price
pub fn is_acceptable(value: f64) -> bool {
    value > 0.0 && value < MAX_PRICE
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

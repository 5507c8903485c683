//! Price labels for injected controls

use phf::phf_map;

use crate::runtime::{Rate, Settings};

/// Currency listing prices are quoted in
pub const NATIVE_CURRENCY: &str = "CNY";

static CURRENCY_SYMBOLS: phf::Map<&'static str, &'static str> = phf_map! {
    "CNY" => "¥",
    "USD" => "$",
    "EUR" => "€",
    "GBP" => "£",
    "JPY" => "JP¥",
    "KRW" => "₩",
    "CAD" => "CA$",
    "AUD" => "A$",
    "CHF" => "CHF ",
    "PLN" => "zł ",
    "SEK" => "kr ",
    "BRL" => "R$",
};

/// Formats native and converted prices from current settings
#[derive(Debug, Clone, PartialEq)]
pub struct PriceFormatter {
    target_currency: String,
    rate: Option<f64>,
    dark_mode: bool,
}

impl Default for PriceFormatter {
    fn default() -> Self {
        Self::native_only()
    }
}

impl PriceFormatter {
    /// Native prices only, used until settings arrive
    pub fn native_only() -> Self {
        Self {
            target_currency: NATIVE_CURRENCY.to_string(),
            rate: None,
            dark_mode: false,
        }
    }

    /// Formatter for the given settings and cached rate
    pub fn new(settings: &Settings, rate: Option<&Rate>) -> Self {
        Self {
            target_currency: settings.target_currency.to_uppercase(),
            rate: rate.map(|r| r.rate),
            dark_mode: settings.dark_mode_enabled,
        }
    }

    pub fn target_currency(&self) -> &str {
        &self.target_currency
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// `¥160.00`
    pub fn native_label(&self, price: f64) -> String {
        format!("{}{:.2}", symbol(NATIVE_CURRENCY), price)
    }

    /// `≈ $22.40`, only when a rate is known and conversion is meaningful
    pub fn converted_label(&self, price: f64) -> Option<String> {
        if self.target_currency == NATIVE_CURRENCY {
            return None;
        }
        let rate = self.rate?;
        Some(format!("≈ {}{:.2}", symbol(&self.target_currency), price * rate))
    }
}

fn symbol(currency: &str) -> String {
    CURRENCY_SYMBOLS
        .get(currency)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("{} ", currency))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(currency: &str) -> Settings {
        Settings {
            target_currency: currency.to_string(),
            dark_mode_enabled: true,
        }
    }

    fn rate(value: f64) -> Rate {
        Rate {
            rate: value,
            fetched_at: 0,
        }
    }

    #[test]
    fn test_native_label() {
        assert_eq!(PriceFormatter::native_only().native_label(160.0), "¥160.00");
        assert_eq!(PriceFormatter::native_only().native_label(99.5), "¥99.50");
    }

    #[test]
    fn test_converted_label() {
        let formatter = PriceFormatter::new(&settings("usd"), Some(&rate(0.14)));
        assert_eq!(formatter.converted_label(160.0).as_deref(), Some("≈ $22.40"));
        assert!(formatter.dark_mode());

        let unknown = PriceFormatter::new(&settings("HUF"), Some(&rate(50.0)));
        assert_eq!(unknown.converted_label(2.0).as_deref(), Some("≈ HUF 100.00"));
    }

    #[test]
    fn test_no_conversion_without_rate_or_for_native() {
        let formatter = PriceFormatter::new(&settings("USD"), None);
        assert_eq!(formatter.converted_label(160.0), None);

        let native = PriceFormatter::new(&settings("CNY"), Some(&rate(1.0)));
        assert_eq!(native.converted_label(160.0), None);
    }
}

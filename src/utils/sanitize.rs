//! Ticker sanitization.
//!
//! Exchange responses are untrusted. [`sanitize_ticker`] projects a record onto
//! a fixed field allow-list, coerces numbers, and strips markup characters from
//! strings before anything reaches the browser.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Characters removed from every string field
const STRIPPED_CHARS: [char; 5] = ['<', '>', '&', '"', '\''];

/// Normalized exchange ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRecord {
    /// Pair identifier as reported by the exchange
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker_id: Option<String>,
    /// Last traded price
    pub last_price: f64,
    /// 24h high
    pub high: f64,
    /// 24h low
    pub low: f64,
    /// 24h volume in base currency
    pub base_volume: f64,
    /// 24h volume in target currency (list-style exchanges)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_volume: Option<f64>,
    /// 24h volume in quote currency (map-style exchanges)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_volume: Option<f64>,
    /// Best bid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    /// Best ask
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
}

/// Project an untrusted record onto [`TickerRecord`].
///
/// Returns `None` if `raw` is not a JSON object. Required numeric fields are
/// always present (0 when missing or invalid); optional ones appear only if
/// the exchange sent them.
pub fn sanitize_ticker(raw: &Value) -> Option<TickerRecord> {
    let obj = raw.as_object()?;

    Some(TickerRecord {
        ticker_id: optional_string(obj, "ticker_id"),
        last_price: number_field(obj, "last_price"),
        high: number_field(obj, "high"),
        low: number_field(obj, "low"),
        base_volume: number_field(obj, "base_volume"),
        target_volume: optional_number(obj, "target_volume"),
        quote_volume: optional_number(obj, "quote_volume"),
        bid: optional_number(obj, "bid"),
        ask: optional_number(obj, "ask"),
    })
}

/// Remove markup-significant characters from a string
pub fn strip_markup(input: &str) -> String {
    input.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect()
}

/// Coerce a JSON value to a finite float, 0 on failure
pub fn coerce_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

fn number_field(obj: &Map<String, Value>, key: &str) -> f64 {
    obj.get(key).map(coerce_number).unwrap_or(0.0)
}

fn optional_number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => Some(coerce_number(v)),
    }
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(strip_markup(s)),
        Value::Number(n) => Some(strip_markup(&n.to_string())),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse the longest leading decimal literal, ignoring leading whitespace.
///
/// `"12.5abc"` parses as 12.5, `"abc"` yields `None`. Exponents are accepted
/// only when followed by at least one digit.
fn parse_float_prefix(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_non_object_is_rejected() {
        assert!(sanitize_ticker(&json!(null)).is_none());
        assert!(sanitize_ticker(&json!("ticker")).is_none());
        assert!(sanitize_ticker(&json!(42)).is_none());
        assert!(sanitize_ticker(&json!([{"last_price": "1"}])).is_none());
    }

    #[test]
    fn test_projects_whitelist_only() {
        let raw = json!({
            "ticker_id": "SCC_USDT",
            "last_price": "0.0123",
            "high": 0.02,
            "low": "0.01",
            "base_volume": "1500",
            "target_volume": "18.45",
            "bid": "0.012",
            "ask": "0.013",
            "script": "<script>alert(1)</script>",
        });

        let ticker = sanitize_ticker(&raw).unwrap();
        assert_eq!(ticker.ticker_id.as_deref(), Some("SCC_USDT"));
        assert_eq!(ticker.last_price, 0.0123);
        assert_eq!(ticker.high, 0.02);
        assert_eq!(ticker.target_volume, Some(18.45));
        assert_eq!(ticker.quote_volume, None);

        let out = serde_json::to_value(&ticker).unwrap();
        assert!(out.get("script").is_none());
        assert!(out.get("quote_volume").is_none());
    }

    #[test]
    fn test_invalid_numbers_become_zero() {
        let raw = json!({
            "last_price": "not a number",
            "high": {"nested": 1},
            "low": "NaN",
            "base_volume": "Infinity",
            "bid": "1e999",
        });

        let ticker = sanitize_ticker(&raw).unwrap();
        assert_eq!(ticker.last_price, 0.0);
        assert_eq!(ticker.high, 0.0);
        assert_eq!(ticker.low, 0.0);
        assert_eq!(ticker.base_volume, 0.0);
        assert_eq!(ticker.bid, Some(0.0));
    }

    #[test]
    fn test_float_prefix_parsing() {
        assert_eq!(parse_float_prefix("12.5abc"), Some(12.5));
        assert_eq!(parse_float_prefix("  -3"), Some(-3.0));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("5."), Some(5.0));
        assert_eq!(parse_float_prefix("1e3x"), Some(1000.0));
        assert_eq!(parse_float_prefix("1e"), Some(1.0));
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix("-"), None);
        assert_eq!(parse_float_prefix(""), None);
    }

    #[test]
    fn test_strings_are_stripped() {
        let raw = json!({"ticker_id": "<img src=x onerror='a&b'>\"SCC\""});
        let ticker = sanitize_ticker(&raw).unwrap();
        assert_eq!(ticker.ticker_id.as_deref(), Some("img src=x onerror=abSCC"));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<f64>().prop_map(|f| json!(f)),
            any::<i64>().prop_map(|i| json!(i)),
            ".*".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map(
                    prop_oneof![
                        Just("ticker_id".to_string()),
                        Just("last_price".to_string()),
                        Just("bid".to_string()),
                        Just("quote_volume".to_string()),
                        "[a-z_]{1,10}",
                    ],
                    inner,
                    0..6
                )
                .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_sanitized_output_is_safe(raw in arb_json()) {
            let out = sanitize_ticker(&raw);
            prop_assert_eq!(out.is_none(), !raw.is_object());

            if let Some(ticker) = out {
                let value = serde_json::to_value(&ticker).unwrap();
                let allowed = [
                    "ticker_id", "last_price", "high", "low", "base_volume",
                    "target_volume", "quote_volume", "bid", "ask",
                ];
                for (key, field) in value.as_object().unwrap() {
                    prop_assert!(allowed.contains(&key.as_str()));
                    if let Some(s) = field.as_str() {
                        prop_assert!(!s.contains(&STRIPPED_CHARS[..]));
                    }
                }
                for n in [ticker.last_price, ticker.high, ticker.low, ticker.base_volume] {
                    prop_assert!(n.is_finite());
                }
                for n in [ticker.target_volume, ticker.quote_volume, ticker.bid, ticker.ask]
                    .into_iter()
                    .flatten()
                {
                    prop_assert!(n.is_finite());
                }
            }
        }
    }
}

//! RPC method allow-list and parameter shape validation.
//!
//! The node behind the gateway can broadcast and sign transactions, so the
//! browser may only reach a fixed set of methods, and the first parameter of
//! hash- and address-taking methods must have the expected shape.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Methods the browser may call
pub const ALLOWED_METHODS: [&str; 13] = [
    "getblockchaininfo",
    "getblockcount",
    "getbestblockhash",
    "getblock",
    "getrawtransaction",
    "sendrawtransaction",
    "estimatesmartfee",
    "scantxoutset",
    "createrawtransaction",
    "signrawtransactionwithkey",
    "decoderawtransaction",
    "validateaddress",
    "getaddressinfo",
];

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(S|8|s2)[A-Za-z0-9]{25,90}$").expect("address pattern is valid")
});

// ═══════════════════════════════════════════════════════════════════════════════
// METHOD VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Check the method against the allow-list
pub fn is_method_allowed(method: &str) -> bool {
    ALLOWED_METHODS.contains(&method)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETER VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate the parameter shape for an allow-listed method.
///
/// Callers must check [`is_method_allowed`] first; this function only knows
/// about the methods with shape constraints.
pub fn validate_rpc_params(method: &str, params: &Value) -> bool {
    let Some(params) = params.as_array() else {
        return false;
    };
    let first = params.first().and_then(Value::as_str);

    match method {
        "getblock" | "getrawtransaction" => first.is_some_and(is_hash),
        "validateaddress" | "getaddressinfo" => first.is_some_and(is_address),
        "sendrawtransaction" => first.is_some_and(is_hex),
        _ => true,
    }
}

/// 64 hexadecimal characters (block or transaction hash)
pub fn is_hash(value: &str) -> bool {
    value.len() == 64 && is_hex(value)
}

/// Non-empty string of hexadecimal characters
pub fn is_hex(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Matches the chain's address format
pub fn is_address(value: &str) -> bool {
    ADDRESS_RE.is_match(value)
}

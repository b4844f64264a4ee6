//! Address parsing and formatting.
//!
//! This module is the canonical source for address formatting in the workspace.
//! Module identifiers are compared by their string form, so every place that
//! renders an address for a key or a type string must go through here.
//!
//! Addresses are 32-byte values written in several ways:
//! - Short form: "0x1"
//! - Full form: "0x0000000000000000000000000000000000000000000000000000000000000001"
//! - Without prefix: "1"
//!
//! The canonical display form follows AIP-40: special addresses (`0x0`..=`0xf`)
//! use the short form, every other address uses the full 64-character form.

use anyhow::{anyhow, Result};
use move_core_types::account_address::AccountAddress;

/// Number of hex characters in a full-length address.
const FULL_HEX_LEN: usize = AccountAddress::LENGTH * 2;

/// Parse an address string into an AccountAddress with a context-aware error.
///
/// Accepts short and full forms, with or without the `0x` prefix.
///
/// # Arguments
/// * `addr` - Address string
/// * `context` - Description for error messages (e.g., "module address")
///
/// # Examples
///
/// ```
/// use composer_types::address::parse_address;
///
/// let addr = parse_address("0x1", "module address").unwrap();
/// assert_eq!(addr.to_hex_literal(), "0x1");
/// assert!(parse_address("0xnothex", "module address").is_err());
/// ```
pub fn parse_address(addr: &str, context: &str) -> Result<AccountAddress> {
    let trimmed = addr.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if hex.is_empty() || hex.len() > FULL_HEX_LEN {
        return Err(anyhow!("Invalid {} '{}': bad length", context, addr));
    }
    AccountAddress::from_hex_literal(&format!("0x{}", hex.to_lowercase()))
        .map_err(|e| anyhow!("Invalid {} '{}': {}", context, addr, e))
}

/// Parse an address, returning None on failure.
pub fn try_parse_address(addr: &str) -> Option<AccountAddress> {
    parse_address(addr, "address").ok()
}

/// Check whether an address is special (`0x0` through `0xf`).
pub fn is_special_address(addr: &AccountAddress) -> bool {
    let bytes = addr.as_ref();
    let (last, rest) = match bytes.split_last() {
        Some(split) => split,
        None => return false,
    };
    rest.iter().all(|b| *b == 0) && *last < 0x10
}

/// Format an AccountAddress as a full 66-character hex string (0x + 64 hex chars).
pub fn format_address_full(addr: &AccountAddress) -> String {
    format!("0x{}", hex::encode(addr.as_ref()))
}

/// Format an AccountAddress in its canonical AIP-40 form.
///
/// # Examples
///
/// ```
/// use composer_types::address::{format_address, parse_address};
///
/// assert_eq!(format_address(&parse_address("0x0001", "test").unwrap()), "0x1");
/// assert_eq!(
///     format_address(&parse_address("0xabc", "test").unwrap()),
///     "0x0000000000000000000000000000000000000000000000000000000000000abc"
/// );
/// ```
pub fn format_address(addr: &AccountAddress) -> String {
    if is_special_address(addr) {
        let last = addr.as_ref()[AccountAddress::LENGTH - 1];
        format!("0x{:x}", last)
    } else {
        format_address_full(addr)
    }
}

/// Normalize an address string to its canonical form.
///
/// Returns None if the string is not a valid address.
pub fn normalize_address(addr: &str) -> Option<String> {
    try_parse_address(addr).map(|a| format_address(&a))
}

/// Decode a hex string (with or without 0x prefix) to raw bytes.
///
/// # Arguments
/// * `hex_str` - Hex string
/// * `context` - Description for error messages (e.g., "module bytecode")
pub fn parse_hex_bytes(hex_str: &str, context: &str) -> Result<Vec<u8>> {
    let trimmed = hex_str.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(stripped).map_err(|e| anyhow!("Invalid {} hex '{}': {}", context, hex_str, e))
}

/// Encode bytes as a 0x-prefixed lowercase hex string.
pub fn to_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

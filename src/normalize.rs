//! Value normalization
//!
//! Raw explorer records carry integers in minor units (decimal strings for
//! list endpoints, `0x` hex for the JSON-RPC proxy). Everything here turns
//! them into exact [`BigDecimal`] amounts so that summing thousands of
//! candidates never drifts the way binary floating point would.
//!
//! # Examples
//!
//! ```
//! use bigdecimal::BigDecimal;
//! use std::str::FromStr;
//! use txfinder::normalize::{normalize, wei_hex_to_eth};
//! use txfinder::TokenDecimals;
//!
//! let usdc = normalize("52000000000", TokenDecimals::USDC).unwrap();
//! assert_eq!(usdc, BigDecimal::from(52_000));
//!
//! let one_eth = wei_hex_to_eth("0xde0b6b3a7640000").unwrap();
//! assert_eq!(one_eth, BigDecimal::from_str("1").unwrap());
//! ```

use std::str::FromStr;

use alloy_primitives::{Address, TxHash, U256};
use bigdecimal::BigDecimal;

use crate::errors::ValueError;
use crate::types::decimals::TokenDecimals;

/// Converts an integer amount in minor units into the asset's own unit.
///
/// Computes `raw / 10^decimals` exactly. The input must be a non-empty run of
/// ASCII digits that fits in 256 bits; signs, fractions, whitespace and hex
/// are rejected.
pub fn normalize(raw: &str, decimals: TokenDecimals) -> Result<BigDecimal, ValueError> {
    let units = parse_decimal_u256("value", raw)?;
    Ok(scale_down(units, decimals))
}

/// Converts a `0x`-prefixed hexadecimal wei amount into ETH.
pub fn wei_hex_to_eth(hex: &str) -> Result<BigDecimal, ValueError> {
    let wei = parse_hex_u256("value", hex)?;
    Ok(wei_to_eth(wei))
}

/// Converts a wei amount into ETH.
pub fn wei_to_eth(wei: U256) -> BigDecimal {
    scale_down(wei, TokenDecimals::STANDARD)
}

/// Parses a native value in either encoding the explorer uses: decimal wei
/// from list endpoints, `0x` hex wei from the proxy endpoints.
pub fn native_value_to_eth(raw: &str) -> Result<BigDecimal, ValueError> {
    if has_hex_prefix(raw) {
        wei_hex_to_eth(raw)
    } else {
        normalize(raw, TokenDecimals::STANDARD)
    }
}

fn scale_down(units: U256, decimals: TokenDecimals) -> BigDecimal {
    // U256's decimal rendering is plain digits, so the exponent form is always
    // well formed and the scaling is exact.
    let repr = format!("{units}e-{}", decimals.as_u8());
    BigDecimal::from_str(&repr).unwrap_or_default()
}

fn has_hex_prefix(raw: &str) -> bool {
    raw.starts_with("0x") || raw.starts_with("0X")
}

fn parse_decimal_u256(field: &str, raw: &str) -> Result<U256, ValueError> {
    if raw.is_empty() {
        return Err(ValueError::malformed(field, raw, "empty string"));
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValueError::malformed(
            field,
            raw,
            "expected an unsigned decimal integer",
        ));
    }
    U256::from_str_radix(raw, 10)
        .map_err(|_| ValueError::malformed(field, raw, "does not fit in 256 bits"))
}

fn parse_hex_u256(field: &str, raw: &str) -> Result<U256, ValueError> {
    if !has_hex_prefix(raw) {
        return Err(ValueError::malformed(field, raw, "missing 0x prefix"));
    }
    let digits = &raw[2..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ValueError::malformed(
            field,
            raw,
            "expected hexadecimal digits after 0x",
        ));
    }
    U256::from_str_radix(digits, 16)
        .map_err(|_| ValueError::malformed(field, raw, "does not fit in 256 bits"))
}

/// Parses an unsigned integer field (block number, timestamp, log index)
/// given in decimal or `0x` hex.
pub(crate) fn parse_u64(field: &str, raw: &str) -> Result<u64, ValueError> {
    let value = if has_hex_prefix(raw) {
        parse_hex_u256(field, raw)?
    } else {
        parse_decimal_u256(field, raw)?
    };
    u64::try_from(value).map_err(|_| ValueError::malformed(field, raw, "does not fit in 64 bits"))
}

pub(crate) fn parse_address(field: &str, raw: &str) -> Result<Address, ValueError> {
    Address::from_str(raw.trim())
        .map_err(|e| ValueError::malformed(field, raw, format!("invalid address: {e}")))
}

pub(crate) fn parse_tx_hash(raw: &str) -> Result<TxHash, ValueError> {
    TxHash::from_str(raw.trim())
        .map_err(|e| ValueError::malformed("hash", raw, format!("invalid transaction hash: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn normalize_scales_by_decimals() {
        assert_eq!(normalize("52000000000", TokenDecimals::USDC).unwrap(), dec("52000"));
        assert_eq!(normalize("1", TokenDecimals::USDC).unwrap(), dec("0.000001"));
        assert_eq!(normalize("0", TokenDecimals::STANDARD).unwrap(), dec("0"));
        assert_eq!(normalize("42", TokenDecimals::new(0)).unwrap(), dec("42"));
    }

    #[test]
    fn normalize_is_exact_beyond_f64_precision() {
        // 25 significant digits, well past what an f64 can hold
        let value = normalize("1234567890123456789012345", TokenDecimals::STANDARD).unwrap();
        assert_eq!(value, dec("1234567.890123456789012345"));
    }

    #[test]
    fn normalize_rejects_non_integers() {
        for bad in ["", "-5", "+5", "1.5", " 12", "12 ", "1e18", "0x10", "abc"] {
            let err = normalize(bad, TokenDecimals::USDC).unwrap_err();
            assert_eq!(err.field(), "value", "input {bad:?}");
        }
    }

    #[test]
    fn normalize_rejects_overflow() {
        let too_big = "1".repeat(80);
        assert!(normalize(&too_big, TokenDecimals::STANDARD).is_err());

        let max = U256::MAX.to_string();
        assert!(normalize(&max, TokenDecimals::STANDARD).is_ok());
    }

    #[test]
    fn wei_hex_to_eth_known_values() {
        assert_eq!(wei_hex_to_eth("0x0").unwrap(), dec("0"));
        assert_eq!(wei_hex_to_eth("0xde0b6b3a7640000").unwrap(), dec("1"));
        assert_eq!(wei_hex_to_eth("0XDE0B6B3A7640000").unwrap(), dec("1"));
        assert_eq!(wei_hex_to_eth("0x6f05b59d3b20000").unwrap(), dec("0.5"));
    }

    #[test]
    fn wei_hex_to_eth_rejects_bad_input() {
        assert!(wei_hex_to_eth("de0b6b3a7640000").is_err());
        assert!(wei_hex_to_eth("0x").is_err());
        assert!(wei_hex_to_eth("0xzz").is_err());
        assert!(wei_hex_to_eth("0x-1").is_err());
    }

    #[test]
    fn native_value_accepts_both_encodings() {
        assert_eq!(native_value_to_eth("1000000000000000000").unwrap(), dec("1"));
        assert_eq!(native_value_to_eth("0xde0b6b3a7640000").unwrap(), dec("1"));
    }

    #[test]
    fn parse_u64_handles_hex_and_decimal() {
        assert_eq!(parse_u64("blockNumber", "19000000").unwrap(), 19_000_000);
        assert_eq!(parse_u64("blockNumber", "0x10").unwrap(), 16);
        assert!(parse_u64("blockNumber", "18446744073709551616").is_err());
    }

    #[test]
    fn parse_identifiers() {
        let addr = parse_address("from", "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2").unwrap();
        assert_eq!(addr, crate::config::constants::WETH);
        assert!(parse_address("from", "0x1234").is_err());
        assert!(parse_tx_hash("0x1234").is_err());
    }
}
